// src/llm/mod.rs
// Model client, cooldown state, and JSON recovery helpers

mod client;
mod cooldown;
mod json;

pub use client::{ModelClient, ModelOutcome};
pub use cooldown::{Clock, CooldownGate, SystemClock};
pub use json::best_effort_json;
