// src/lib.rs
// Triage - automated intake, classification and routing for customer complaints

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod background;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod web;

pub use error::{Result, TriageError};
