// src/web/state.rs
// Shared state for API handlers

use std::sync::Arc;

use crate::db::Database;
use crate::pipeline::Pipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(db: Arc<Database>, pipeline: Pipeline) -> Self {
        Self { db, pipeline }
    }
}
