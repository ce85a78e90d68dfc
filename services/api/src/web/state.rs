//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use buildestimate_core::{EstimateEngine, Marketplace};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub marketplace: Marketplace,
    pub engine: EstimateEngine,
    pub config: Arc<Config>,
}
