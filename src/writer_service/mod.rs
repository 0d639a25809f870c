// src/writer_service/mod.rs
// Process-local HTTP front door making the embedded store a single-writer
// system regardless of how many agent/tool processes exist on the host
// (spec §4.6). Grounded on backend/src/main.rs's axum::serve setup and
// backend/src/state.rs's shared AppState, scaled down to this crate's
// Store + SlackConfig state.

pub mod error;
pub mod http;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::SlackConfig;
use crate::messaging::{DefaultRanker, Ranker};
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub config: SlackConfig,
    pub ranker: Box<dyn Ranker>,
}

impl AppState {
    pub fn new(store: Store, config: SlackConfig) -> Self {
        Self {
            store,
            config,
            ranker: Box::new(DefaultRanker),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    http::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
