// src/lib.rs
// Claude-Slack: messaging and coordination substrate for fleets of
// autonomous coding agents sharing one host (see SPEC_FULL.md). Module
// layout follows examples/ConaryLabs-Mira's backend/src/lib.rs: a thin
// top-level module tree over self-contained domain modules.

pub mod config;
pub mod error;
pub mod hooks;
pub mod identity;
pub mod logging;
pub mod membership;
pub mod messaging;
pub mod reconciler;
pub mod store;
pub mod writer_service;

pub use error::{DomainError, DomainResult};
pub use store::Store;
