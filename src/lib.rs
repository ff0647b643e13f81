// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod prd;
pub mod process;

pub use analyze::ai_adapter;
pub use crate::orchestrator::{CycleReport, Orchestrator, OrchestratorHandle};
