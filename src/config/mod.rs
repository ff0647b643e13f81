// src/config/mod.rs
pub mod agent;
pub mod ai;
pub mod filter;
pub mod templates;

pub use agent::{AgentConfig, DeliveryChannel, SourceSettings, SourceSpec};
pub use filter::{FilterConfig, RawFilterConfig};
pub use templates::DocumentTemplates;
