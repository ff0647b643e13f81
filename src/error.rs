// src/error.rs
//! Error taxonomy for the curation pipeline.
//!
//! Each error lives at the level where it is contained: record-level and
//! item-level errors never escalate past their own record or item, and a
//! `SourceError` only removes that source from the current cycle.

use thiserror::Error;

/// Adapter-level terminal failure. The source is skipped for the cycle.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source `{source_name}` unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Record-level failure. The record is dropped and counted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record has neither title nor body")]
    Empty,
    #[error("record has no url")]
    MissingUrl,
}

/// Failure of the text-generation oracle itself.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle disabled")]
    Disabled,
    #[error("daily oracle limit of {0} calls reached")]
    DailyLimit(u32),
    #[error("oracle request failed: {0}")]
    Request(String),
    #[error("oracle returned HTTP {0}")]
    Status(u16),
    #[error("oracle returned an empty completion")]
    Empty,
}

/// Why the oracle stage did not produce a score. Not an error for the cycle:
/// the scorer falls back to the heuristic score.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    Disabled,
    CallFailed(String),
    Timeout,
    Malformed(String),
    OutOfRange(f64),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Disabled => write!(f, "oracle disabled"),
            FallbackReason::CallFailed(e) => write!(f, "oracle call failed: {e}"),
            FallbackReason::Timeout => write!(f, "oracle timed out"),
            FallbackReason::Malformed(e) => write!(f, "malformed oracle output: {e}"),
            FallbackReason::OutOfRange(v) => write!(f, "oracle score out of range: {v}"),
        }
    }
}

/// Item-level failure. The item moves to `Failed` and the batch continues.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ItemError {
    #[error("synthesis failed in section `{section}`: {reason}")]
    Synthesis { section: String, reason: String },
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Configuration that could not be validated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}
