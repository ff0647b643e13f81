// src/analyze/mod.rs
//! Relevance pipeline: eligibility, heuristic + oracle scoring, selection.

pub mod ai_adapter;
pub mod eligibility;
pub mod heuristic;
pub mod scorer;
pub mod select;

pub use crate::analyze::eligibility::Ineligible;
pub use crate::analyze::heuristic::{heuristic_score, HeuristicScore, KeywordSet};
pub use crate::analyze::scorer::{RelevanceScore, ScoreBasis, ScoredItem, Scorer};
pub use crate::analyze::select::{rank_and_truncate, select, Selection};
