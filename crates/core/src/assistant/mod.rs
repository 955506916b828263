//! Gift Assistant
//!
//! Turns the four-step gift questionnaire into a short, ranked list of gifts
//! using a deterministic point-accumulation heuristic over the static catalog.

mod engine;
pub mod quiz;
mod scoring;
pub mod tables;
mod types;

pub use engine::{GiftAssistant, GiftMatcher};
pub use quiz::{QuizError, QuizSession, QuizStep};
pub use scoring::{effective_budget, RankContext, RunScore, ScoreCalculator};
pub use types::*;

/// Maximum gifts returned by a matched run
pub const DEFAULT_MAX_SUGGESTIONS: usize = 8;

/// Maximum featured gifts returned when nothing matched
pub const DEFAULT_FALLBACK_SUGGESTIONS: usize = 6;

/// Default pacing delay before results are shown
pub const DEFAULT_ANALYSIS_DELAY_MS: u64 = 1_500;
