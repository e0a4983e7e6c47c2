//! Rule-based recommendation engine
//!
//! Turns a user's recent activity into a ranked, explained product list:
//! the [`CandidateSelector`] narrows the catalog to products worth scoring,
//! the [`ScoreCalculator`] assigns each one a score in `0.0..=1.0` plus a
//! reason code, and the [`RecommendationEngine`] glues the two together and
//! applies the minimum-score and size limits.
//!
//! Scoring is a pure function of its inputs and an injected "now", so the same
//! history, catalog and timestamp always yield the same ranking.

mod candidates;
mod engine;
mod scoring;
mod types;

pub use candidates::CandidateSelector;
pub use engine::RecommendationEngine;
pub use scoring::ScoreCalculator;
pub use types::*;

/// Share of the score contributed by product rating (rating / 5 * this).
pub const BASE_QUALITY_WEIGHT: f64 = 0.2;

/// Boost for candidates in one of the user's preferred categories.
pub const PREFERENCE_BOOST: f64 = 0.2;

/// Cap for the category-activity component.
pub const MAX_CATEGORY_BOOST: f64 = 0.5;

/// Weighted category activity is divided by this before capping.
pub const CATEGORY_ACTIVITY_DIVISOR: f64 = 10.0;

/// Cap for the accumulated tag-similarity component.
pub const MAX_SIMILARITY_BOOST: f64 = 0.3;

/// Boost applied when a category's activity count exceeds the trending threshold.
pub const TRENDING_BOOST: f64 = 0.1;
