//! Recommendation engine: selection, scoring and final cut

use chrono::{DateTime, Utc};
use tracing::debug;

use super::candidates::CandidateSelector;
use super::scoring::ScoreCalculator;
use super::types::{CandidateSelection, UserPreferences};
use crate::config::RecommendationConfig;
use crate::domain::activity::UserId;
use crate::domain::recommendation::ScoredProduct;
use crate::ports::RepositoryError;

/// Produces the final ranked list for one user
#[derive(Clone)]
pub struct RecommendationEngine {
    selector: CandidateSelector,
    calculator: ScoreCalculator,
    minimum_score: f64,
    max_recommendations: usize,
}

impl RecommendationEngine {
    pub fn new(selector: CandidateSelector, config: &RecommendationConfig) -> Self {
        Self {
            selector,
            calculator: ScoreCalculator::from_config(config),
            minimum_score: config.minimum_score,
            max_recommendations: config.max_recommendations,
        }
    }

    /// Select, score and cut the recommendation list for `user_id`
    pub async fn rank(
        &self,
        user_id: &UserId,
        preferences: &UserPreferences,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredProduct>, RepositoryError> {
        let selection = self.selector.select(user_id, preferences).await?;
        let ranked = self.finalize(&selection, preferences, now);
        debug!(
            event_name = "recommend.ranked",
            user_id = %user_id,
            popular = selection.is_popular(),
            candidates = selection.candidates().len(),
            kept = ranked.len(),
            "candidates ranked"
        );
        Ok(ranked)
    }

    /// Score a selection and keep the top entries.
    ///
    /// Personalized entries must reach the minimum score. Popularity-fallback
    /// entries skip that filter so a user without history still gets a list
    /// whenever anything is in stock.
    pub fn finalize(
        &self,
        selection: &CandidateSelection,
        preferences: &UserPreferences,
        now: DateTime<Utc>,
    ) -> Vec<ScoredProduct> {
        match selection {
            CandidateSelection::Popular { candidates } => {
                let mut scored = self.calculator.score_popular(candidates, preferences);
                scored.truncate(self.max_recommendations);
                scored
            }
            CandidateSelection::Personalized { candidates, activities } => self
                .calculator
                .score_candidates(candidates, activities, preferences, now)
                .into_iter()
                .filter(|entry| entry.score >= self.minimum_score)
                .take(self.max_recommendations)
                .collect(),
        }
    }
}
