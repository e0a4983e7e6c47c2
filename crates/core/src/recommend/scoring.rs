//! Scoring algorithms for recommendation candidates

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::types::{CategoryActivity, ScoreBreakdown, UserPreferences};
use super::{
    BASE_QUALITY_WEIGHT, CATEGORY_ACTIVITY_DIVISOR, MAX_CATEGORY_BOOST, MAX_SIMILARITY_BOOST,
    PREFERENCE_BOOST, TRENDING_BOOST,
};
use crate::config::{ActivityWeights, RecommendationConfig};
use crate::domain::activity::{ActivityType, ResolvedActivity};
use crate::domain::product::Product;
use crate::domain::recommendation::{RecommendationReason, ScoredProduct};

/// Score calculator for recommendation candidates
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCalculator {
    weights: ActivityWeights,
    time_decay_factor: f64,
    trending_threshold: usize,
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::from_config(&RecommendationConfig::default())
    }
}

impl ScoreCalculator {
    /// Build a calculator from the recommendation tunables
    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self {
            weights: config.activity_weights,
            time_decay_factor: config.time_decay_factor,
            trending_threshold: config.trending_threshold,
        }
    }

    /// Score every candidate against the user's history and rank the result
    pub fn score_candidates(
        &self,
        candidates: &[Product],
        activities: &[ResolvedActivity],
        preferences: &UserPreferences,
        now: DateTime<Utc>,
    ) -> Vec<ScoredProduct> {
        let tallies = CategoryActivity::tally(activities);
        let mut scored: Vec<ScoredProduct> = candidates
            .iter()
            .map(|candidate| {
                let breakdown = self.breakdown(candidate, activities, &tallies, preferences, now);
                ScoredProduct {
                    product_id: candidate.id.clone(),
                    score: breakdown.total,
                    reason: breakdown.reason,
                }
            })
            .collect();
        rank(&mut scored);
        scored
    }

    /// Score popularity-fallback candidates: rating plus preference boost
    pub fn score_popular(
        &self,
        candidates: &[Product],
        preferences: &UserPreferences,
    ) -> Vec<ScoredProduct> {
        let mut scored: Vec<ScoredProduct> = candidates
            .iter()
            .map(|candidate| {
                let mut score = candidate.rating / 5.0;
                if preferences.prefers(&candidate.category) {
                    score += PREFERENCE_BOOST;
                }
                ScoredProduct {
                    product_id: candidate.id.clone(),
                    score: score.clamp(0.0, 1.0),
                    reason: RecommendationReason::PopularInCategory,
                }
            })
            .collect();
        rank(&mut scored);
        scored
    }

    /// Compute all scoring components for one candidate
    pub fn breakdown(
        &self,
        candidate: &Product,
        activities: &[ResolvedActivity],
        tallies: &BTreeMap<String, CategoryActivity>,
        preferences: &UserPreferences,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let base_quality = candidate.rating / 5.0 * BASE_QUALITY_WEIGHT;
        let preference_boost =
            if preferences.prefers(&candidate.category) { PREFERENCE_BOOST } else { 0.0 };

        let tally = tallies.get(&candidate.category);
        let (category_boost, mut reason) = match tally {
            Some(tally) => (self.category_boost(tally), self.category_reason(tally)),
            None => (0.0, RecommendationReason::PopularInCategory),
        };

        let similarity_boost = self.similarity_boost(candidate, activities, now);

        let trending = tally.is_some_and(|tally| tally.total() > self.trending_threshold);
        let trending_boost = if trending {
            reason = RecommendationReason::Trending;
            TRENDING_BOOST
        } else {
            0.0
        };

        let total = (base_quality
            + preference_boost
            + category_boost
            + similarity_boost
            + trending_boost)
            .clamp(0.0, 1.0);

        ScoreBreakdown {
            base_quality,
            preference_boost,
            category_boost,
            similarity_boost,
            trending_boost,
            total,
            reason,
        }
    }

    /// Weighted category activity over 10, capped at 0.5
    pub fn category_boost(&self, tally: &CategoryActivity) -> f64 {
        let weighted: f64 = ActivityType::ALL
            .iter()
            .map(|activity_type| tally.weighted(&self.weights, *activity_type))
            .sum();
        (weighted / CATEGORY_ACTIVITY_DIVISOR).min(MAX_CATEGORY_BOOST)
    }

    /// Reason for a category with activity, by dominant weighted activity type.
    ///
    /// Ties go to the earlier type in purchase, cart, view, wishlist order.
    pub fn category_reason(&self, tally: &CategoryActivity) -> RecommendationReason {
        let purchase = tally.weighted(&self.weights, ActivityType::Purchase);
        let cart = tally.weighted(&self.weights, ActivityType::Cart);
        let view = tally.weighted(&self.weights, ActivityType::View);
        let wishlist = tally.weighted(&self.weights, ActivityType::Wishlist);
        let search = tally.weighted(&self.weights, ActivityType::Search);

        if purchase >= cart && purchase >= view && purchase >= wishlist && purchase >= search {
            RecommendationReason::SimilarPurchase
        } else if cart >= view && cart >= wishlist && cart >= search {
            RecommendationReason::FrequentlyBoughtTogether
        } else if view >= wishlist && view >= search {
            RecommendationReason::SimilarView
        } else if wishlist >= search {
            RecommendationReason::WishlistRecommendation
        } else {
            RecommendationReason::PopularInCategory
        }
    }

    /// Tag overlap with previously touched products, decayed by age, capped at 0.3
    pub fn similarity_boost(
        &self,
        candidate: &Product,
        activities: &[ResolvedActivity],
        now: DateTime<Utc>,
    ) -> f64 {
        let accumulated: f64 = activities
            .iter()
            .filter(|activity| activity.product.id != candidate.id)
            .filter(|activity| activity.product.shared_tag_count(candidate) > 0)
            .map(|activity| {
                activity.product.tag_similarity(candidate)
                    * self.weights.weight(activity.activity_type())
                    * self.time_decay(activity.record.timestamp, now)
            })
            .sum();
        accumulated.min(MAX_SIMILARITY_BOOST)
    }

    /// `decay_factor ^ whole_days_elapsed`; activity stamped in the future counts as today
    pub fn time_decay(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let days = (now - timestamp).num_days().max(0);
        self.time_decay_factor.powf(days as f64)
    }
}

/// Sort by score descending, keeping input order for equal scores
pub fn rank(scored: &mut [ScoredProduct]) {
    scored.sort_by(|left, right| right.score.total_cmp(&left.score));
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{rank, ScoreCalculator};
    use crate::domain::activity::{
        ActivityId, ActivityMetadata, ActivityRecord, ActivityType, ResolvedActivity, UserId,
    };
    use crate::domain::product::{Product, ProductId};
    use crate::domain::recommendation::{RecommendationReason, ScoredProduct};
    use crate::recommend::types::{CategoryActivity, UserPreferences};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
    }

    fn product(id: &str, category: &str, rating: f64, tags: &[&str]) -> Product {
        Product {
            id: ProductId::from(id),
            name: id.to_owned(),
            description: String::new(),
            price: Decimal::new(2500, 2),
            image_url: format!("https://img.example/{id}.jpg"),
            category: category.to_owned(),
            tags: tags.iter().map(|tag| (*tag).to_owned()).collect::<BTreeSet<_>>(),
            rating,
            in_stock: true,
        }
    }

    fn activity(
        product: &Product,
        activity_type: ActivityType,
        timestamp: DateTime<Utc>,
    ) -> ResolvedActivity {
        ResolvedActivity {
            record: ActivityRecord {
                id: ActivityId(format!("a-{}-{}", product.id, timestamp.timestamp())),
                user_id: UserId::from("u-1"),
                product_id: product.id.clone(),
                activity_type,
                timestamp,
                metadata: ActivityMetadata::default(),
            },
            product: product.clone(),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn purchase_in_category_with_shared_tags_scores_similar_purchase() {
        let calculator = ScoreCalculator::default();
        let phone = product("phone", "electronics", 4.5, &["mobile", "tech"]);
        let headphones = product("headphones", "electronics", 4.0, &["audio", "tech"]);
        let history = vec![activity(&phone, ActivityType::Purchase, now() - Duration::days(2))];
        let tallies = CategoryActivity::tally(&history);

        let breakdown = calculator.breakdown(
            &headphones,
            &history,
            &tallies,
            &UserPreferences::default(),
            now(),
        );

        assert_close(breakdown.base_quality, 0.16);
        assert_close(breakdown.category_boost, 0.1);
        // 1 of 2 tags shared, purchase weight 1.0, 0.81 decay: 0.405 before the cap
        assert_close(breakdown.similarity_boost, 0.3);
        assert_eq!(breakdown.reason, RecommendationReason::SimilarPurchase);
        assert_close(breakdown.total, 0.16 + 0.1 + 0.3);
    }

    #[test]
    fn busy_category_is_forced_to_trending() {
        let calculator = ScoreCalculator::default();
        let phone = product("phone", "electronics", 4.5, &["mobile"]);
        let laptop = product("laptop", "electronics", 4.8, &["computer"]);
        let history: Vec<_> = (0..11)
            .map(|offset| activity(&phone, ActivityType::View, now() - Duration::hours(offset)))
            .collect();
        let tallies = CategoryActivity::tally(&history);

        let breakdown =
            calculator.breakdown(&laptop, &history, &tallies, &UserPreferences::default(), now());

        assert_eq!(breakdown.reason, RecommendationReason::Trending);
        assert_close(breakdown.trending_boost, 0.1);
        assert_close(breakdown.category_boost, 0.5);
    }

    #[test]
    fn exactly_threshold_activity_is_not_trending() {
        let calculator = ScoreCalculator::default();
        let phone = product("phone", "electronics", 4.5, &[]);
        let laptop = product("laptop", "electronics", 4.8, &[]);
        let history: Vec<_> = (0..10)
            .map(|offset| activity(&phone, ActivityType::View, now() - Duration::hours(offset)))
            .collect();
        let tallies = CategoryActivity::tally(&history);

        let breakdown =
            calculator.breakdown(&laptop, &history, &tallies, &UserPreferences::default(), now());

        assert_eq!(breakdown.reason, RecommendationReason::SimilarView);
        assert_close(breakdown.trending_boost, 0.0);
    }

    #[test]
    fn reason_follows_dominant_weighted_activity() {
        let calculator = ScoreCalculator::default();
        let tally = |purchase, cart, wishlist, view, search| CategoryActivity {
            purchase,
            cart,
            wishlist,
            view,
            search,
        };

        assert_eq!(
            calculator.category_reason(&tally(1, 1, 0, 0, 0)),
            RecommendationReason::SimilarPurchase
        );
        assert_eq!(
            calculator.category_reason(&tally(0, 1, 0, 1, 0)),
            RecommendationReason::FrequentlyBoughtTogether
        );
        assert_eq!(
            calculator.category_reason(&tally(0, 0, 0, 3, 0)),
            RecommendationReason::SimilarView
        );
        assert_eq!(
            calculator.category_reason(&tally(0, 0, 1, 1, 0)),
            RecommendationReason::WishlistRecommendation
        );
        assert_eq!(
            calculator.category_reason(&tally(0, 0, 0, 0, 2)),
            RecommendationReason::PopularInCategory
        );
    }

    #[test]
    fn older_activity_contributes_less_similarity() {
        let calculator = ScoreCalculator::default();
        let mug = product("mug", "home", 4.0, &["kitchen"]);
        let kettle = product("kettle", "home", 4.0, &["kitchen"]);

        let recent = vec![activity(&mug, ActivityType::View, now() - Duration::days(1))];
        let stale = vec![activity(&mug, ActivityType::View, now() - Duration::days(20))];

        let recent_boost = calculator.similarity_boost(&kettle, &recent, now());
        let stale_boost = calculator.similarity_boost(&kettle, &stale, now());

        assert!(recent_boost > stale_boost);
        assert_close(stale_boost, 0.5 * 0.9f64.powi(20));
    }

    #[test]
    fn future_timestamps_do_not_amplify_decay() {
        let calculator = ScoreCalculator::default();
        assert_close(calculator.time_decay(now() + Duration::days(3), now()), 1.0);
        assert_close(calculator.time_decay(now() - Duration::hours(23), now()), 1.0);
        assert_close(calculator.time_decay(now() - Duration::hours(49), now()), 0.81);
    }

    #[test]
    fn scores_stay_within_unit_interval() {
        let calculator = ScoreCalculator::default();
        let anchor = product("anchor", "electronics", 5.0, &["a", "b"]);
        let candidate = product("candidate", "electronics", 5.0, &["a", "b"]);
        let history: Vec<_> = (0..40)
            .map(|offset| activity(&anchor, ActivityType::Purchase, now() - Duration::minutes(offset)))
            .collect();
        let preferences = UserPreferences::with_categories(["electronics"]);

        let scored =
            calculator.score_candidates(&[candidate.clone()], &history, &preferences, now());

        assert_eq!(scored.len(), 1);
        assert_close(scored[0].score, 1.0);

        let zero = product("zero", "garden", 0.0, &[]);
        let scored = calculator.score_candidates(&[zero], &[], &UserPreferences::default(), now());
        assert_close(scored[0].score, 0.0);
        assert_eq!(scored[0].reason, RecommendationReason::PopularInCategory);
    }

    #[test]
    fn scoring_is_deterministic_for_identical_inputs() {
        let calculator = ScoreCalculator::default();
        let phone = product("phone", "electronics", 4.5, &["tech"]);
        let candidates = vec![
            product("laptop", "electronics", 4.8, &["tech", "computer"]),
            product("lamp", "home", 4.1, &["decor"]),
            product("headphones", "electronics", 4.2, &["tech", "audio"]),
        ];
        let history = vec![
            activity(&phone, ActivityType::Cart, now() - Duration::days(3)),
            activity(&phone, ActivityType::View, now() - Duration::days(5)),
        ];
        let preferences = UserPreferences::with_categories(["home"]);

        let first = calculator.score_candidates(&candidates, &history, &preferences, now());
        let second = calculator.score_candidates(&candidates, &history, &preferences, now());

        assert_eq!(first, second);
        assert!(first.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn popular_scores_add_preference_boost_and_cap() {
        let calculator = ScoreCalculator::default();
        let candidates = vec![
            product("shoes", "sports", 4.5, &[]),
            product("blender", "kitchen", 4.9, &[]),
        ];
        let preferences = UserPreferences::with_categories(["sports"]);

        let scored = calculator.score_popular(&candidates, &preferences);

        assert_eq!(scored[0].product_id, ProductId::from("shoes"));
        assert_close(scored[0].score, 1.0);
        assert_close(scored[1].score, 0.98);
        assert!(scored.iter().all(|entry| entry.reason == RecommendationReason::PopularInCategory));
    }

    #[test]
    fn rank_is_stable_for_equal_scores() {
        let entry = |id: &str, score| ScoredProduct {
            product_id: ProductId::from(id),
            score,
            reason: RecommendationReason::SimilarView,
        };
        let mut scored = vec![entry("b", 0.5), entry("a", 0.7), entry("c", 0.5), entry("d", 0.5)];

        rank(&mut scored);

        let ids: Vec<_> = scored.iter().map(|entry| entry.product_id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }
}
