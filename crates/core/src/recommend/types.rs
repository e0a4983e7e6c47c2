//! Types for the recommendation engine

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::ActivityWeights;
use crate::domain::activity::{ActivityType, ResolvedActivity};
use crate::domain::product::{Product, ProductId};
use crate::domain::recommendation::RecommendationReason;

/// Optional hints supplied by the caller, e.g. from a profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Categories the user asked to see more of
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl UserPreferences {
    /// Preferences naming the given categories
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { categories: categories.into_iter().map(Into::into).collect() }
    }

    /// Whether `category` is one of the preferred categories
    pub fn prefers(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Output of candidate selection
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateSelection {
    /// Candidates derived from the user's own history
    Personalized {
        /// In-stock, not yet interacted-with products, rating descending
        candidates: Vec<Product>,
        /// The resolved history the candidates were derived from
        activities: Vec<ResolvedActivity>,
    },
    /// Popularity fallback for users without usable history
    Popular {
        /// Preferred-category products first, then the rest, each rating descending
        candidates: Vec<Product>,
    },
}

impl CandidateSelection {
    pub fn candidates(&self) -> &[Product] {
        match self {
            Self::Personalized { candidates, .. } | Self::Popular { candidates } => candidates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates().is_empty()
    }

    pub fn is_popular(&self) -> bool {
        matches!(self, Self::Popular { .. })
    }
}

/// Category interest sets derived from resolved activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestProfile {
    pub viewed: BTreeSet<String>,
    pub purchased: BTreeSet<String>,
    pub carted: BTreeSet<String>,
    /// Raw search queries, matched against category names as-is
    pub searched: BTreeSet<String>,
    /// Every product the user touched, wishlist included
    pub interacted: BTreeSet<ProductId>,
}

impl InterestProfile {
    /// Partition activity into interest sets
    pub fn from_activities(activities: &[ResolvedActivity]) -> Self {
        let mut profile = Self::default();
        for activity in activities {
            profile.interacted.insert(activity.product.id.clone());
            let category = activity.category().to_owned();
            match activity.activity_type() {
                ActivityType::View => {
                    profile.viewed.insert(category);
                }
                ActivityType::Purchase => {
                    profile.purchased.insert(category);
                }
                ActivityType::Cart => {
                    profile.carted.insert(category);
                }
                ActivityType::Search => {
                    if let Some(query) = &activity.record.metadata.search_query {
                        profile.searched.insert(query.clone());
                    }
                }
                ActivityType::Wishlist => {}
            }
        }
        profile
    }

    /// Union of all interest sets
    pub fn categories(&self) -> BTreeSet<String> {
        self.viewed
            .iter()
            .chain(&self.purchased)
            .chain(&self.carted)
            .chain(&self.searched)
            .cloned()
            .collect()
    }
}

/// Per-type activity counts within one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryActivity {
    pub purchase: usize,
    pub cart: usize,
    pub wishlist: usize,
    pub view: usize,
    pub search: usize,
}

impl CategoryActivity {
    /// Count activity per product category
    pub fn tally(activities: &[ResolvedActivity]) -> BTreeMap<String, CategoryActivity> {
        let mut tallies: BTreeMap<String, CategoryActivity> = BTreeMap::new();
        for activity in activities {
            tallies.entry(activity.category().to_owned()).or_default().record(activity.activity_type());
        }
        tallies
    }

    pub fn record(&mut self, activity_type: ActivityType) {
        match activity_type {
            ActivityType::Purchase => self.purchase += 1,
            ActivityType::Cart => self.cart += 1,
            ActivityType::Wishlist => self.wishlist += 1,
            ActivityType::View => self.view += 1,
            ActivityType::Search => self.search += 1,
        }
    }

    pub fn count(&self, activity_type: ActivityType) -> usize {
        match activity_type {
            ActivityType::Purchase => self.purchase,
            ActivityType::Cart => self.cart,
            ActivityType::Wishlist => self.wishlist,
            ActivityType::View => self.view,
            ActivityType::Search => self.search,
        }
    }

    /// Number of activity records in the category
    pub fn total(&self) -> usize {
        self.purchase + self.cart + self.wishlist + self.view + self.search
    }

    /// Count scaled by the configured weight of its activity type
    pub fn weighted(&self, weights: &ActivityWeights, activity_type: ActivityType) -> f64 {
        self.count(activity_type) as f64 * weights.weight(activity_type)
    }
}

/// Individual scoring components for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base_quality: f64,
    pub preference_boost: f64,
    pub category_boost: f64,
    pub similarity_boost: f64,
    pub trending_boost: f64,
    /// Sum of the components, clamped to `0.0..=1.0`
    pub total: f64,
    pub reason: RecommendationReason,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{CategoryActivity, InterestProfile};
    use crate::domain::activity::{
        ActivityId, ActivityMetadata, ActivityRecord, ActivityType, ResolvedActivity, UserId,
    };
    use crate::domain::product::{Product, ProductId};

    fn resolved(product_id: &str, category: &str, activity_type: ActivityType) -> ResolvedActivity {
        let metadata = if activity_type == ActivityType::Search {
            ActivityMetadata::search("garden")
        } else {
            ActivityMetadata::default()
        };
        ResolvedActivity {
            record: ActivityRecord {
                id: ActivityId(format!("a-{product_id}-{activity_type}")),
                user_id: UserId::from("u-1"),
                product_id: ProductId::from(product_id),
                activity_type,
                timestamp: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
                metadata,
            },
            product: Product {
                id: ProductId::from(product_id),
                name: product_id.to_owned(),
                description: String::new(),
                price: Decimal::new(100, 0),
                image_url: String::new(),
                category: category.to_owned(),
                tags: BTreeSet::new(),
                rating: 4.0,
                in_stock: true,
            },
        }
    }

    #[test]
    fn wishlist_marks_interaction_without_adding_interest() {
        let activities = vec![
            resolved("p-1", "electronics", ActivityType::View),
            resolved("p-2", "home", ActivityType::Wishlist),
            resolved("p-3", "books", ActivityType::Search),
        ];

        let profile = InterestProfile::from_activities(&activities);

        assert_eq!(profile.interacted.len(), 3);
        assert!(profile.viewed.contains("electronics"));
        assert!(!profile.categories().contains("home"));
        assert!(profile.searched.contains("garden"));
        assert!(!profile.categories().contains("books"));
    }

    #[test]
    fn tally_counts_each_record_once_by_type() {
        let activities = vec![
            resolved("p-1", "electronics", ActivityType::View),
            resolved("p-1", "electronics", ActivityType::Purchase),
            resolved("p-2", "electronics", ActivityType::View),
            resolved("p-3", "home", ActivityType::Cart),
        ];

        let tallies = CategoryActivity::tally(&activities);
        let electronics = tallies["electronics"];

        assert_eq!(electronics.view, 2);
        assert_eq!(electronics.purchase, 1);
        assert_eq!(electronics.total(), 3);
        assert_eq!(tallies["home"].total(), 1);
    }
}
