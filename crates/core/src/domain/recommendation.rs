use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::activity::UserId;
use crate::domain::product::{Product, ProductId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationId(pub String);

impl RecommendationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RecommendationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecommendationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Attributed explanation for why a product was recommended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationReason {
    SimilarPurchase,
    SimilarView,
    PopularInCategory,
    Trending,
    FrequentlyBoughtTogether,
    WishlistRecommendation,
}

impl RecommendationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SimilarPurchase => "similar_purchase",
            Self::SimilarView => "similar_view",
            Self::PopularInCategory => "popular_in_category",
            Self::Trending => "trending",
            Self::FrequentlyBoughtTogether => "frequently_bought_together",
            Self::WishlistRecommendation => "wishlist_recommendation",
        }
    }
}

impl fmt::Display for RecommendationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationReason {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "similar_purchase" => Ok(Self::SimilarPurchase),
            "similar_view" => Ok(Self::SimilarView),
            "popular_in_category" => Ok(Self::PopularInCategory),
            "trending" => Ok(Self::Trending),
            "frequently_bought_together" => Ok(Self::FrequentlyBoughtTogether),
            "wishlist_recommendation" => Ok(Self::WishlistRecommendation),
            other => Err(DomainError::UnknownReason(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredProduct {
    pub product_id: ProductId,
    /// Always within `0.0..=1.0`.
    pub score: f64,
    pub reason: RecommendationReason,
}

/// A persisted, ranked recommendation list for one user.
///
/// The only mutation after creation is the `sent` flag; sets expire through
/// `expires_at` rather than deletion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub id: RecommendationId,
    pub user_id: UserId,
    pub products: Vec<ScoredProduct>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

impl RecommendationSet {
    pub fn new(
        user_id: UserId,
        products: Vec<ScoredProduct>,
        created_at: DateTime<Utc>,
        expiry: Duration,
    ) -> Self {
        Self {
            id: RecommendationId::generate(),
            user_id,
            products,
            created_at,
            expires_at: created_at + expiry,
            sent: false,
            sent_at: None,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Flags the set as delivered. Returns `false` when it was already sent,
    /// in which case `sent_at` keeps its original value.
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> bool {
        if self.sent {
            return false;
        }
        self.sent = true;
        self.sent_at = Some(now);
        true
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedProduct {
    pub product: Product,
    pub score: f64,
    pub reason: RecommendationReason,
}

/// A recommendation set with its product references resolved for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    pub id: RecommendationId,
    pub user_id: UserId,
    pub products: Vec<RecommendedProduct>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

impl RecommendationView {
    pub fn new(set: &RecommendationSet, products: Vec<RecommendedProduct>) -> Self {
        Self {
            id: set.id.clone(),
            user_id: set.user_id.clone(),
            products,
            created_at: set.created_at,
            expires_at: set.expires_at,
            sent: set.sent,
            sent_at: set.sent_at,
        }
    }
}
