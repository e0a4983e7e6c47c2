//! Storage and messaging seams the recommendation service depends on.
//!
//! Concrete implementations live in `curio-db` (SQLite and in-memory) and in
//! [`crate::broker`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::activity::{ActivityRecord, UserId};
use crate::domain::product::{Product, ProductId};
use crate::domain::recommendation::{RecommendationId, RecommendationSet};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Catalog filter. Results are ordered by rating descending, ties broken by
/// product id ascending.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductQuery {
    pub categories: Option<BTreeSet<String>>,
    pub excluded_categories: BTreeSet<String>,
    pub excluded_ids: BTreeSet<ProductId>,
    pub in_stock_only: bool,
    pub limit: Option<usize>,
}

impl ProductQuery {
    pub fn in_stock() -> Self {
        Self { in_stock_only: true, ..Self::default() }
    }

    pub fn in_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn excluding_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_categories.extend(categories.into_iter().map(Into::into));
        self
    }

    pub fn excluding_ids<'a, I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a ProductId>,
    {
        self.excluded_ids.extend(ids.into_iter().cloned());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.in_stock_only && !product.in_stock {
            return false;
        }
        if let Some(categories) = &self.categories {
            if !categories.contains(&product.category) {
                return false;
            }
        }
        !self.excluded_categories.contains(&product.category)
            && !self.excluded_ids.contains(&product.id)
    }

    /// Filters, orders and truncates an in-memory product list.
    pub fn apply<I>(&self, products: I) -> Vec<Product>
    where
        I: IntoIterator<Item = Product>,
    {
        let mut matched: Vec<Product> =
            products.into_iter().filter(|product| self.matches(product)).collect();
        matched.sort_by(by_rating_desc);
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

pub fn by_rating_desc(left: &Product, right: &Product) -> Ordering {
    right.rating.total_cmp(&left.rating).then_with(|| left.id.cmp(&right.id))
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Most recent first.
    async fn find_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, RepositoryError>;

    async fn distinct_user_ids(&self) -> Result<Vec<UserId>, RepositoryError>;

    /// Returns `false` when a record with the same id already exists; the
    /// stored record is left untouched.
    async fn append(&self, record: ActivityRecord) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Latest set by `created_at` whose `expires_at` is after `now`.
    async fn find_latest_active(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        unsent_only: bool,
    ) -> Result<Option<RecommendationSet>, RepositoryError>;

    async fn find_by_id(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<RecommendationSet>, RepositoryError>;

    async fn save(&self, set: RecommendationSet) -> Result<(), RepositoryError>;
}
