use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use curio_core::domain::activity::{ActivityRecord, UserId};
use curio_core::domain::product::{Product, ProductId};
use curio_core::domain::recommendation::{RecommendationId, RecommendationSet};
use curio_core::ports::{ActivityStore, Catalog, ProductQuery, RecommendationStore, RepositoryError};

#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn with_products<I>(products: I) -> Self
    where
        I: IntoIterator<Item = Product>,
    {
        let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { products: RwLock::new(products) }
    }

    /// Drops a product, leaving any activity or recommendation that points at it dangling.
    pub async fn remove(&self, id: &ProductId) -> Option<Product> {
        self.products.write().await.remove(id)
    }
}

#[async_trait::async_trait]
impl Catalog for InMemoryCatalog {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(id).cloned())
    }

    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(query.apply(products.values().cloned()))
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.clone(), product);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryActivityStore {
    records: RwLock<Vec<ActivityRecord>>,
}

impl InMemoryActivityStore {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn find_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut matching: Vec<ActivityRecord> =
            records.iter().filter(|r| &r.user_id == user_id).cloned().collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.0.cmp(&b.id.0)));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn distinct_user_ids(&self) -> Result<Vec<UserId>, RepositoryError> {
        let records = self.records.read().await;
        let users: BTreeSet<UserId> = records.iter().map(|r| r.user_id.clone()).collect();
        Ok(users.into_iter().collect())
    }

    async fn append(&self, record: ActivityRecord) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().await;
        if records.iter().any(|existing| existing.id == record.id) {
            return Ok(false);
        }
        records.push(record);
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryRecommendationStore {
    sets: RwLock<HashMap<RecommendationId, RecommendationSet>>,
}

impl InMemoryRecommendationStore {
    pub async fn sets_for_user(&self, user_id: &UserId) -> Vec<RecommendationSet> {
        let sets = self.sets.read().await;
        let mut found: Vec<RecommendationSet> =
            sets.values().filter(|set| &set.user_id == user_id).cloned().collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        found
    }
}

#[async_trait::async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn find_latest_active(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        unsent_only: bool,
    ) -> Result<Option<RecommendationSet>, RepositoryError> {
        let sets = self.sets.read().await;
        Ok(sets
            .values()
            .filter(|set| &set.user_id == user_id && set.is_active(now))
            .filter(|set| !unsent_only || !set.sent)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)))
            .cloned())
    }

    async fn find_by_id(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<RecommendationSet>, RepositoryError> {
        let sets = self.sets.read().await;
        Ok(sets.get(id).cloned())
    }

    async fn save(&self, set: RecommendationSet) -> Result<(), RepositoryError> {
        let mut sets = self.sets.write().await;
        sets.insert(set.id.clone(), set);
        Ok(())
    }
}
