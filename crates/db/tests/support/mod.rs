#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use curio_core::broker::{BrokerError, EventPublisher};
use curio_core::config::RecommendationConfig;
use curio_core::domain::activity::{
    ActivityId, ActivityMetadata, ActivityRecord, ActivityType, UserId,
};
use curio_core::domain::product::{Product, ProductId};
use curio_core::domain::recommendation::RecommendationId;
use curio_core::ports::{
    ActivityStore, Catalog, ProductQuery, RecommendationStore, RepositoryError,
};
use curio_core::{FixedClock, RecommendationService, ServiceDependencies};
use curio_db::{InMemoryActivityStore, InMemoryCatalog, InMemoryRecommendationStore, SeedDataset};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap()
}

/// Publisher that records what it was asked to send and whether the set was
/// already persisted at that moment.
pub struct RecordingPublisher {
    recommendations: Arc<InMemoryRecommendationStore>,
    fail: bool,
    delay: Option<std::time::Duration>,
    published: Mutex<Vec<Published>>,
}

#[derive(Clone, Debug)]
pub struct Published {
    pub topic: String,
    pub payload: serde_json::Value,
    pub persisted_before_publish: bool,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), BrokerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let id = payload["recommendationId"].as_str().unwrap_or_default().to_owned();
        let persisted = self
            .recommendations
            .find_by_id(&RecommendationId(id))
            .await
            .map(|found| found.is_some())
            .unwrap_or(false);
        self.published.lock().unwrap().push(Published {
            topic: topic.to_owned(),
            payload,
            persisted_before_publish: persisted,
        });
        if self.fail {
            return Err(BrokerError::NotConnected);
        }
        Ok(())
    }
}

/// Catalog whose lookups fail for one product id.
pub struct FaultyCatalog {
    inner: Arc<InMemoryCatalog>,
    poisoned: ProductId,
}

impl FaultyCatalog {
    pub fn new(inner: Arc<InMemoryCatalog>, poisoned: &str) -> Self {
        Self { inner, poisoned: ProductId::from(poisoned) }
    }
}

#[async_trait]
impl Catalog for FaultyCatalog {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        if id == &self.poisoned {
            return Err(RepositoryError::Unavailable("catalog lookup timed out".to_owned()));
        }
        self.inner.find_by_id(id).await
    }

    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        self.inner.query(query).await
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        self.inner.save(product).await
    }
}

pub struct Harness {
    pub catalog: Arc<InMemoryCatalog>,
    pub activities: Arc<InMemoryActivityStore>,
    pub recommendations: Arc<InMemoryRecommendationStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub clock: FixedClock,
    pub service: Arc<RecommendationService>,
}

pub struct HarnessBuilder {
    products: Vec<Product>,
    config: RecommendationConfig,
    failing_publisher: bool,
    publish_delay: Option<std::time::Duration>,
    poisoned_product: Option<String>,
}

impl HarnessBuilder {
    pub fn seeded() -> Self {
        Self {
            products: SeedDataset::products(),
            config: RecommendationConfig::default(),
            failing_publisher: false,
            publish_delay: None,
            poisoned_product: None,
        }
    }

    pub fn empty_catalog() -> Self {
        Self { products: Vec::new(), ..Self::seeded() }
    }

    pub fn failing_publisher(mut self) -> Self {
        self.failing_publisher = true;
        self
    }

    /// Every publish waits `delay` before it is recorded.
    pub fn slow_publisher(mut self, delay: std::time::Duration) -> Self {
        self.publish_delay = Some(delay);
        self
    }

    pub fn poison(mut self, product_id: &str) -> Self {
        self.poisoned_product = Some(product_id.to_owned());
        self
    }

    pub fn config(mut self, config: RecommendationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Harness {
        let catalog = Arc::new(InMemoryCatalog::with_products(self.products));
        let activities = Arc::new(InMemoryActivityStore::default());
        let recommendations = Arc::new(InMemoryRecommendationStore::default());
        let publisher = Arc::new(RecordingPublisher {
            recommendations: recommendations.clone(),
            fail: self.failing_publisher,
            delay: self.publish_delay,
            published: Mutex::new(Vec::new()),
        });
        let clock = FixedClock::new(start());

        let service_catalog: Arc<dyn Catalog> = match &self.poisoned_product {
            Some(poisoned) => Arc::new(FaultyCatalog::new(catalog.clone(), poisoned)),
            None => catalog.clone(),
        };
        let service = RecommendationService::new(
            ServiceDependencies {
                catalog: service_catalog,
                activities: activities.clone(),
                recommendations: recommendations.clone(),
                publisher: publisher.clone(),
                clock: Arc::new(clock.clone()),
            },
            self.config,
        );

        Harness {
            catalog,
            activities,
            recommendations,
            publisher,
            clock,
            service: Arc::new(service),
        }
    }
}

impl Harness {
    /// Append an activity directly, bypassing the product existence check.
    pub async fn record(
        &self,
        user: &str,
        product: &str,
        activity_type: ActivityType,
        days_ago: i64,
    ) -> ActivityRecord {
        let record = ActivityRecord {
            id: ActivityId::generate(),
            user_id: UserId::from(user),
            product_id: ProductId::from(product),
            activity_type,
            timestamp: self.clock_now() - Duration::days(days_ago),
            metadata: ActivityMetadata::default(),
        };
        self.activities.append(record.clone()).await.expect("append activity");
        record
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use curio_core::Clock;
        self.clock.now()
    }
}
