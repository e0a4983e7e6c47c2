//! Recommendation lifecycle: reuse, generation, persistence, delivery and the
//! creation event.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::{BatchOrchestrator, BatchOutcome, BatchSettings};
use crate::broker::{topics, EventPublisher};
use crate::clock::Clock;
use crate::config::RecommendationConfig;
use crate::domain::activity::{
    ActivityId, ActivityMetadata, ActivityRecord, ActivityType, UserId,
};
use crate::domain::product::{Product, ProductId};
use crate::domain::recommendation::{
    RecommendationId, RecommendationSet, RecommendationView, RecommendedProduct,
};
use crate::errors::ApplicationError;
use crate::events::{ProductSummary, RecommendationCreated, CREATED_EVENT_PRODUCTS};
use crate::locks::UserLocks;
use crate::ports::{ActivityStore, Catalog, RecommendationStore};
use crate::recommend::{CandidateSelector, RecommendationEngine, UserPreferences};

/// Collaborators of [`RecommendationService`].
#[derive(Clone)]
pub struct ServiceDependencies {
    pub catalog: Arc<dyn Catalog>,
    pub activities: Arc<dyn ActivityStore>,
    pub recommendations: Arc<dyn RecommendationStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
}

/// Outcome of [`RecommendationService::record_activity`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedActivity {
    pub record: ActivityRecord,
    /// `false` when a record with the same id was already stored.
    pub inserted: bool,
}

pub struct RecommendationService {
    catalog: Arc<dyn Catalog>,
    activities: Arc<dyn ActivityStore>,
    recommendations: Arc<dyn RecommendationStore>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    engine: RecommendationEngine,
    config: RecommendationConfig,
    batch: BatchSettings,
    locks: UserLocks,
}

impl RecommendationService {
    pub fn new(dependencies: ServiceDependencies, config: RecommendationConfig) -> Self {
        let selector = CandidateSelector::new(
            dependencies.catalog.clone(),
            dependencies.activities.clone(),
            config.activity_history_limit,
            config.max_recommendations,
        );
        let engine = RecommendationEngine::new(selector, &config);

        Self {
            catalog: dependencies.catalog,
            activities: dependencies.activities,
            recommendations: dependencies.recommendations,
            publisher: dependencies.publisher,
            clock: dependencies.clock,
            engine,
            config,
            batch: BatchSettings::default(),
            locks: UserLocks::new(),
        }
    }

    pub fn with_batch_settings(mut self, batch: BatchSettings) -> Self {
        self.batch = batch;
        self
    }

    /// Return the user's active unsent set, or build, persist and announce a new one.
    ///
    /// Calls for the same user are serialized, so concurrent callers observe a
    /// single new set.
    pub async fn generate_user_recommendations(
        &self,
        user_id: &UserId,
        preferences: Option<&UserPreferences>,
    ) -> Result<RecommendationSet, ApplicationError> {
        let _guard = self.locks.acquire(user_id).await;
        let now = self.clock.now();

        if let Some(existing) = self.recommendations.find_latest_active(user_id, now, true).await? {
            debug!(
                event_name = "recommendation.reused",
                user_id = %user_id,
                recommendation_id = %existing.id,
                "reusing active recommendation set"
            );
            return Ok(existing);
        }

        let default_preferences = UserPreferences::default();
        let preferences = preferences.unwrap_or(&default_preferences);
        let ranked = self.engine.rank(user_id, preferences, now).await?;
        if ranked.is_empty() {
            return Err(ApplicationError::NoRecommendationsAvailable { user_id: user_id.to_string() });
        }

        let set = RecommendationSet::new(user_id.clone(), ranked, now, self.config.expiry());
        self.recommendations.save(set.clone()).await?;
        info!(
            event_name = "recommendation.created",
            user_id = %user_id,
            recommendation_id = %set.id,
            products = set.products.len(),
            expires_at = %set.expires_at,
            "recommendation set created"
        );

        self.announce(&set).await;
        Ok(set)
    }

    /// Latest active set (generated on demand) with products resolved.
    ///
    /// Reading delivers the set: an unsent set is marked sent with the current
    /// time before it is returned, and the returned view reflects that.
    pub async fn get_user_recommendations(
        &self,
        user_id: &UserId,
    ) -> Result<RecommendationView, ApplicationError> {
        let now = self.clock.now();
        let set = match self.recommendations.find_latest_active(user_id, now, false).await? {
            Some(set) => set,
            None => self.generate_user_recommendations(user_id, None).await?,
        };

        let products = self.resolve_products(&set).await?;
        let set = self.deliver(set).await?;
        Ok(RecommendationView::new(&set, products))
    }

    /// Flag a set as sent. Already-sent sets are returned unchanged.
    pub async fn mark_recommendation_as_sent(
        &self,
        id: &RecommendationId,
    ) -> Result<RecommendationSet, ApplicationError> {
        let set = self
            .recommendations
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("recommendation", id))?;
        self.deliver(set).await
    }

    /// Append a new activity for an existing product.
    pub async fn create_user_activity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        activity_type: ActivityType,
        metadata: Option<ActivityMetadata>,
    ) -> Result<ActivityRecord, ApplicationError> {
        let recorded = self
            .record_activity(ActivityId::generate(), user_id, product_id, activity_type, metadata)
            .await?;
        Ok(recorded.record)
    }

    /// Append an activity under a caller-chosen id. Re-recording an existing id
    /// is a no-op reported through [`RecordedActivity::inserted`].
    pub async fn record_activity(
        &self,
        id: ActivityId,
        user_id: &UserId,
        product_id: &ProductId,
        activity_type: ActivityType,
        metadata: Option<ActivityMetadata>,
    ) -> Result<RecordedActivity, ApplicationError> {
        if self.catalog.find_by_id(product_id).await?.is_none() {
            return Err(ApplicationError::not_found("product", product_id));
        }

        let record = ActivityRecord {
            id,
            user_id: user_id.clone(),
            product_id: product_id.clone(),
            activity_type,
            timestamp: self.clock.now(),
            metadata: metadata.unwrap_or_default(),
        };
        let inserted = self.activities.append(record.clone()).await?;

        if inserted {
            info!(
                event_name = "activity.recorded",
                user_id = %user_id,
                product_id = %product_id,
                activity_type = %activity_type,
                activity_id = %record.id,
                "user activity recorded"
            );
        } else {
            debug!(
                event_name = "activity.duplicate",
                activity_id = %record.id,
                "activity already recorded"
            );
        }
        Ok(RecordedActivity { record, inserted })
    }

    /// Generate for every user with activity using the configured batch settings.
    pub async fn generate_batch_recommendations(
        self: &Arc<Self>,
    ) -> Result<BatchOutcome, ApplicationError> {
        BatchOrchestrator::new(self.clone(), self.batch.clone())
            .run(&CancellationToken::new())
            .await
    }

    pub async fn users_with_activity(&self) -> Result<Vec<UserId>, ApplicationError> {
        Ok(self.activities.distinct_user_ids().await?)
    }

    async fn deliver(
        &self,
        mut set: RecommendationSet,
    ) -> Result<RecommendationSet, ApplicationError> {
        if set.mark_sent(self.clock.now()) {
            self.recommendations.save(set.clone()).await?;
            info!(
                event_name = "recommendation.sent",
                user_id = %set.user_id,
                recommendation_id = %set.id,
                "recommendation set marked as sent"
            );
        }
        Ok(set)
    }

    async fn resolve_products(
        &self,
        set: &RecommendationSet,
    ) -> Result<Vec<RecommendedProduct>, ApplicationError> {
        let mut resolved = Vec::with_capacity(set.products.len());
        for entry in &set.products {
            match self.catalog.find_by_id(&entry.product_id).await? {
                Some(product) => resolved.push(RecommendedProduct {
                    product,
                    score: entry.score,
                    reason: entry.reason,
                }),
                None => debug!(
                    event_name = "recommendation.product_missing",
                    recommendation_id = %set.id,
                    product_id = %entry.product_id,
                    "dropping recommended product that no longer exists"
                ),
            }
        }
        Ok(resolved)
    }

    /// Publish the creation event. Failures are logged and swallowed.
    async fn announce(&self, set: &RecommendationSet) {
        let mut products: Vec<Product> = Vec::with_capacity(CREATED_EVENT_PRODUCTS);
        for entry in set.products.iter().take(CREATED_EVENT_PRODUCTS) {
            match self.catalog.find_by_id(&entry.product_id).await {
                Ok(Some(product)) => products.push(product),
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        event_name = "recommendation.publish_failed",
                        recommendation_id = %set.id,
                        error = %error,
                        "could not resolve products for creation event"
                    );
                    return;
                }
            }
        }

        if products.is_empty() {
            debug!(
                event_name = "recommendation.publish_skipped",
                recommendation_id = %set.id,
                "no resolvable products; creation event not published"
            );
            return;
        }

        let event = RecommendationCreated {
            recommendation_id: set.id.to_string(),
            user_id: set.user_id.to_string(),
            products: products.iter().map(ProductSummary::from).collect(),
            timestamp: self.clock.now(),
        };

        let published = match serde_json::to_value(&event) {
            Ok(payload) => self
                .publisher
                .publish(topics::RECOMMENDATION_CREATED, payload)
                .await
                .map_err(|error| error.to_string()),
            Err(error) => Err(error.to_string()),
        };

        match published {
            Ok(()) => debug!(
                event_name = "recommendation.published",
                recommendation_id = %set.id,
                "creation event published"
            ),
            Err(error) => warn!(
                event_name = "recommendation.publish_failed",
                recommendation_id = %set.id,
                user_id = %set.user_id,
                error = %error,
                "creation event publish failed; recommendation kept"
            ),
        }
    }
}
