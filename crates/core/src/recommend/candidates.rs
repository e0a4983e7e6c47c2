//! Candidate selection from activity history and the catalog

use std::sync::Arc;

use tracing::debug;

use super::types::{CandidateSelection, InterestProfile, UserPreferences};
use crate::domain::activity::{ResolvedActivity, UserId};
use crate::domain::product::Product;
use crate::ports::{ActivityStore, Catalog, ProductQuery, RepositoryError};

/// Picks the bounded set of products worth scoring for one user.
#[derive(Clone)]
pub struct CandidateSelector {
    catalog: Arc<dyn Catalog>,
    activities: Arc<dyn ActivityStore>,
    history_limit: usize,
    max_recommendations: usize,
}

impl CandidateSelector {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        activities: Arc<dyn ActivityStore>,
        history_limit: usize,
        max_recommendations: usize,
    ) -> Self {
        Self { catalog, activities, history_limit, max_recommendations }
    }

    /// Select candidates for `user_id`.
    ///
    /// Users whose recent history resolves to no product get the popularity
    /// fallback. Everyone else gets unseen in-stock products from their interest
    /// categories, topped up from other categories when the pool is short.
    pub async fn select(
        &self,
        user_id: &UserId,
        preferences: &UserPreferences,
    ) -> Result<CandidateSelection, RepositoryError> {
        let activities = self.resolved_history(user_id).await?;
        if activities.is_empty() {
            let candidates = self.popular(preferences).await?;
            debug!(
                event_name = "recommend.candidates.popular",
                user_id = %user_id,
                candidates = candidates.len(),
                "no usable history; using popularity fallback"
            );
            return Ok(CandidateSelection::Popular { candidates });
        }

        let profile = InterestProfile::from_activities(&activities);
        let interests = profile.categories();

        let mut candidates = if interests.is_empty() {
            Vec::new()
        } else {
            let query = ProductQuery::in_stock()
                .in_categories(interests.iter().cloned())
                .excluding_ids(&profile.interacted);
            self.catalog.query(&query).await?
        };

        if candidates.len() < self.max_recommendations {
            let shortfall = self.max_recommendations - candidates.len();
            let query = ProductQuery::in_stock()
                .excluding_categories(interests.iter().cloned())
                .excluding_ids(&profile.interacted)
                .limit(shortfall);
            candidates.extend(self.catalog.query(&query).await?);
        }

        debug!(
            event_name = "recommend.candidates.personalized",
            user_id = %user_id,
            history = activities.len(),
            interests = interests.len(),
            candidates = candidates.len(),
            "candidates selected"
        );
        Ok(CandidateSelection::Personalized { candidates, activities })
    }

    /// Most recent activity joined with its product; dangling records are skipped.
    pub async fn resolved_history(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ResolvedActivity>, RepositoryError> {
        let records = self.activities.find_by_user(user_id, self.history_limit).await?;
        let mut resolved = Vec::with_capacity(records.len());
        for record in records {
            match self.catalog.find_by_id(&record.product_id).await? {
                Some(product) => resolved.push(ResolvedActivity { record, product }),
                None => debug!(
                    event_name = "recommend.activity.dangling",
                    user_id = %user_id,
                    product_id = %record.product_id,
                    "skipping activity for unknown product"
                ),
            }
        }
        Ok(resolved)
    }

    /// Highest-rated in-stock products, preferred categories first.
    pub async fn popular(
        &self,
        preferences: &UserPreferences,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut products = if preferences.is_empty() {
            Vec::new()
        } else {
            let query = ProductQuery::in_stock()
                .in_categories(preferences.categories.iter().cloned())
                .limit(self.max_recommendations);
            self.catalog.query(&query).await?
        };

        if products.len() < self.max_recommendations {
            let query = ProductQuery::in_stock()
                .excluding_categories(preferences.categories.iter().cloned())
                .limit(self.max_recommendations - products.len());
            products.extend(self.catalog.query(&query).await?);
        }

        Ok(products)
    }
}
