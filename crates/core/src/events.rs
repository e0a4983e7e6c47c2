//! JSON payloads exchanged over the broker. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::activity::ActivityMetadata;
use crate::domain::product::Product;
use crate::recommend::UserPreferences;

/// Products included in a creation event.
pub const CREATED_EVENT_PRODUCTS: usize = 3;

/// Published on `recommendation.created` after a set is persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationCreated {
    pub recommendation_id: String,
    pub user_id: String,
    pub products: Vec<ProductSummary>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub image_url: String,
    pub category: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.0.clone(),
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            category: product.category.clone(),
        }
    }
}

/// Consumed from `user.activity`.
///
/// `eventId` is optional; when present it becomes the activity id so that
/// redelivered events are stored once.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    pub user_id: String,
    pub product_id: String,
    pub activity_type: String,
    #[serde(default)]
    pub metadata: ActivityMetadata,
}

/// Consumed from `user.preferences.updated`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdatedEvent {
    pub user_id: String,
    pub preferences: UserPreferences,
}

/// Consumed from `user.created`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedEvent {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}
