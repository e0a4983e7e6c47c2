use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::{Product, ProductId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub String);

impl ActivityId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    View,
    Cart,
    Purchase,
    Wishlist,
    Search,
}

impl ActivityType {
    pub const ALL: [ActivityType; 5] =
        [Self::View, Self::Cart, Self::Purchase, Self::Wishlist, Self::Search];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Cart => "cart",
            Self::Purchase => "purchase",
            Self::Wishlist => "wishlist",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "cart" => Ok(Self::Cart),
            "purchase" => Ok(Self::Purchase),
            "wishlist" => Ok(Self::Wishlist),
            "search" => Ok(Self::Search),
            other => Err(DomainError::UnknownActivityType(other.to_owned())),
        }
    }
}

/// Free-form interaction details. Which fields are present depends on the activity type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl ActivityMetadata {
    pub fn search(query: impl Into<String>) -> Self {
        Self { search_query: Some(query.into()), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One user/product interaction. Immutable once appended to the activity store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: ActivityId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub activity_type: ActivityType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: ActivityMetadata,
}

/// An activity record joined with the product it references.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedActivity {
    pub record: ActivityRecord,
    pub product: Product,
}

impl ResolvedActivity {
    pub fn activity_type(&self) -> ActivityType {
        self.record.activity_type
    }

    pub fn category(&self) -> &str {
        &self.product.category
    }
}
