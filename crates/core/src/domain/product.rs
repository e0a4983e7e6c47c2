use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Catalog record. Owned by the catalog; the recommendation engine only reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub category: String,
    pub tags: BTreeSet<String>,
    /// Average customer rating in `0.0..=5.0`.
    pub rating: f64,
    pub in_stock: bool,
}

impl Product {
    pub fn shared_tag_count(&self, other: &Product) -> usize {
        self.tags.intersection(&other.tags).count()
    }

    /// Shared tags over the larger of the two tag sets.
    pub fn tag_similarity(&self, other: &Product) -> f64 {
        let larger = self.tags.len().max(other.tags.len());
        if larger == 0 {
            return 0.0;
        }
        self.shared_tag_count(other) as f64 / larger as f64
    }
}
