//! Deterministic demo data: a ten-product catalog and a few weeks of activity
//! for four users. Used by `curio seed` and by tests.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use curio_core::domain::activity::{
    ActivityId, ActivityMetadata, ActivityRecord, ActivityType, UserId,
};
use curio_core::domain::product::{Product, ProductId};
use curio_core::ports::{ActivityStore, Catalog, RepositoryError};

pub const DEFAULT_SEED: u64 = 42;

pub const SEED_USER_IDS: &[&str] = &[
    "607f1f77bcf86cd799439011",
    "607f1f77bcf86cd799439012",
    "607f1f77bcf86cd799439013",
    "607f1f77bcf86cd799439014",
];

#[derive(Debug, Clone, Copy)]
struct SeedProduct {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    category: &'static str,
    tags: &'static [&'static str],
    rating: f64,
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        id: "smartphone-x",
        name: "Smartphone X",
        description: "Latest smartphone with amazing features",
        price_cents: 99_999,
        category: "electronics",
        tags: &["smartphone", "mobile", "tech"],
        rating: 4.5,
    },
    SeedProduct {
        id: "laptop-pro",
        name: "Laptop Pro",
        description: "Powerful laptop for professionals",
        price_cents: 149_999,
        category: "electronics",
        tags: &["laptop", "computer", "tech"],
        rating: 4.7,
    },
    SeedProduct {
        id: "wireless-headphones",
        name: "Wireless Headphones",
        description: "Premium wireless headphones with noise cancellation",
        price_cents: 29_999,
        category: "electronics",
        tags: &["headphones", "audio", "tech"],
        rating: 4.3,
    },
    SeedProduct {
        id: "summer-tshirt",
        name: "Summer T-Shirt",
        description: "Comfortable cotton t-shirt for summer",
        price_cents: 2_999,
        category: "clothing",
        tags: &["t-shirt", "summer", "fashion"],
        rating: 4.1,
    },
    SeedProduct {
        id: "denim-jeans",
        name: "Denim Jeans",
        description: "Classic denim jeans for everyday wear",
        price_cents: 4_999,
        category: "clothing",
        tags: &["jeans", "denim", "fashion"],
        rating: 4.4,
    },
    SeedProduct {
        id: "running-shoes",
        name: "Running Shoes",
        description: "Lightweight running shoes for athletes",
        price_cents: 12_999,
        category: "footwear",
        tags: &["shoes", "running", "sports"],
        rating: 4.6,
    },
    SeedProduct {
        id: "coffee-table",
        name: "Coffee Table",
        description: "Modern coffee table for your living room",
        price_cents: 19_999,
        category: "furniture",
        tags: &["table", "living room", "home"],
        rating: 4.2,
    },
    SeedProduct {
        id: "decorative-lamp",
        name: "Decorative Lamp",
        description: "Elegant lamp for home decoration",
        price_cents: 7_999,
        category: "home",
        tags: &["lamp", "lighting", "decor"],
        rating: 4.0,
    },
    SeedProduct {
        id: "kitchen-blender",
        name: "Kitchen Blender",
        description: "High-performance blender for your kitchen",
        price_cents: 14_999,
        category: "appliances",
        tags: &["blender", "kitchen", "home"],
        rating: 4.5,
    },
    SeedProduct {
        id: "yoga-mat",
        name: "Yoga Mat",
        description: "Non-slip yoga mat for your workouts",
        price_cents: 3_999,
        category: "fitness",
        tags: &["yoga", "fitness", "sports"],
        rating: 4.3,
    },
];

impl SeedProduct {
    fn to_product(self) -> Product {
        Product {
            id: ProductId::from(self.id),
            name: self.name.to_owned(),
            description: self.description.to_owned(),
            price: Decimal::new(self.price_cents, 2),
            image_url: format!("https://example.com/{}.jpg", self.id),
            category: self.category.to_owned(),
            tags: self.tags.iter().map(|tag| (*tag).to_owned()).collect(),
            rating: self.rating,
            in_stock: true,
        }
    }
}

/// Seeded catalog plus pseudo-random but reproducible user activity.
///
/// Activity ids are derived from the user and a per-user counter, so loading
/// twice with the same seed leaves the stores unchanged.
#[derive(Debug, Clone, Copy)]
pub struct SeedDataset {
    seed: u64,
}

impl Default for SeedDataset {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl SeedDataset {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn products() -> Vec<Product> {
        SEED_PRODUCTS.iter().map(|seed| seed.to_product()).collect()
    }

    pub fn user_ids() -> Vec<UserId> {
        SEED_USER_IDS.iter().map(|id| UserId::from(*id)).collect()
    }

    /// Per user: five views, two cart adds and one purchase, then an optional
    /// wishlist entry and an optional category search.
    pub fn activities(&self, now: DateTime<Utc>) -> Vec<ActivityRecord> {
        let products = Self::products();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut records = Vec::new();

        for user in SEED_USER_IDS.iter().copied() {
            let mut builder = ActivityBuilder { user, now, sequence: 0, records: &mut records };

            for _ in 0..5 {
                let product = &products[rng.gen_range(0..products.len())];
                let metadata = ActivityMetadata {
                    view_duration: Some(rng.gen_range(10..310)),
                    ..ActivityMetadata::default()
                };
                builder.push(product, ActivityType::View, rng.gen_range(0..30), metadata);
            }

            for _ in 0..2 {
                let product = &products[rng.gen_range(0..products.len())];
                let metadata = ActivityMetadata {
                    quantity: Some(rng.gen_range(1..=3)),
                    ..ActivityMetadata::default()
                };
                builder.push(product, ActivityType::Cart, rng.gen_range(0..15), metadata);
            }

            let product = &products[rng.gen_range(0..products.len())];
            let metadata = ActivityMetadata {
                quantity: Some(rng.gen_range(1..=2)),
                price: Some(product.price),
                order_id: Some(format!("ORD-{}", rng.gen_range(1000..11000))),
                ..ActivityMetadata::default()
            };
            builder.push(product, ActivityType::Purchase, rng.gen_range(0..60), metadata);

            if rng.gen_bool(0.5) {
                let product = &products[rng.gen_range(0..products.len())];
                let days = rng.gen_range(0..45);
                builder.push(product, ActivityType::Wishlist, days, ActivityMetadata::default());
            }

            if rng.gen_bool(0.7) {
                let product = &products[rng.gen_range(0..products.len())];
                let metadata = ActivityMetadata::search(product.category.clone());
                builder.push(product, ActivityType::Search, rng.gen_range(0..20), metadata);
            }
        }

        records
    }

    pub async fn load(
        &self,
        catalog: &dyn Catalog,
        activities: &dyn ActivityStore,
        now: DateTime<Utc>,
    ) -> Result<SeedResult, RepositoryError> {
        let products = Self::products();
        let products_seeded = products.len();
        for product in products {
            catalog.save(product).await?;
        }

        let mut activities_seeded = 0;
        let mut activities_skipped = 0;
        for record in self.activities(now) {
            if activities.append(record).await? {
                activities_seeded += 1;
            } else {
                activities_skipped += 1;
            }
        }

        info!(
            event_name = "seed.loaded",
            seed = self.seed,
            products = products_seeded,
            activities = activities_seeded,
            skipped = activities_skipped,
            "seed dataset loaded"
        );

        Ok(SeedResult {
            seed: self.seed,
            products_seeded,
            activities_seeded,
            activities_skipped,
            users: SEED_USER_IDS.iter().map(|id| (*id).to_owned()).collect(),
        })
    }

    /// Check that every seeded product is present and each seed user has history.
    pub async fn verify(
        catalog: &dyn Catalog,
        activities: &dyn ActivityStore,
    ) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for seed in SEED_PRODUCTS {
            let present = catalog.find_by_id(&ProductId::from(seed.id)).await?.is_some();
            checks.push((format!("product:{}", seed.id), present));
        }
        for user in SEED_USER_IDS {
            let history = activities.find_by_user(&UserId::from(*user), 1).await?;
            checks.push((format!("activity:{user}"), !history.is_empty()));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

struct ActivityBuilder<'a> {
    user: &'a str,
    now: DateTime<Utc>,
    sequence: usize,
    records: &'a mut Vec<ActivityRecord>,
}

impl ActivityBuilder<'_> {
    fn push(
        &mut self,
        product: &Product,
        activity_type: ActivityType,
        days_ago: i64,
        metadata: ActivityMetadata,
    ) {
        self.sequence += 1;
        self.records.push(ActivityRecord {
            id: ActivityId(format!("seed-{}-{:02}", self.user, self.sequence)),
            user_id: UserId::from(self.user),
            product_id: product.id.clone(),
            activity_type,
            timestamp: self.now - Duration::days(days_ago),
            metadata,
        });
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedResult {
    pub seed: u64,
    pub products_seeded: usize,
    pub activities_seeded: usize,
    pub activities_skipped: usize,
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use curio_core::domain::activity::ActivityType;

    use super::{SeedDataset, SEED_USER_IDS};
    use crate::repositories::{InMemoryActivityStore, InMemoryCatalog};

    #[test]
    fn catalog_has_ten_in_stock_products_with_valid_ratings() {
        let products = SeedDataset::products();

        assert_eq!(products.len(), 10);
        assert!(products.iter().all(|p| p.in_stock && (0.0..=5.0).contains(&p.rating)));
        assert!(products.iter().all(|p| p.tags.len() == 3));
    }

    #[test]
    fn activities_are_reproducible_for_a_seed() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();

        let first = SeedDataset::new(7).activities(now);
        let second = SeedDataset::new(7).activities(now);

        assert_eq!(first, second);
        assert!(first.iter().all(|r| r.timestamp <= now));
    }

    #[test]
    fn every_user_gets_core_activity_mix() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let records = SeedDataset::default().activities(now);

        for user in SEED_USER_IDS {
            let count = |kind: ActivityType| {
                records.iter().filter(|r| r.user_id.0 == *user && r.activity_type == kind).count()
            };
            assert_eq!(count(ActivityType::View), 5);
            assert_eq!(count(ActivityType::Cart), 2);
            assert_eq!(count(ActivityType::Purchase), 1);
        }

        let searches = records.iter().filter(|r| r.activity_type == ActivityType::Search);
        for search in searches {
            assert!(search.metadata.search_query.is_some());
        }
    }

    #[tokio::test]
    async fn load_is_idempotent_and_verifies() {
        let catalog = InMemoryCatalog::default();
        let activities = InMemoryActivityStore::default();
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let dataset = SeedDataset::default();

        let first = dataset.load(&catalog, &activities, now).await.expect("load");
        let second = dataset.load(&catalog, &activities, now).await.expect("reload");
        let verified = SeedDataset::verify(&catalog, &activities).await.expect("verify");

        assert_eq!(first.products_seeded, 10);
        assert!(first.activities_seeded >= 32);
        assert_eq!(second.activities_seeded, 0);
        assert_eq!(second.activities_skipped, first.activities_seeded);
        assert!(verified.all_present);
    }
}
