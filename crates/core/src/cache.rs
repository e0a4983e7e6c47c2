use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::domain::product::{Product, ProductId};
use crate::ports::{Catalog, ProductQuery, RepositoryError};

const DEFAULT_CAPACITY: u64 = 10_000;

/// TTL cache in front of a slower lookup. Only hits are cached, so a missing
/// key is looked up again on the next call.
#[derive(Clone)]
pub struct ReadThroughCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    entries: Option<Cache<K, V>>,
}

impl<K, V> ReadThroughCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A zero `ttl` disables caching entirely.
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: u64) -> Self {
        let entries = (!ttl.is_zero())
            .then(|| Cache::builder().max_capacity(capacity).time_to_live(ttl).build());
        Self { entries }
    }

    /// Concurrent calls for the same key share one `fetch`.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        E: Clone + Send + Sync + 'static,
    {
        let Some(entries) = &self.entries else {
            return fetch().await;
        };

        let loaded = entries
            .try_get_with(key, async {
                match fetch().await {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => Err(Lookup::Missing),
                    Err(error) => Err(Lookup::Failed(error)),
                }
            })
            .await;

        match loaded {
            Ok(value) => Ok(Some(value)),
            Err(miss) => match miss.as_ref() {
                Lookup::Missing => Ok(None),
                Lookup::Failed(error) => Err(error.clone()),
            },
        }
    }

    pub async fn invalidate(&self, key: &K) {
        if let Some(entries) = &self.entries {
            entries.invalidate(key).await;
        }
    }
}

/// Why a fetch produced no cache entry.
enum Lookup<E> {
    Missing,
    Failed(E),
}

/// Catalog decorator that serves `find_by_id` from a [`ReadThroughCache`].
pub struct CachedCatalog {
    inner: Arc<dyn Catalog>,
    products: ReadThroughCache<ProductId, Product>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn Catalog>, ttl: Duration) -> Self {
        Self { inner, products: ReadThroughCache::new(ttl) }
    }
}

#[async_trait]
impl Catalog for CachedCatalog {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.products.get_or_fetch(id.clone(), || self.inner.find_by_id(id)).await
    }

    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        self.inner.query(query).await
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let id = product.id.clone();
        self.inner.save(product).await?;
        self.products.invalidate(&id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::RwLock;

    use super::{CachedCatalog, ReadThroughCache};
    use crate::domain::product::{Product, ProductId};
    use crate::ports::{Catalog, ProductQuery, RepositoryError};

    #[derive(Default)]
    struct CountingCatalog {
        products: RwLock<HashMap<ProductId, Product>>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl Catalog for CountingCatalog {
        async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.products.read().await.get(id).cloned())
        }

        async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
            Ok(query.apply(self.products.read().await.values().cloned()))
        }

        async fn save(&self, product: Product) -> Result<(), RepositoryError> {
            self.products.write().await.insert(product.id.clone(), product);
            Ok(())
        }
    }

    fn lamp(name: &str) -> Product {
        Product {
            id: ProductId::from("lamp"),
            name: name.to_owned(),
            description: String::new(),
            price: Decimal::new(4999, 2),
            image_url: String::new(),
            category: "home".to_owned(),
            tags: BTreeSet::new(),
            rating: 4.2,
            in_stock: true,
        }
    }

    #[tokio::test]
    async fn hits_are_served_without_refetching() {
        let cache: ReadThroughCache<&'static str, u32> =
            ReadThroughCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch("answer", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RepositoryError>(Some(42))
                })
                .await;
            assert_eq!(value, Ok(Some(42)));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let cache: ReadThroughCache<&'static str, u32> =
            ReadThroughCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_fetch("missing", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RepositoryError>(None)
                })
                .await;
            assert_eq!(value, Ok(None));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let cache: ReadThroughCache<&'static str, u32> =
            ReadThroughCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, RepositoryError>(Some(7))
        };

        let (first, second) =
            tokio::join!(cache.get_or_fetch("shared", fetch), cache.get_or_fetch("shared", fetch));

        assert_eq!(first, Ok(Some(7)));
        assert_eq!(second, Ok(Some(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_errors_are_returned_and_not_cached() {
        let cache: ReadThroughCache<&'static str, u32> =
            ReadThroughCache::new(Duration::from_secs(60));

        let failed = cache
            .get_or_fetch("flaky", || async {
                Err::<Option<u32>, _>(RepositoryError::Unavailable("pool timed out".to_owned()))
            })
            .await;
        let recovered =
            cache.get_or_fetch("flaky", || async { Ok::<_, RepositoryError>(Some(3)) }).await;

        assert_eq!(failed, Err(RepositoryError::Unavailable("pool timed out".to_owned())));
        assert_eq!(recovered, Ok(Some(3)));
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let cache: ReadThroughCache<&'static str, u32> = ReadThroughCache::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let _ = cache
                .get_or_fetch("key", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RepositoryError>(Some(1))
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cached_catalog_invalidates_on_save() {
        let inner = Arc::new(CountingCatalog::default());
        let catalog = CachedCatalog::new(inner.clone(), Duration::from_secs(60));
        let id = ProductId::from("lamp");

        catalog.save(lamp("Decorative Lamp")).await.expect("seed");
        let first = catalog.find_by_id(&id).await.expect("lookup");
        let second = catalog.find_by_id(&id).await.expect("lookup");
        assert_eq!(first, second);
        assert_eq!(inner.lookups.load(Ordering::SeqCst), 1);

        catalog.save(lamp("Brass Lamp")).await.expect("update");
        let refreshed = catalog.find_by_id(&id).await.expect("lookup").expect("present");
        assert_eq!(refreshed.name, "Brass Lamp");
        assert_eq!(inner.lookups.load(Ordering::SeqCst), 2);
    }
}
