use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row, Sqlite};

use curio_core::domain::product::{Product, ProductId};
use curio_core::ports::{Catalog, ProductQuery, RepositoryError};

use super::{db_error, decode_error, encode_time};
use crate::DbPool;

const PRODUCT_COLUMNS: &str =
    "SELECT id, name, description, price, image_url, category, tags_json, rating, in_stock
     FROM product";

pub struct SqlCatalog {
    pool: DbPool,
}

impl SqlCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let description: String = row.try_get("description").map_err(decode_error)?;
    let price_str: String = row.try_get("price").map_err(decode_error)?;
    let image_url: String = row.try_get("image_url").map_err(decode_error)?;
    let category: String = row.try_get("category").map_err(decode_error)?;
    let tags_json: String = row.try_get("tags_json").map_err(decode_error)?;
    let rating: f64 = row.try_get("rating").map_err(decode_error)?;
    let in_stock: bool = row.try_get("in_stock").map_err(decode_error)?;

    let price = Decimal::from_str(&price_str)
        .map_err(|e| RepositoryError::Decode(format!("price for {id}: {e}")))?;
    let tags: BTreeSet<String> = serde_json::from_str(&tags_json)
        .map_err(|e| RepositoryError::Decode(format!("tags for {id}: {e}")))?;

    Ok(Product {
        id: ProductId(id),
        name,
        description,
        price,
        image_url,
        category,
        tags,
        rating,
        in_stock,
    })
}

fn push_in_list<'a, I>(builder: &mut QueryBuilder<'a, Sqlite>, values: I)
where
    I: IntoIterator<Item = String>,
{
    builder.push(" (");
    let mut separated = builder.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

#[async_trait::async_trait]
impl Catalog for SqlCatalog {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("{PRODUCT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        if query.categories.as_ref().is_some_and(BTreeSet::is_empty) || query.limit == Some(0) {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(PRODUCT_COLUMNS);
        builder.push(" WHERE 1 = 1");
        if query.in_stock_only {
            builder.push(" AND in_stock = 1");
        }
        if let Some(categories) = &query.categories {
            builder.push(" AND category IN");
            push_in_list(&mut builder, categories.iter().cloned());
        }
        if !query.excluded_categories.is_empty() {
            builder.push(" AND category NOT IN");
            push_in_list(&mut builder, query.excluded_categories.iter().cloned());
        }
        if !query.excluded_ids.is_empty() {
            builder.push(" AND id NOT IN");
            push_in_list(&mut builder, query.excluded_ids.iter().map(|id| id.0.clone()));
        }
        builder.push(" ORDER BY rating DESC, id ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = builder.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_product).collect()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let tags_json = serde_json::to_string(&product.tags).map_err(decode_error)?;
        let now = encode_time(Utc::now());

        sqlx::query(
            "INSERT INTO product (id, name, description, price, image_url, category, tags_json,
                                  rating, in_stock, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 price = excluded.price,
                 image_url = excluded.image_url,
                 category = excluded.category,
                 tags_json = excluded.tags_json,
                 rating = excluded.rating,
                 in_stock = excluded.in_stock,
                 updated_at = excluded.updated_at",
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(&product.image_url)
        .bind(&product.category)
        .bind(tags_json)
        .bind(product.rating)
        .bind(product.in_stock)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }
}
