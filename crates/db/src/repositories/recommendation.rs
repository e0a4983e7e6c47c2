use sqlx::Row;

use curio_core::domain::activity::UserId;
use curio_core::domain::product::ProductId;
use curio_core::domain::recommendation::{
    RecommendationId, RecommendationReason, RecommendationSet, ScoredProduct,
};
use curio_core::ports::{RecommendationStore, RepositoryError};

use super::{db_error, decode_error, decode_time, encode_time};
use crate::DbPool;

const SET_COLUMNS: &str =
    "SELECT id, user_id, created_at, expires_at, sent, sent_at FROM recommendation_set";

/// Recommendation sets with their ranked items kept in `recommendation_item`,
/// ordered by `position`.
pub struct SqlRecommendationStore {
    pool: DbPool,
}

impl SqlRecommendationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, id: &str) -> Result<Vec<ScoredProduct>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_id, score, reason
             FROM recommendation_item
             WHERE recommendation_id = ?
             ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn hydrate(
        &self,
        row: Option<sqlx::sqlite::SqliteRow>,
    ) -> Result<Option<RecommendationSet>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let mut set = row_to_set(&row)?;
        set.products = self.load_items(&set.id.0).await?;
        Ok(Some(set))
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<ScoredProduct, RepositoryError> {
    let product_id: String = row.try_get("product_id").map_err(decode_error)?;
    let score: f64 = row.try_get("score").map_err(decode_error)?;
    let reason_str: String = row.try_get("reason").map_err(decode_error)?;
    let reason: RecommendationReason = reason_str.parse().map_err(decode_error)?;

    Ok(ScoredProduct { product_id: ProductId(product_id), score, reason })
}

fn row_to_set(row: &sqlx::sqlite::SqliteRow) -> Result<RecommendationSet, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let user_id: String = row.try_get("user_id").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let expires_at: String = row.try_get("expires_at").map_err(decode_error)?;
    let sent: bool = row.try_get("sent").map_err(decode_error)?;
    let sent_at: Option<String> = row.try_get("sent_at").map_err(decode_error)?;

    Ok(RecommendationSet {
        id: RecommendationId(id),
        user_id: UserId(user_id),
        products: Vec::new(),
        created_at: decode_time("created_at", &created_at)?,
        expires_at: decode_time("expires_at", &expires_at)?,
        sent,
        sent_at: sent_at.as_deref().map(|raw| decode_time("sent_at", raw)).transpose()?,
    })
}

#[async_trait::async_trait]
impl RecommendationStore for SqlRecommendationStore {
    async fn find_latest_active(
        &self,
        user_id: &UserId,
        now: chrono::DateTime<chrono::Utc>,
        unsent_only: bool,
    ) -> Result<Option<RecommendationSet>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{SET_COLUMNS}
             WHERE user_id = ? AND expires_at > ? AND (? = 0 OR sent = 0)
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(&user_id.0)
        .bind(encode_time(now))
        .bind(unsent_only)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        self.hydrate(row).await
    }

    async fn find_by_id(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<RecommendationSet>, RepositoryError> {
        let row = sqlx::query(&format!("{SET_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        self.hydrate(row).await
    }

    async fn save(&self, set: RecommendationSet) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO recommendation_set (id, user_id, created_at, expires_at, sent, sent_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 expires_at = excluded.expires_at,
                 sent = excluded.sent,
                 sent_at = excluded.sent_at",
        )
        .bind(&set.id.0)
        .bind(&set.user_id.0)
        .bind(encode_time(set.created_at))
        .bind(encode_time(set.expires_at))
        .bind(set.sent)
        .bind(set.sent_at.map(encode_time))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("DELETE FROM recommendation_item WHERE recommendation_id = ?")
            .bind(&set.id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for (position, item) in set.products.iter().enumerate() {
            sqlx::query(
                "INSERT INTO recommendation_item (recommendation_id, position, product_id, score,
                                                  reason)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&set.id.0)
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .bind(&item.product_id.0)
            .bind(item.score)
            .bind(item.reason.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }
}
