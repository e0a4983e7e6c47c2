use sqlx::Row;

use curio_core::domain::activity::{
    ActivityId, ActivityMetadata, ActivityRecord, ActivityType, UserId,
};
use curio_core::domain::product::ProductId;
use curio_core::ports::{ActivityStore, RepositoryError};

use super::{db_error, decode_error, decode_time, encode_time};
use crate::DbPool;

pub struct SqlActivityStore {
    pool: DbPool,
}

impl SqlActivityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> Result<ActivityRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let user_id: String = row.try_get("user_id").map_err(decode_error)?;
    let product_id: String = row.try_get("product_id").map_err(decode_error)?;
    let type_str: String = row.try_get("activity_type").map_err(decode_error)?;
    let occurred_at: String = row.try_get("occurred_at").map_err(decode_error)?;
    let metadata_json: String = row.try_get("metadata_json").map_err(decode_error)?;

    let activity_type: ActivityType = type_str.parse().map_err(decode_error)?;
    let metadata: ActivityMetadata = serde_json::from_str(&metadata_json)
        .map_err(|e| RepositoryError::Decode(format!("metadata for {id}: {e}")))?;

    Ok(ActivityRecord {
        id: ActivityId(id),
        user_id: UserId(user_id),
        product_id: ProductId(product_id),
        activity_type,
        timestamp: decode_time("occurred_at", &occurred_at)?,
        metadata,
    })
}

#[async_trait::async_trait]
impl ActivityStore for SqlActivityStore {
    async fn find_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, product_id, activity_type, occurred_at, metadata_json
             FROM user_activity
             WHERE user_id = ?
             ORDER BY occurred_at DESC, id ASC
             LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_activity).collect()
    }

    async fn distinct_user_ids(&self) -> Result<Vec<UserId>, RepositoryError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT user_id FROM user_activity ORDER BY user_id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn append(&self, record: ActivityRecord) -> Result<bool, RepositoryError> {
        let metadata_json = serde_json::to_string(&record.metadata).map_err(decode_error)?;

        let result = sqlx::query(
            "INSERT INTO user_activity (id, user_id, product_id, activity_type, occurred_at,
                                        metadata_json)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&record.id.0)
        .bind(&record.user_id.0)
        .bind(&record.product_id.0)
        .bind(record.activity_type.as_str())
        .bind(encode_time(record.timestamp))
        .bind(metadata_json)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }
}
