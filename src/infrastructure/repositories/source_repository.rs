use super::checkpoint_repository::{CheckpointRepository, SourceCatalog};
use crate::domain::feed::Source;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct SourceRepository {
    pool: Arc<DbPool>,
}

impl SourceRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointRepository for SourceRepository {
    async fn get_last_checked(&self, source_id: &str) -> AppResult<Option<DateTime<Utc>>> {
        let pool = self.pool.as_ref();
        let checked = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT last_checked_at
            FROM sources
            WHERE id = $1
            "#,
        )
        .bind(source_id)
        .fetch_optional(pool)
        .await?;

        Ok(checked.flatten())
    }

    async fn set_last_checked(&self, source_id: &str, at: DateTime<Utc>) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO sources (id, last_checked_at, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET last_checked_at = GREATEST(sources.last_checked_at, EXCLUDED.last_checked_at)
            "#,
        )
        .bind(source_id)
        .bind(at)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SourceCatalog for SourceRepository {
    async fn list_sources(&self) -> AppResult<Vec<Source>> {
        let pool = self.pool.as_ref();
        let sources = sqlx::query_as::<_, Source>(
            r#"
            SELECT id, title, last_checked_at
            FROM sources
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(sources)
    }

    async fn upsert_source(&self, source: &Source) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO sources (id, title, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET title = COALESCE(EXCLUDED.title, sources.title)
            "#,
        )
        .bind(&source.id)
        .bind(&source.title)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }
}
