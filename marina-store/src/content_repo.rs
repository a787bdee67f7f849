use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marina_core::repository::ContentRepository;
use marina_core::{CoreResult, SiteContent};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::db_err;

pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ContentRow {
    section: String,
    content: Value,
    updated_by: Option<Uuid>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ContentRow> for SiteContent {
    fn from(row: ContentRow) -> Self {
        SiteContent {
            section: row.section,
            content: row.content,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn get_section(&self, section: &str) -> CoreResult<Option<SiteContent>> {
        let row = sqlx::query_as::<_, ContentRow>(
            "SELECT section, content, updated_by, updated_at FROM site_content WHERE section = $1",
        )
        .bind(section)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(SiteContent::from))
    }

    async fn put_section(
        &self,
        section: &str,
        content: &Value,
        updated_by: Uuid,
    ) -> CoreResult<SiteContent> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            INSERT INTO site_content (section, content, updated_by, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (section) DO UPDATE
                SET content = EXCLUDED.content,
                    updated_by = EXCLUDED.updated_by,
                    updated_at = now()
            RETURNING section, content, updated_by, updated_at
            "#,
        )
        .bind(section)
        .bind(content)
        .bind(updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.into())
    }
}
