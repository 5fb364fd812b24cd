use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use aerodesk_core::domain::policy::PolicySection;

use super::{decode_error, PolicyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPolicyRepository {
    pool: DbPool,
}

impl SqlPolicyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_section(row: &SqliteRow) -> Result<PolicySection, RepositoryError> {
    let embedding_json: Option<String> = row.try_get("embedding_json").map_err(decode_error)?;
    let embedding = embedding_json
        .map(|raw| serde_json::from_str::<Vec<f32>>(&raw).map_err(decode_error))
        .transpose()?;

    Ok(PolicySection {
        id: row.try_get("id").map_err(decode_error)?,
        title: row.try_get("title").map_err(decode_error)?,
        content: row.try_get("content").map_err(decode_error)?,
        embedding,
    })
}

#[async_trait::async_trait]
impl PolicyRepository for SqlPolicyRepository {
    async fn list_sections(&self) -> Result<Vec<PolicySection>, RepositoryError> {
        let rows =
            sqlx::query("SELECT id, title, content, embedding_json FROM policies ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_section).collect()
    }

    async fn store_embedding(&self, id: i64, embedding: &[f32]) -> Result<(), RepositoryError> {
        let encoded = serde_json::to_string(embedding).map_err(decode_error)?;
        sqlx::query("UPDATE policies SET embedding_json = ? WHERE id = ?")
            .bind(encoded)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
