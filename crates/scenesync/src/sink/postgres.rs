//! Postgres document sink
//!
//! Stores each scene as one JSONB document keyed by the scene identifier.
//! Duplicate suppression leans on the primary key: `ON CONFLICT DO NOTHING`
//! for both single and bulk writes, so a conflict is never an error. A bulk
//! insert is a single statement; a statement-level failure is sink I/O and
//! therefore fatal, unlike the per-item rejections the search sink reports.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{debug, info};

use super::{BulkReport, SceneSink, WriteOutcome};
use crate::error::{Result, SyncError};
use crate::record::SceneRecord;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Document-table sink backed by Postgres.
pub struct PostgresSink {
    pool: PgPool,
    table: String,
}

impl PostgresSink {
    /// Connect to the database and target one document table.
    pub async fn connect(url: &str, table: &str) -> Result<Self> {
        validate_table_name(table)?;

        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .connect(url)
            .await?;

        debug!(table, "connected to document sink");
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Build a sink over an existing pool.
    pub fn with_pool(pool: PgPool, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

/// Table names are interpolated into SQL, so they are restricted to plain
/// identifiers rather than bound as parameters.
fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(SyncError::Config(format!(
            "invalid table name '{}': use letters, digits and underscores",
            table
        )))
    }
}

#[async_trait]
impl SceneSink for PostgresSink {
    async fn ensure_target(&self) -> Result<()> {
        info!(table = %self.table, "ensuring document table exists");
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                scene_id TEXT PRIMARY KEY,
                document JSONB NOT NULL,
                ingested_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists(&self, scene_id: &str) -> Result<bool> {
        let row = sqlx::query(&format!(
            "SELECT 1 AS present FROM {} WHERE scene_id = $1",
            self.table
        ))
        .bind(scene_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn write_one(&self, record: &SceneRecord) -> Result<WriteOutcome> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (scene_id, document) VALUES ($1, $2)
             ON CONFLICT (scene_id) DO NOTHING",
            self.table
        ))
        .bind(record.scene_id())
        .bind(Json(record.document()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(WriteOutcome::Duplicate)
        } else {
            Ok(WriteOutcome::Created)
        }
    }

    async fn write_bulk(&self, records: &[SceneRecord]) -> Result<BulkReport> {
        let ids: Vec<String> = records.iter().map(|r| r.scene_id().to_string()).collect();
        let documents: Vec<serde_json::Value> = records
            .iter()
            .map(|r| serde_json::Value::Object(r.document().clone()))
            .collect();

        let result = sqlx::query(&format!(
            "INSERT INTO {} (scene_id, document)
             SELECT * FROM UNNEST($1::text[], $2::jsonb[])
             ON CONFLICT (scene_id) DO NOTHING",
            self.table
        ))
        .bind(&ids)
        .bind(&documents)
        .execute(&self.pool)
        .await?;

        let attempted = records.len();
        Ok(BulkReport {
            attempted,
            conflicts: attempted - result.rows_affected() as usize,
            rejected: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("scenes").is_ok());
        assert!(validate_table_name("landsat_8").is_ok());
        assert!(validate_table_name("_staging").is_ok());

        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("8scenes").is_err());
        assert!(validate_table_name("scenes; drop table x").is_err());
        assert!(validate_table_name("scenes\"").is_err());
    }
}
