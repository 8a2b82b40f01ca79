//! SQLite engineer registry.
//!
//! Implements `EngineerRegistry` from `proposer-core`. The `name` field gets
//! its own UNIQUE column; every other collected field lives in `fields_json`.

use std::collections::BTreeMap;

use chrono::Utc;
use proposer_core::repository::engineer::EngineerRegistry;
use proposer_types::engineer::{Engineer, EngineerId, NAME_FIELD};
use proposer_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `EngineerRegistry`.
pub struct SqliteEngineerRegistry {
    pool: DatabasePool,
}

impl SqliteEngineerRegistry {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct EngineerRow {
    id: String,
    name: String,
    fields_json: String,
    created_at: String,
}

impl EngineerRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            fields_json: row.try_get("fields_json")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_engineer(self) -> Result<Engineer, RepositoryError> {
        let id = self
            .id
            .parse::<EngineerId>()
            .map_err(|e| RepositoryError::Query(format!("invalid engineer id: {e}")))?;
        let fields: BTreeMap<String, String> = serde_json::from_str(&self.fields_json)
            .map_err(|e| RepositoryError::Query(format!("invalid fields json: {e}")))?;

        Ok(Engineer {
            id,
            name: self.name,
            fields,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

impl EngineerRegistry for SqliteEngineerRegistry {
    async fn list(&self) -> Result<Vec<Engineer>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM engineers ORDER BY name ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                EngineerRow::from_row(row)
                    .map_err(query_error)?
                    .into_engineer()
            })
            .collect()
    }

    async fn get(&self, id: &EngineerId) -> Result<Option<Engineer>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM engineers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(
                EngineerRow::from_row(&row)
                    .map_err(query_error)?
                    .into_engineer()?,
            )),
            None => Ok(None),
        }
    }

    async fn get_field(
        &self,
        id: &EngineerId,
        field: &str,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .get(id)
            .await?
            .and_then(|engineer| engineer.field(field).map(str::to_string)))
    }

    async fn store_new(
        &self,
        mut fields: BTreeMap<String, String>,
    ) -> Result<Engineer, RepositoryError> {
        let name = fields
            .remove(NAME_FIELD)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| RepositoryError::Query("engineer name is required".to_string()))?;

        let engineer = Engineer {
            id: EngineerId::new(),
            name,
            fields,
            created_at: Utc::now(),
        };
        let fields_json = serde_json::to_string(&engineer.fields)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO engineers (id, name, fields_json, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(engineer.id.to_string())
        .bind(&engineer.name)
        .bind(&fields_json)
        .bind(format_datetime(&engineer.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(engineer_id = %engineer.id, "inserted engineer");
                Ok(engineer)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("engineer '{}' already exists", engineer.name)),
            ),
            Err(e) => Err(query_error(e)),
        }
    }
}
