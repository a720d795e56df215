//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{Database, UserStageRow};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

const USER_STAGE_COLUMNS: &str = "user_id, current_stage, data, created_at, updated_at";

/// Map a libsql Row to a UserStageRow. Column order matches USER_STAGE_COLUMNS.
///
/// A NULL `data` column (rows written by older deployments) reads as empty.
fn row_to_user_stage(row: &libsql::Row) -> Result<UserStageRow, libsql::Error> {
    Ok(UserStageRow {
        user_id: row.get(0)?,
        current_stage: row.get(1)?,
        data: row.get::<String>(2).unwrap_or_default(),
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn get_user_stage(&self, user_id: &str) -> Result<Option<UserStageRow>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_STAGE_COLUMNS} FROM user_stages WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user_stage: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_user_stage(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_user_stage row: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user_stage: {e}"))),
        }
    }

    async fn upsert_user_stage(&self, row: &UserStageRow) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO user_stages (user_id, current_stage, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (user_id) DO UPDATE SET
                    current_stage = excluded.current_stage,
                    data = excluded.data,
                    updated_at = excluded.updated_at",
                params![
                    row.user_id.as_str(),
                    row.current_stage.as_str(),
                    row.data.as_str(),
                    row.created_at,
                    row.updated_at,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_user_stage: {e}")))?;

        debug!(user = %row.user_id, stage = %row.current_stage, "User stage saved");
        Ok(())
    }

    async fn list_user_stages(&self, limit: usize) -> Result<Vec<UserStageRow>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {USER_STAGE_COLUMNS} FROM user_stages ORDER BY updated_at DESC, user_id LIMIT ?1"
                ),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_user_stages: {e}")))?;

        let mut result = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_user_stage(&row) {
                Ok(r) => result.push(r),
                Err(e) => tracing::warn!("Skipping user stage row: {e}"),
            }
        }
        Ok(result)
    }

    async fn delete_user_stage(&self, user_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM user_stages WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_user_stage: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn make_row(user_id: &str, stage: &str, updated_at: i64) -> UserStageRow {
        UserStageRow {
            user_id: user_id.to_string(),
            current_stage: stage.to_string(),
            data: r#"{"stage":"default","version":1,"fields":{}}"#.to_string(),
            created_at: 100,
            updated_at,
        }
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let db = test_db().await;
        let row = make_row("5511999", "adesao", 200);
        db.upsert_user_stage(&row).await.unwrap();

        let fetched = db.get_user_stage("5511999").await.unwrap().unwrap();
        assert_eq!(fetched, row);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let db = test_db().await;
        assert!(db.get_user_stage("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_keeps_created_at() {
        let db = test_db().await;
        db.upsert_user_stage(&make_row("u1", "default", 200))
            .await
            .unwrap();

        let mut update = make_row("u1", "aplicativo", 300);
        update.created_at = 999;
        update.data = "{}".to_string();
        db.upsert_user_stage(&update).await.unwrap();

        let fetched = db.get_user_stage("u1").await.unwrap().unwrap();
        assert_eq!(fetched.current_stage, "aplicativo");
        assert_eq!(fetched.data, "{}");
        assert_eq!(fetched.created_at, 100);
        assert_eq!(fetched.updated_at, 300);
    }

    #[tokio::test]
    async fn null_data_reads_as_empty() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO user_stages (user_id, current_stage, data, created_at, updated_at)
                 VALUES ('legacy', 'default', NULL, 1, 1)",
                (),
            )
            .await
            .unwrap();

        let fetched = db.get_user_stage("legacy").await.unwrap().unwrap();
        assert_eq!(fetched.data, "");
    }

    #[tokio::test]
    async fn list_orders_by_most_recent() {
        let db = test_db().await;
        db.upsert_user_stage(&make_row("old", "default", 10))
            .await
            .unwrap();
        db.upsert_user_stage(&make_row("new", "adesao", 30))
            .await
            .unwrap();
        db.upsert_user_stage(&make_row("mid", "default", 20))
            .await
            .unwrap();

        let all = db.list_user_stages(10).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let limited = db.list_user_stages(2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let db = test_db().await;
        db.upsert_user_stage(&make_row("u1", "default", 1))
            .await
            .unwrap();

        assert!(db.delete_user_stage("u1").await.unwrap());
        assert!(db.get_user_stage("u1").await.unwrap().is_none());
        assert!(!db.delete_user_stage("u1").await.unwrap());
    }

    #[tokio::test]
    async fn file_backed_db_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("stages.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.upsert_user_stage(&make_row("u1", "aplicativo", 5))
                .await
                .unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let fetched = db.get_user_stage("u1").await.unwrap().unwrap();
        assert_eq!(fetched.current_stage, "aplicativo");
    }
}
