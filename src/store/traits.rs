//! Backend-agnostic `Database` trait for user-stage persistence.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// A persisted `user_stages` row.
///
/// `data` is the serialized stage payload; decoding is the stage layer's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStageRow {
    pub user_id: String,
    pub current_stage: String,
    pub data: String,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

#[async_trait]
pub trait Database: Send + Sync {
    /// Create or migrate the schema.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Fetch a user's row, if one was ever saved.
    async fn get_user_stage(&self, user_id: &str) -> Result<Option<UserStageRow>, DatabaseError>;

    /// Insert or update a row in one statement.
    ///
    /// An existing row keeps its original `created_at`.
    async fn upsert_user_stage(&self, row: &UserStageRow) -> Result<(), DatabaseError>;

    /// Most recently updated rows first.
    async fn list_user_stages(&self, limit: usize) -> Result<Vec<UserStageRow>, DatabaseError>;

    /// Remove a user's row. Returns whether a row existed.
    async fn delete_user_stage(&self, user_id: &str) -> Result<bool, DatabaseError>;
}
