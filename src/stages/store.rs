//! Persistence of per-user stage state over the `Database` trait.

use std::sync::Arc;

use crate::config::AllowList;
use crate::error::{DatabaseError, StageError};
use crate::stages::registry::{DEFAULT_STAGE, StageRegistry};
use crate::stages::state::UserStageState;
use crate::store::Database;

/// Reads and writes `UserStageState`, enforcing stage existence and owner
/// restrictions on stage changes.
pub struct UserStageStore {
    db: Arc<dyn Database>,
    registry: Arc<StageRegistry>,
    owners: AllowList,
}

impl UserStageStore {
    pub fn new(db: Arc<dyn Database>, registry: Arc<StageRegistry>, owners: AllowList) -> Self {
        Self {
            db,
            registry,
            owners,
        }
    }

    /// Load a user's state. Unknown users get a `"default"` state that is
    /// not persisted until first saved.
    pub async fn get(&self, user_id: &str) -> Result<UserStageState, DatabaseError> {
        match self.db.get_user_stage(user_id).await? {
            Some(row) => Ok(UserStageState::from_row(row)),
            None => Ok(UserStageState::new(user_id, DEFAULT_STAGE)),
        }
    }

    /// Upsert, refreshing `updated_at`. `created_at` of an existing row is kept.
    pub async fn save(&self, state: &mut UserStageState) -> Result<(), DatabaseError> {
        state.touch();
        let row = state.to_row()?;
        self.db.upsert_user_stage(&row).await
    }

    /// Move a user to `new_stage`, clearing stage data.
    ///
    /// Does not check adjacency; callers that care use `StageRegistry::can_navigate`.
    pub async fn change_stage(
        &self,
        user_id: &str,
        new_stage: &str,
    ) -> Result<UserStageState, StageError> {
        let mut state = self.get(user_id).await?;

        let stage = self
            .registry
            .get(new_stage)
            .ok_or_else(|| StageError::NotFound(new_stage.to_string()))?;

        if stage.requires_owner && !self.owners.contains(user_id) {
            return Err(StageError::PermissionDenied(new_stage.to_string()));
        }

        let from = std::mem::take(&mut state.current_stage);
        state.enter(new_stage);
        self.save(&mut state).await?;

        tracing::info!(user = %user_id, from = %from, to = %new_stage, "Stage changed");
        Ok(state)
    }

    /// Most recently active users first.
    pub async fn list(&self, limit: usize) -> Result<Vec<UserStageState>, DatabaseError> {
        let rows = self.db.list_user_stages(limit).await?;
        Ok(rows.into_iter().map(UserStageState::from_row).collect())
    }

    /// Forget a user; their next message starts at `"default"`.
    pub async fn delete(&self, user_id: &str) -> Result<bool, DatabaseError> {
        self.db.delete_user_stage(user_id).await
    }

    pub fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }
}
