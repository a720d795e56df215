//! Per-user stage state and its versioned, stage-scoped payload.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::store::UserStageRow;

/// Current `StageData` schema version.
pub const STAGE_DATA_VERSION: u32 = 1;

fn current_version() -> u32 {
    STAGE_DATA_VERSION
}

/// Working data owned by exactly one stage.
///
/// Serialized as `{"stage": .., "version": .., "fields": {..}}`. Data written
/// by another stage is never handed to a handler; it decodes as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageData {
    pub stage: String,
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StageData {
    pub fn for_stage(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            version: STAGE_DATA_VERSION,
            fields: serde_json::Map::new(),
        }
    }

    /// Typed read. Missing keys and type mismatches read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), serde_json::Error> {
        self.fields
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.fields.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode stored data for `stage`.
    ///
    /// - empty or unparseable → empty record
    /// - versioned record for another stage → empty record
    /// - bare JSON object (pre-versioning rows) → adopted as this stage's fields
    pub fn decode(raw: &str, stage: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::for_stage(stage);
        }

        if let Ok(data) = serde_json::from_str::<StageData>(raw) {
            if data.stage == stage {
                return data;
            }
            tracing::debug!(
                stored = %data.stage,
                current = %stage,
                "Discarding data owned by another stage"
            );
            return Self::for_stage(stage);
        }

        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw) {
            Ok(fields) => Self {
                stage: stage.to_string(),
                version: STAGE_DATA_VERSION,
                fields,
            },
            Err(e) => {
                tracing::warn!(stage, "Unreadable stage data, resetting: {e}");
                Self::for_stage(stage)
            }
        }
    }
}

/// Durable record of where a user is in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStageState {
    pub user_id: String,
    pub current_stage: String,
    pub data: StageData,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

impl UserStageState {
    /// Fresh state, timestamps set to now.
    pub fn new(user_id: &str, stage: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            user_id: user_id.to_string(),
            current_stage: stage.to_string(),
            data: StageData::for_stage(stage),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_row(row: UserStageRow) -> Self {
        let data = StageData::decode(&row.data, &row.current_stage);
        Self {
            user_id: row.user_id,
            current_stage: row.current_stage,
            data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// Data is always written as owned by `current_stage`, so a stage id
    /// set directly on the struct keeps its data across a reload.
    pub fn to_row(&self) -> Result<UserStageRow, DatabaseError> {
        let encoded = if self.data.stage == self.current_stage {
            self.data.encode()
        } else {
            StageData {
                stage: self.current_stage.clone(),
                ..self.data.clone()
            }
            .encode()
        };
        let data = encoded.map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        Ok(UserStageRow {
            user_id: self.user_id.clone(),
            current_stage: self.current_stage.clone(),
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    /// Move to `stage`, dropping the previous stage's data.
    pub fn enter(&mut self, stage: &str) {
        self.current_stage = stage.to_string();
        self.data = StageData::for_stage(stage);
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp();
        if self.data.stage != self.current_stage {
            self.data.stage = self.current_stage.clone();
        }
    }
}
