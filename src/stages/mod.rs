//! Conversation stages: a per-user finite-state machine over menu handlers.

pub mod builtin;
pub mod engine;
pub mod registry;
pub mod state;
pub mod store;

pub use engine::{EngineReplies, StageEngine};
pub use registry::{
    DEFAULT_STAGE, StageContext, StageDefinition, StageHandler, StageOutcome, StageRegistry,
};
pub use state::{StageData, UserStageState};
pub use store::UserStageStore;
