//! Stage engine: routes a message to the handler of the sender's current stage.
//!
//! One turn runs under a per-user lock:
//! authorize → load state → resolve stage → access checks → handler,
//! following handler-requested transitions up to a bounded depth.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{AllowList, DEFAULT_MAX_CHAIN_DEPTH};
use crate::error::StageError;
use crate::message::InboundMessage;
use crate::stages::registry::{
    DEFAULT_STAGE, StageContext, StageDefinition, StageOutcome, StageRegistry,
};
use crate::stages::state::UserStageState;
use crate::stages::store::UserStageStore;

/// User-facing texts the engine sends on its own behalf.
#[derive(Debug, Clone)]
pub struct EngineReplies {
    pub unauthorized: String,
    pub owner_only: String,
    pub group_only: String,
    pub private_only: String,
    /// Sent when the stage set is unusable (no default stage, runaway chain).
    pub misconfigured: String,
    /// Prefix for state-load failures; the error text follows.
    pub load_failed: String,
    /// Prefix for failed transitions; the error text follows.
    pub transition_failed: String,
}

impl Default for EngineReplies {
    fn default() -> Self {
        Self {
            unauthorized: "❌ *Acesso não autorizado*\n\n\
                Este atendimento é restrito a usuários específicos.\n\n\
                Se você acredita que deveria ter acesso, entre em contato com a administração."
                .into(),
            owner_only: "Você não tem permissão para acessar este stage.".into(),
            group_only: "Este stage só funciona em grupos.".into(),
            private_only: "Este stage só funciona em conversas privadas.".into(),
            misconfigured: "Sistema de stages não inicializado corretamente.".into(),
            load_failed: "Erro ao obter informações do usuário: ".into(),
            transition_failed: "❌ Erro ao acessar: ".into(),
        }
    }
}

/// Per-user conversation FSM driver.
pub struct StageEngine {
    store: Arc<UserStageStore>,
    registry: Arc<StageRegistry>,
    authorized: AllowList,
    replies: EngineReplies,
    max_chain_depth: usize,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl StageEngine {
    pub fn new(store: Arc<UserStageStore>, authorized: AllowList) -> Self {
        let registry = Arc::clone(store.registry());
        Self {
            store,
            registry,
            authorized,
            replies: EngineReplies::default(),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_replies(mut self, replies: EngineReplies) -> Self {
        self.replies = replies;
        self
    }

    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth.max(1);
        self
    }

    pub fn store(&self) -> &Arc<UserStageStore> {
        &self.store
    }

    /// Handle one message. Returns the turn outcome; all failures are
    /// answered to the user and logged here.
    pub async fn process(&self, msg: &InboundMessage) -> bool {
        let user_id = msg.user_id.as_str();

        if !self.authorized.contains(user_id) {
            warn!(user = %user_id, "Unauthorized user");
            msg.reply(&self.replies.unauthorized).await;
            return false;
        }

        let lock = self.user_lock(user_id).await;
        let outcome = {
            let _turn = lock.lock().await;
            self.turn(msg).await
        };
        self.release_lock(user_id, lock).await;
        outcome
    }

    /// One locked turn: load, resolve, check access, run.
    async fn turn(&self, msg: &InboundMessage) -> bool {
        let user_id = msg.user_id.as_str();

        let mut state = match self.store.get(user_id).await {
            Ok(state) => state,
            Err(e) => {
                error!(user = %user_id, "Failed to load user stage: {e}");
                msg.reply(&format!("{}{e}", self.replies.load_failed)).await;
                return false;
            }
        };

        let stage = match self.resolve_stage(&mut state).await {
            Ok(stage) => stage,
            Err(e) => {
                self.report(msg, &e).await;
                return false;
            }
        };

        if let Some(denial) = self.access_denial(stage, msg) {
            info!(user = %user_id, stage = %stage.id, "Stage access denied");
            msg.reply(denial).await;
            return false;
        }

        debug!(user = %user_id, stage = %stage.id, "Dispatching to stage");
        match self.run(stage, state, msg).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report(msg, &e).await;
                false
            }
        }
    }

    /// Move `msg`'s sender to `target` and let the target stage handle `msg`.
    ///
    /// Does not check adjacency.
    pub async fn change_stage_and_dispatch(
        &self,
        msg: &InboundMessage,
        target: &str,
    ) -> Result<bool, StageError> {
        let lock = self.user_lock(&msg.user_id).await;
        let outcome = {
            let _turn = lock.lock().await;
            self.switch_and_run(msg, target).await
        };
        self.release_lock(&msg.user_id, lock).await;
        outcome
    }

    async fn switch_and_run(&self, msg: &InboundMessage, target: &str) -> Result<bool, StageError> {
        let state = self.store.change_stage(&msg.user_id, target).await?;
        let stage = self
            .registry
            .get(target)
            .ok_or_else(|| StageError::NotFound(target.to_string()))?;
        self.run(stage, state, msg).await
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the user's lock entry when no other turn holds or awaits it.
    async fn release_lock(&self, user_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.user_locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
    }

    /// Current stage, falling back to (and persisting) the default stage
    /// when the stored id is no longer registered.
    async fn resolve_stage(
        &self,
        state: &mut UserStageState,
    ) -> Result<&StageDefinition, StageError> {
        if let Some(stage) = self.registry.get(&state.current_stage) {
            return Ok(stage);
        }

        warn!(
            user = %state.user_id,
            stage = %state.current_stage,
            "Unknown stage, resetting to default"
        );
        state.enter(DEFAULT_STAGE);
        self.store.save(state).await?;

        self.registry
            .get(DEFAULT_STAGE)
            .ok_or_else(|| StageError::Misconfiguration(DEFAULT_STAGE.to_string()))
    }

    fn access_denial(&self, stage: &StageDefinition, msg: &InboundMessage) -> Option<&str> {
        if stage.requires_owner && !msg.is_owner {
            Some(self.replies.owner_only.as_str())
        } else if stage.requires_group && !msg.is_group {
            Some(self.replies.group_only.as_str())
        } else if stage.requires_private && msg.is_group {
            Some(self.replies.private_only.as_str())
        } else {
            None
        }
    }

    /// Run `stage`'s handler, applying transitions until one finishes.
    async fn run<'a>(
        &'a self,
        mut stage: &'a StageDefinition,
        mut state: UserStageState,
        msg: &InboundMessage,
    ) -> Result<bool, StageError> {
        let mut entered_from: Option<String> = None;
        let mut hops = 0usize;

        loop {
            let Some(handler) = stage.handler.as_ref() else {
                debug!(stage = %stage.id, "Stage has no handler");
                return Ok(false);
            };

            let before = state.data.clone();
            let outcome = handler
                .handle(StageContext {
                    message: msg,
                    state: &mut state,
                    entered_from: entered_from.as_deref(),
                })
                .await;

            let target = match outcome {
                StageOutcome::Done(ok) => {
                    if state.data != before {
                        self.store.save(&mut state).await?;
                    }
                    return Ok(ok);
                }
                StageOutcome::Transition(target) => target,
            };

            hops += 1;
            if hops > self.max_chain_depth {
                warn!(
                    user = %msg.user_id,
                    stage = %stage.id,
                    max = self.max_chain_depth,
                    "Transition chain too deep"
                );
                return Err(StageError::ChainTooDeep {
                    max: self.max_chain_depth,
                });
            }

            if !self.registry.can_navigate(&stage.id, &target) {
                return Err(StageError::NavigationDenied {
                    from: stage.id.clone(),
                    to: target,
                });
            }

            state = self.store.change_stage(&msg.user_id, &target).await?;
            entered_from = Some(stage.id.clone());
            stage = self
                .registry
                .get(&target)
                .ok_or_else(|| StageError::NotFound(target.clone()))?;
        }
    }

    async fn report(&self, msg: &InboundMessage, err: &StageError) {
        match err {
            StageError::Misconfiguration(_) | StageError::ChainTooDeep { .. } => {
                error!(user = %msg.user_id, "Stage engine misconfigured: {err}");
                msg.reply(&self.replies.misconfigured).await;
            }
            StageError::Persistence(_) => {
                error!(user = %msg.user_id, "Stage persistence failed: {err}");
                msg.reply(&err.to_string()).await;
            }
            StageError::NotFound(_)
            | StageError::PermissionDenied(_)
            | StageError::NavigationDenied { .. } => {
                warn!(user = %msg.user_id, "Stage transition failed: {err}");
                msg.reply(&format!("{}{err}", self.replies.transition_failed))
                    .await;
            }
        }
    }
}
