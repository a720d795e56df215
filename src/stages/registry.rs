//! Stage registry: stage definitions keyed by id, built once at startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::message::InboundMessage;
use crate::stages::state::UserStageState;

/// Stage every user starts in, and the fallback for unknown stage ids.
pub const DEFAULT_STAGE: &str = "default";

/// What a handler decided for the current message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Handling finished with the given success flag.
    Done(bool),
    /// Move the user to another stage and let it handle the same message.
    Transition(String),
}

impl StageOutcome {
    pub fn handled() -> Self {
        Self::Done(true)
    }

    pub fn goto(stage: &str) -> Self {
        Self::Transition(stage.to_string())
    }
}

/// Everything a handler sees for one invocation.
pub struct StageContext<'a> {
    pub message: &'a InboundMessage,
    /// Mutations to `state.data` are persisted after a `Done` outcome.
    pub state: &'a mut UserStageState,
    /// Stage that transitioned into this one earlier in the same turn.
    pub entered_from: Option<&'a str>,
}

impl StageContext<'_> {
    /// True when the handler runs because of a transition, not fresh input.
    pub fn is_entry(&self) -> bool {
        self.entered_from.is_some()
    }
}

/// Menu logic for one stage.
#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn handle(&self, ctx: StageContext<'_>) -> StageOutcome;
}

/// A node in the conversation FSM.
#[derive(Clone)]
pub struct StageDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// A stage without a handler is inert.
    pub handler: Option<Arc<dyn StageHandler>>,
    /// Stages reachable from this one.
    pub next_stages: Vec<String>,
    pub requires_owner: bool,
    pub requires_group: bool,
    pub requires_private: bool,
}

impl StageDefinition {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            handler: None,
            next_stages: Vec::new(),
            requires_owner: false,
            requires_group: false,
            requires_private: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_handler(mut self, handler: impl StageHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn with_next_stages(mut self, ids: &[&str]) -> Self {
        self.next_stages = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.requires_owner = true;
        self
    }

    pub fn group_only(mut self) -> Self {
        self.requires_group = true;
        self
    }

    pub fn private_only(mut self) -> Self {
        self.requires_private = true;
        self
    }
}

impl fmt::Debug for StageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_handler", &self.handler.is_some())
            .field("next_stages", &self.next_stages)
            .field("requires_owner", &self.requires_owner)
            .field("requires_group", &self.requires_group)
            .field("requires_private", &self.requires_private)
            .finish()
    }
}

/// Registry of stage definitions.
#[derive(Debug, Default)]
pub struct StageRegistry {
    stages: HashMap<String, StageDefinition>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a declarative list. Later ids overwrite earlier ones.
    pub fn from_definitions(defs: impl IntoIterator<Item = StageDefinition>) -> Self {
        let mut registry = Self::new();
        for def in defs {
            registry.register(def);
        }
        registry
    }

    /// Insert or overwrite by id.
    pub fn register(&mut self, def: StageDefinition) {
        if self.stages.contains_key(&def.id) {
            tracing::warn!(stage = %def.id, "Stage registered twice, replacing previous definition");
        }
        tracing::debug!(stage = %def.id, "Registered stage");
        self.stages.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Option<&StageDefinition> {
        self.stages.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.stages.contains_key(id)
    }

    /// All definitions, in no particular order.
    pub fn list(&self) -> Vec<&StageDefinition> {
        self.stages.values().collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether `to` is reachable from `from` in one step.
    ///
    /// Staying in the same stage is always allowed; an unknown `from` allows nothing.
    pub fn can_navigate(&self, from: &str, to: &str) -> bool {
        let Some(stage) = self.get(from) else {
            return false;
        };
        from == to || stage.next_stages.iter().any(|s| s == to)
    }

    /// `(from, to)` pairs whose target is not registered, sorted.
    pub fn dangling_targets(&self) -> Vec<(String, String)> {
        let mut dangling: Vec<(String, String)> = self
            .stages
            .values()
            .flat_map(|s| {
                s.next_stages
                    .iter()
                    .filter(|to| !self.contains(to))
                    .map(|to| (s.id.clone(), to.clone()))
            })
            .collect();
        dangling.sort();
        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl StageHandler for Echo {
        async fn handle(&self, ctx: StageContext<'_>) -> StageOutcome {
            ctx.message.reply(&ctx.message.body).await;
            StageOutcome::handled()
        }
    }

    fn sample() -> StageRegistry {
        StageRegistry::from_definitions([
            StageDefinition::new(DEFAULT_STAGE, "Menu")
                .with_handler(Echo)
                .with_next_stages(&["a", "ghost"]),
            StageDefinition::new("a", "A").with_next_stages(&[DEFAULT_STAGE]),
        ])
    }

    #[test]
    fn get_and_list() {
        let registry = sample();
        assert_eq!(registry.len(), 2);
        assert!(registry.get(DEFAULT_STAGE).unwrap().handler.is_some());
        assert!(registry.get("a").unwrap().handler.is_none());
        assert!(registry.get("missing").is_none());

        let mut ids: Vec<&str> = registry.list().iter().map(|s| s.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", DEFAULT_STAGE]);
    }

    #[test]
    fn register_overwrites_by_id() {
        let mut registry = sample();
        registry.register(StageDefinition::new("a", "Replaced").owner_only());
        assert_eq!(registry.len(), 2);
        let a = registry.get("a").unwrap();
        assert_eq!(a.name, "Replaced");
        assert!(a.requires_owner);
    }

    #[test]
    fn navigation_follows_next_stages() {
        let registry = sample();
        assert!(registry.can_navigate(DEFAULT_STAGE, "a"));
        assert!(registry.can_navigate("a", DEFAULT_STAGE));
        assert!(registry.can_navigate("a", "a"));
        assert!(!registry.can_navigate("a", "ghost"));
        assert!(!registry.can_navigate("missing", DEFAULT_STAGE));
        // Dangling targets are navigable; resolution fails later.
        assert!(registry.can_navigate(DEFAULT_STAGE, "ghost"));
    }

    #[test]
    fn reports_dangling_targets() {
        let registry = sample();
        assert_eq!(
            registry.dangling_targets(),
            vec![(DEFAULT_STAGE.to_string(), "ghost".to_string())]
        );
    }
}
