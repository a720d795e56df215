//! Command definitions and the ordered registry that matches them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::error::CommandError;
use crate::message::InboundMessage;

/// Behavior of one command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs on every dispatch pass, before name matching.
    async fn before(&self, _msg: &InboundMessage) {}

    /// Returns whether the command succeeded.
    async fn execute(&self, msg: &InboundMessage) -> bool;
}

/// A command and its access policy.
#[derive(Clone)]
pub struct CommandDefinition {
    /// Regex fragment matched against the whole command token.
    pub name: String,
    /// Literal alternatives to `name`.
    pub aliases: Vec<String>,
    /// Categorization only.
    pub tags: Vec<String>,
    pub requires_prefix: bool,
    pub requires_owner: bool,
    pub requires_query: bool,
    pub requires_group: bool,
    pub requires_private: bool,
    pub requires_media: bool,
    /// React ⏳ while running, then ❌ on failure or clear on success.
    pub awaits_ack: bool,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            tags: Vec::new(),
            requires_prefix: false,
            requires_owner: false,
            requires_query: false,
            requires_group: false,
            requires_private: false,
            requires_media: false,
            awaits_ack: false,
            handler: Arc::new(handler),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn with_prefix(mut self) -> Self {
        self.requires_prefix = true;
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.requires_owner = true;
        self
    }

    pub fn query_required(mut self) -> Self {
        self.requires_query = true;
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

    pub fn media_required(mut self) -> Self {
        self.requires_media = true;
        self
    }

    pub fn awaits_ack(mut self) -> Self {
        self.awaits_ack = true;
        self
    }

    /// `^(?:name|alias...)$`, aliases escaped.
    fn pattern(&self) -> String {
        let mut alternatives = vec![self.name.clone()];
        alternatives.extend(self.aliases.iter().map(|a| regex::escape(a)));
        format!("^(?:{})$", alternatives.join("|"))
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("tags", &self.tags)
            .field("requires_prefix", &self.requires_prefix)
            .field("requires_owner", &self.requires_owner)
            .field("awaits_ack", &self.awaits_ack)
            .finish_non_exhaustive()
    }
}

/// A definition with its compiled name pattern.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    pub definition: CommandDefinition,
    pattern: Regex,
}

impl RegisteredCommand {
    /// Whether `token` (prefix already stripped) names this command.
    pub fn matches(&self, token: &str) -> bool {
        self.pattern.is_match(token)
    }
}

/// Ordered command list. Duplicate names are kept; both fire.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<RegisteredCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(
        defs: impl IntoIterator<Item = CommandDefinition>,
    ) -> Result<Self, CommandError> {
        let mut registry = Self::new();
        for def in defs {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Append a command, compiling its name pattern.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), CommandError> {
        let pattern =
            Regex::new(&definition.pattern()).map_err(|source| CommandError::InvalidPattern {
                name: definition.name.clone(),
                source,
            })?;
        tracing::debug!(command = %definition.name, "Registered command");
        self.commands.push(RegisteredCommand {
            definition,
            pattern,
        });
        Ok(())
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    fn has_command(registry: &CommandRegistry, token: &str) -> bool {
        registry.iter().any(|c| c.matches(token))
    }

    #[async_trait]
    impl CommandHandler for Noop {
        async fn execute(&self, _msg: &InboundMessage) -> bool {
            true
        }
    }

    #[test]
    fn name_is_an_anchored_pattern() {
        let registry =
            CommandRegistry::from_definitions([CommandDefinition::new("menu|help", Noop)]).unwrap();
        assert!(has_command(&registry, "menu"));
        assert!(has_command(&registry, "help"));
        assert!(!has_command(&registry, "menus"));
        assert!(!has_command(&registry, "xmenu"));
    }

    #[test]
    fn aliases_match_literally() {
        let registry = CommandRegistry::from_definitions([
            CommandDefinition::new("mode", Noop).alias("modo").alias("m.d"),
        ])
        .unwrap();
        assert!(has_command(&registry, "mode"));
        assert!(has_command(&registry, "modo"));
        assert!(has_command(&registry, "m.d"));
        assert!(!has_command(&registry, "mxd"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = CommandRegistry::from_definitions([CommandDefinition::new("(", Noop)])
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidPattern { ref name, .. } if name == "("));
    }

    #[test]
    fn duplicates_keep_registration_order() {
        let registry = CommandRegistry::from_definitions([
            CommandDefinition::new("ping", Noop).tag("first"),
            CommandDefinition::new("ping", Noop).tag("second"),
        ])
        .unwrap();
        let tags: Vec<&str> = registry
            .iter()
            .map(|c| c.definition.tags[0].as_str())
            .collect();
        assert_eq!(tags, vec!["first", "second"]);
    }
}
