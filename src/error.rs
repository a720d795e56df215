//! Error types for the stage bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to update env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

/// Stage engine and user-stage store errors.
///
/// Every variant is handled at the boundary of a single message's dispatch
/// and converted into a user-facing reply.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("stage '{0}' não encontrado")]
    NotFound(String),

    #[error("você não tem permissão para acessar o stage '{0}'")]
    PermissionDenied(String),

    #[error("navegação de '{from}' para '{to}' não permitida")]
    NavigationDenied { from: String, to: String },

    #[error("default stage '{0}' is not registered")]
    Misconfiguration(String),

    #[error("transition chain exceeded {max} hops")]
    ChainTooDeep { max: usize },

    #[error("{0}")]
    Persistence(#[from] DatabaseError),
}

/// Command registration errors.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid pattern for command {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
