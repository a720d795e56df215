//! Stage Bot: command dispatcher plus a per-user conversational stage machine.

pub mod channels;
pub mod commands;
pub mod config;
pub mod error;
pub mod message;
pub mod router;
pub mod stages;
pub mod store;
