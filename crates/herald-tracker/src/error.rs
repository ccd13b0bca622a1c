//! Error types for herald-tracker.

use herald_invites::GuildId;
use std::time::Duration;
use thiserror::Error;

/// Result type for herald-tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The invite source could not be queried.
///
/// This is the only failure of the tracker itself. Classification never fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// Transport-level failure talking to the invite source.
    #[error("transport error: {0}")]
    Transport(String),

    /// Missing permission to list invites of the guild.
    #[error("not allowed to list invites of guild {0}")]
    Forbidden(GuildId),

    /// The guild is unknown to the invite source.
    #[error("guild {0} not found")]
    NotFound(GuildId),

    /// The listing did not complete in time.
    #[error("invite listing timed out after {0:?}")]
    Timeout(Duration),
}

/// A role grant was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    /// No role is configured for the attributed invite.
    #[error("no role configured for invite {0}")]
    UnknownInvite(String),

    /// The grant was rejected by the platform.
    #[error("role grant rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by the registry tooling and the replay binary.
#[derive(Debug, Error)]
pub enum Error {
    /// Invite retrieval failed
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid scenario contents
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
