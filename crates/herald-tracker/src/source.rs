//! Invite sources: where snapshots come from.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use herald_invites::{GuildId, InviteUsageSnapshot};
use tokio::sync::RwLock;

use crate::error::RetrievalError;

/// Lists the current invites of a guild with their use counts.
///
/// Implementations return the *complete* invite set. Transport, permission and
/// not-found failures are reported as [`RetrievalError`]. Timeouts are applied
/// by the tracker, so an implementation may simply await its client.
#[async_trait]
pub trait InviteSource: Send + Sync {
    async fn list_invite_usage(&self, guild: GuildId) -> Result<InviteUsageSnapshot, RetrievalError>;
}

#[derive(Debug, Default)]
struct GuildInvites {
    snapshot: InviteUsageSnapshot,
    pending_failures: Vec<RetrievalError>,
}

/// In-memory invite source.
///
/// Holds one invite table per guild. Tables are replaced wholesale with
/// [`set_invites`](Self::set_invites); failures can be queued per guild and are
/// returned by the next listings, oldest first. Unknown guilds fail with
/// [`RetrievalError::NotFound`].
#[derive(Debug, Default)]
pub struct MemoryInviteSource {
    guilds: RwLock<HashMap<GuildId, GuildInvites>>,
    latency: Option<Duration>,
    fetches: AtomicU64,
}

impl MemoryInviteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every listing, as a network client would.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replace the invite table of a guild, registering the guild if needed.
    pub async fn set_invites(&self, guild: GuildId, snapshot: InviteUsageSnapshot) {
        let mut guilds = self.guilds.write().await;
        guilds.entry(guild).or_default().snapshot = snapshot;
    }

    /// Forget a guild. Later listings fail with `NotFound`.
    pub async fn remove_guild(&self, guild: GuildId) -> bool {
        self.guilds.write().await.remove(&guild).is_some()
    }

    /// Make the next listing of `guild` fail with `error`.
    pub async fn fail_next(&self, guild: GuildId, error: RetrievalError) {
        let mut guilds = self.guilds.write().await;
        guilds.entry(guild).or_default().pending_failures.push(error);
    }

    /// Total listings attempted, failed ones included.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InviteSource for MemoryInviteSource {
    async fn list_invite_usage(&self, guild: GuildId) -> Result<InviteUsageSnapshot, RetrievalError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut guilds = self.guilds.write().await;
        let invites = guilds.get_mut(&guild).ok_or(RetrievalError::NotFound(guild))?;

        if !invites.pending_failures.is_empty() {
            return Err(invites.pending_failures.remove(0));
        }

        Ok(invites.snapshot.clone())
    }
}
