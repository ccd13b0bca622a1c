//! Guild Registry - one tracker per active guild.
//!
//! The registry owns the trackers outright. Guilds become active through
//! [`GuildRegistry::activate`] and inactive through
//! [`GuildRegistry::deactivate`]; trackers never see the registry.
//!
//! Confident attributions are forwarded to the [`RoleGranter`] on a spawned
//! task, so a slow grant never holds a tracker lock. Ambiguous attributions
//! are only logged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use herald_invites::{Attribution, GuildId, InviteCode, MemberJoin};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::RetrievalError;
use crate::grant::RoleGranter;
use crate::source::InviteSource;
use crate::tracker::{AttributionCallbacks, GuildInviteTracker};

type PendingGrants = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Owns the trackers of every active guild.
pub struct GuildRegistry {
    source: Arc<dyn InviteSource>,
    granter: Arc<dyn RoleGranter>,
    config: TrackerConfig,
    trackers: RwLock<HashMap<GuildId, Arc<GuildInviteTracker>>>,
    pending_grants: PendingGrants,
}

impl GuildRegistry {
    pub fn new(source: Arc<dyn InviteSource>, granter: Arc<dyn RoleGranter>, config: TrackerConfig) -> Self {
        Self {
            source,
            granter,
            config,
            trackers: RwLock::new(HashMap::new()),
            pending_grants: Arc::default(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Start tracking `guild`.
    ///
    /// Fetches the guild's initial snapshot. An already active guild gets a
    /// fresh tracker. On failure the guild's previous state, if any, is kept.
    pub async fn activate(&self, guild: GuildId) -> Result<Arc<GuildInviteTracker>, RetrievalError> {
        let callbacks = self.callbacks_for(guild);
        let tracker = GuildInviteTracker::new(guild, Arc::clone(&self.source), callbacks, self.config.clone())
            .await
            .inspect_err(|e| warn!("Cannot track guild {}: {}", guild, e))?;
        let tracker = Arc::new(tracker);

        let previous = self
            .trackers
            .write()
            .await
            .insert(guild, Arc::clone(&tracker));
        if previous.is_some() {
            info!("Guild {} re-activated with a fresh snapshot", guild);
        }

        Ok(tracker)
    }

    /// Stop tracking `guild`. Returns whether it was active.
    pub async fn deactivate(&self, guild: GuildId) -> bool {
        let removed = self.trackers.write().await.remove(&guild).is_some();
        if removed {
            info!("Stopped tracking guild {}", guild);
        }
        removed
    }

    /// Route a join to its guild's tracker.
    ///
    /// Joins of inactive guilds are ignored and yield `Ok(None)`.
    pub async fn dispatch(&self, event: &MemberJoin) -> Result<Option<Attribution>, RetrievalError> {
        let Some(tracker) = self.tracker(event.guild).await else {
            debug!("Join of {} in untracked guild {}", event.member, event.guild);
            return Ok(None);
        };
        tracker.handle_join(event).await
    }

    pub async fn tracker(&self, guild: GuildId) -> Option<Arc<GuildInviteTracker>> {
        self.trackers.read().await.get(&guild).cloned()
    }

    pub async fn is_active(&self, guild: GuildId) -> bool {
        self.trackers.read().await.contains_key(&guild)
    }

    /// Active guilds in ascending order.
    pub async fn active_guilds(&self) -> Vec<GuildId> {
        let mut guilds: Vec<_> = self.trackers.read().await.keys().copied().collect();
        guilds.sort();
        guilds
    }

    pub async fn len(&self) -> usize {
        self.trackers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.trackers.read().await.is_empty()
    }

    /// Wait for every role grant started so far.
    pub async fn flush_grants(&self) {
        let pending: Vec<_> = {
            let mut pending = self.pending_grants.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        for handle in pending {
            if let Err(e) = handle.await {
                warn!("Role grant task failed: {}", e);
            }
        }
    }

    fn callbacks_for(&self, guild: GuildId) -> AttributionCallbacks {
        let granter = Arc::clone(&self.granter);
        let pending = Arc::clone(&self.pending_grants);

        AttributionCallbacks::new(
            move |member, code| {
                let granter = Arc::clone(&granter);
                let member = member.clone();
                let code = code.clone();
                let handle = tokio::spawn(async move {
                    if let Err(e) = granter.grant(guild, &member, &code).await {
                        warn!("No role for {} in guild {}: {}", member, guild, e);
                    }
                });

                let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
                pending.retain(|h| !h.is_finished());
                pending.push(handle);
            },
            move |member, codes| {
                let codes: Vec<&str> = codes.iter().map(InviteCode::as_str).collect();
                warn!(
                    "Not granting a role to {} in guild {}: ambiguous invites {:?}",
                    member, guild, codes
                );
            },
        )
    }
}

impl std::fmt::Debug for GuildRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
