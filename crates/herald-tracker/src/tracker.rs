//! Guild Invite Tracker - per-guild snapshot state and join attribution.
//!
//! One tracker is bound to one guild. It keeps the guild's current
//! [`InviteUsageSnapshot`] and, for every join of that guild:
//!
//! 1. fetches a fresh snapshot from the [`InviteSource`],
//! 2. diffs the stored snapshot against it,
//! 3. stores the fresh snapshot as the next "before",
//! 4. classifies the delta into an [`Attribution`],
//! 5. invokes at most one callback.
//!
//! # Serialization
//!
//! The stored snapshot sits behind one async mutex. In
//! [`RefreshMode::HoldLock`] the lock is held across the fetch, so joins of
//! the same guild are processed strictly one at a time and every successful
//! fetch becomes the "before" of the next join. A failed fetch leaves the
//! stored snapshot untouched.
//!
//! Trackers of different guilds share nothing and never contend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use herald_invites::{attribute, Attribution, GuildId, InviteCode, InviteUsageSnapshot, Member, MemberJoin};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{DispatchMode, RefreshMode, TrackerConfig};
use crate::error::RetrievalError;
use crate::source::InviteSource;

/// Called with the member and the single invite they most likely used.
pub type ConfidentHandler = Box<dyn Fn(&Member, &InviteCode) + Send + Sync>;

/// Called with the member and every candidate invite.
pub type AmbiguousHandler = Box<dyn Fn(&Member, &[InviteCode]) + Send + Sync>;

/// Outcome callbacks of a tracker.
pub struct AttributionCallbacks {
    on_confident: ConfidentHandler,
    on_ambiguous: AmbiguousHandler,
}

impl AttributionCallbacks {
    pub fn new<C, A>(on_confident: C, on_ambiguous: A) -> Self
    where
        C: Fn(&Member, &InviteCode) + Send + Sync + 'static,
        A: Fn(&Member, &[InviteCode]) + Send + Sync + 'static,
    {
        Self {
            on_confident: Box::new(on_confident),
            on_ambiguous: Box::new(on_ambiguous),
        }
    }

    /// Callbacks that ignore every outcome.
    pub fn noop() -> Self {
        Self::new(|_, _| {}, |_, _| {})
    }

    fn dispatch(&self, member: &Member, attribution: &Attribution) {
        match attribution {
            Attribution::Confident(code) => (self.on_confident)(member, code),
            Attribution::Ambiguous(codes) => (self.on_ambiguous)(member, codes),
            Attribution::Unattributed => {}
        }
    }
}

impl std::fmt::Debug for AttributionCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributionCallbacks").finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct StoredSnapshot {
    snapshot: InviteUsageSnapshot,
    /// Sequence number of the fetch that produced `snapshot`.
    fetch_seq: u64,
}

/// Attributes joins of one guild to invites.
pub struct GuildInviteTracker {
    guild: GuildId,
    source: Arc<dyn InviteSource>,
    callbacks: AttributionCallbacks,
    config: TrackerConfig,
    state: Mutex<StoredSnapshot>,
    /// Last fetch sequence number handed out. Only advanced under `state`'s lock.
    next_seq: AtomicU64,
}

impl std::fmt::Debug for GuildInviteTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildInviteTracker")
            .field("guild", &self.guild)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GuildInviteTracker {
    /// Create a tracker for `guild`, fetching its initial snapshot.
    ///
    /// Fails if the initial snapshot cannot be retrieved; no tracker exists then.
    pub async fn new(
        guild: GuildId,
        source: Arc<dyn InviteSource>,
        callbacks: AttributionCallbacks,
        config: TrackerConfig,
    ) -> Result<Self, RetrievalError> {
        let snapshot = fetch(source.as_ref(), guild, &config).await?;
        info!("Tracking guild {} with {} invites", guild, snapshot.len());

        Ok(Self {
            guild,
            source,
            callbacks,
            config,
            state: Mutex::new(StoredSnapshot { snapshot, fetch_seq: 0 }),
            next_seq: AtomicU64::new(0),
        })
    }

    /// The guild this tracker is bound to.
    pub fn guild(&self) -> GuildId {
        self.guild
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Copy of the stored snapshot. Waits for any in-flight join.
    pub async fn snapshot(&self) -> InviteUsageSnapshot {
        self.state.lock().await.snapshot.clone()
    }

    /// Attribute one join.
    ///
    /// Returns `Ok(None)` without touching any state if the event belongs to
    /// another guild. Otherwise returns the attribution after its callback (if
    /// any) was dispatched according to [`DispatchMode`].
    ///
    /// On [`RetrievalError`] the stored snapshot is unchanged and no callback
    /// runs; the tracker stays usable.
    pub async fn handle_join(&self, event: &MemberJoin) -> Result<Option<Attribution>, RetrievalError> {
        if event.guild != self.guild {
            debug!(
                "Ignoring join of {} for guild {} on tracker of guild {}",
                event.member, event.guild, self.guild
            );
            return Ok(None);
        }

        let attribution = match self.config.refresh_mode {
            RefreshMode::HoldLock => self.refresh_holding_lock(&event.member).await,
            RefreshMode::CopyThenRelease => self.refresh_after_copy(&event.member).await,
        }
        .inspect_err(|e| {
            warn!("Attribution of {} in guild {} failed: {}", event.member, self.guild, e);
        })?;

        if self.config.dispatch_mode == DispatchMode::AfterRelease {
            self.callbacks.dispatch(&event.member, &attribution);
        }

        Ok(Some(attribution))
    }

    async fn refresh_holding_lock(&self, member: &Member) -> Result<Attribution, RetrievalError> {
        let mut state = self.state.lock().await;
        let seq = self.claim_seq();
        let fresh = fetch(self.source.as_ref(), self.guild, &self.config).await?;

        let attribution = self.classify_and_log(member, &state.snapshot, &fresh);
        *state = StoredSnapshot { snapshot: fresh, fetch_seq: seq };

        if self.config.dispatch_mode == DispatchMode::InsideLock {
            self.callbacks.dispatch(member, &attribution);
        }
        Ok(attribution)
    }

    async fn refresh_after_copy(&self, member: &Member) -> Result<Attribution, RetrievalError> {
        let (before, seq) = {
            let state = self.state.lock().await;
            (state.snapshot.clone(), self.claim_seq())
        };

        let fresh = fetch(self.source.as_ref(), self.guild, &self.config).await?;

        let mut state = self.state.lock().await;
        let attribution = self.classify_and_log(member, &before, &fresh);

        // A join that started later may already have stored a newer snapshot.
        if seq > state.fetch_seq {
            *state = StoredSnapshot { snapshot: fresh, fetch_seq: seq };
        } else {
            debug!("Discarding stale snapshot #{} for guild {}", seq, self.guild);
        }

        if self.config.dispatch_mode == DispatchMode::InsideLock {
            self.callbacks.dispatch(member, &attribution);
        }
        Ok(attribution)
    }

    fn claim_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn classify_and_log(
        &self,
        member: &Member,
        before: &InviteUsageSnapshot,
        after: &InviteUsageSnapshot,
    ) -> Attribution {
        let attribution = attribute(before, after);

        match &attribution {
            Attribution::Confident(code) => {
                info!("{} joined guild {} via invite {}", member, self.guild, code);
            }
            Attribution::Ambiguous(codes) => {
                let codes: Vec<&str> = codes.iter().map(InviteCode::as_str).collect();
                warn!(
                    "{} joined guild {} via one of {:?}; cannot tell which",
                    member, self.guild, codes
                );
            }
            Attribution::Unattributed => {
                debug!("{} joined guild {} with no invite change", member, self.guild);
            }
        }

        attribution
    }
}

async fn fetch(
    source: &dyn InviteSource,
    guild: GuildId,
    config: &TrackerConfig,
) -> Result<InviteUsageSnapshot, RetrievalError> {
    match config.retrieval_timeout {
        Some(limit) => tokio::time::timeout(limit, source.list_invite_usage(guild))
            .await
            .map_err(|_| RetrievalError::Timeout(limit))?,
        None => source.list_invite_usage(guild).await,
    }
}
