//! Replay scenarios.
//!
//! A scenario is a JSON file describing guilds, their invite tables and the
//! roles tied to invite codes, followed by an ordered list of steps. Replaying
//! it drives a [`GuildRegistry`] over a [`MemoryInviteSource`], which makes
//! attribution behavior reproducible without a chat platform.
//!
//! ```json
//! {
//!   "guilds": [
//!     { "id": 1, "invites": { "friends": 0, "promo": 3 }, "roles": { "friends": "Friend" } }
//!   ],
//!   "steps": [
//!     { "action": "set_invites", "guild": 1, "invites": { "friends": 1, "promo": 3 } },
//!     { "action": "join", "guild": 1, "member": { "id": 10, "name": "ada" } }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use herald_invites::{Attribution, GuildId, InviteUsageSnapshot, Member, MemberJoin};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::{Error, Result, RetrievalError};
use crate::grant::{Grant, RoleMapGranter};
use crate::registry::GuildRegistry;
use crate::source::MemoryInviteSource;

/// A guild known to the scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildSetup {
    pub id: GuildId,

    /// Invite table at the start of the replay.
    #[serde(default)]
    pub invites: InviteUsageSnapshot,

    /// Invite code → role granted on confident attribution.
    #[serde(default)]
    pub roles: BTreeMap<String, String>,

    /// Track the guild from the start.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Replace a guild's invite table.
    SetInvites { guild: GuildId, invites: InviteUsageSnapshot },
    /// Make the next listing of a guild fail.
    FailNextFetch {
        guild: GuildId,
        #[serde(default)]
        reason: Option<String>,
    },
    /// Start tracking a guild.
    Activate { guild: GuildId },
    /// Stop tracking a guild.
    Deactivate { guild: GuildId },
    /// A member joins a guild.
    Join { guild: GuildId, member: Member },
}

/// A replayable scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub guilds: Vec<GuildSetup>,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse and validate a scenario.
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read, parse and validate a scenario file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for guild in &self.guilds {
            if !seen.insert(guild.id) {
                return Err(Error::Scenario(format!("guild {} declared twice", guild.id)));
            }
        }
        Ok(())
    }

    fn granter(&self) -> RoleMapGranter {
        self.guilds.iter().fold(RoleMapGranter::new(), |granter, guild| {
            guild
                .roles
                .iter()
                .fold(granter, |granter, (code, role)| granter.with_role(guild.id, code.as_str(), role.as_str()))
        })
    }
}

/// What happened to one join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JoinResult {
    Attributed { attribution: Attribution },
    /// The guild was not tracked.
    Untracked,
    /// The invite listing failed.
    Failed { error: String },
}

/// One replayed join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinRecord {
    pub guild: GuildId,
    pub member: Member,
    #[serde(flatten)]
    pub result: JoinResult,
}

/// Outcome of a replay.
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub joins: Vec<JoinRecord>,
    pub grants: Vec<Grant>,
    /// Activations that failed, with the reason.
    pub failed_activations: Vec<(GuildId, RetrievalError)>,
}

impl ReplayReport {
    pub fn confident(&self) -> usize {
        self.count(|a| a.is_confident())
    }

    pub fn ambiguous(&self) -> usize {
        self.count(|a| a.is_ambiguous())
    }

    pub fn unattributed(&self) -> usize {
        self.count(|a| *a == Attribution::Unattributed)
    }

    pub fn failed(&self) -> usize {
        self.joins
            .iter()
            .filter(|j| matches!(j.result, JoinResult::Failed { .. }))
            .count()
    }

    fn count(&self, pred: impl Fn(&Attribution) -> bool) -> usize {
        self.joins
            .iter()
            .filter(|j| matches!(&j.result, JoinResult::Attributed { attribution } if pred(attribution)))
            .count()
    }
}

/// Replay `scenario` with trackers configured by `config`.
///
/// Listing failures are recorded in the report, never returned: a failed join
/// or activation does not stop the replay.
pub async fn replay(scenario: &Scenario, config: TrackerConfig) -> Result<ReplayReport> {
    let source = Arc::new(MemoryInviteSource::new());
    let granter = Arc::new(scenario.granter());
    let registry = GuildRegistry::new(source.clone(), granter.clone(), config);
    let mut report = ReplayReport::default();
    debug!(
        "Replay trackers: refresh {}, dispatch {}",
        registry.config().refresh_mode,
        registry.config().dispatch_mode
    );

    for guild in &scenario.guilds {
        source.set_invites(guild.id, guild.invites.clone()).await;
        if guild.active {
            activate(&registry, guild.id, &mut report).await;
        }
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        match step {
            Step::SetInvites { guild, invites } => {
                source.set_invites(*guild, invites.clone()).await;
            }
            Step::FailNextFetch { guild, reason } => {
                let reason = reason.clone().unwrap_or_else(|| "injected failure".to_string());
                source.fail_next(*guild, RetrievalError::Transport(reason)).await;
            }
            Step::Activate { guild } => activate(&registry, *guild, &mut report).await,
            Step::Deactivate { guild } => {
                if !registry.deactivate(*guild).await {
                    warn!("Step {}: guild {} was not active", index, guild);
                }
            }
            Step::Join { guild, member } => {
                let event = MemberJoin::new(*guild, member.clone());
                let result = match registry.dispatch(&event).await {
                    Ok(Some(attribution)) => JoinResult::Attributed { attribution },
                    Ok(None) => JoinResult::Untracked,
                    Err(e) => JoinResult::Failed { error: e.to_string() },
                };
                report.joins.push(JoinRecord {
                    guild: *guild,
                    member: member.clone(),
                    result,
                });
            }
        }
    }

    registry.flush_grants().await;
    report.grants = granter.grants().await;

    info!(
        "Replayed {} steps: {} joins, {} confident, {} ambiguous, {} grants",
        scenario.steps.len(),
        report.joins.len(),
        report.confident(),
        report.ambiguous(),
        report.grants.len()
    );

    Ok(report)
}

async fn activate(registry: &GuildRegistry, guild: GuildId, report: &mut ReplayReport) {
    if let Err(e) = registry.activate(guild).await {
        report.failed_activations.push((guild, e));
    }
}
