//! Herald Tracker - attribute guild joins to invites
//!
//! Watches invite use counters of every active guild and, for each member
//! join, decides which invite the member most likely used.
//!
//! # Architecture
//!
//! - **Source**: [`InviteSource`] lists a guild's invites with use counts
//! - **Tracker**: [`GuildInviteTracker`] holds one guild's snapshot and
//!   serializes refresh-and-compare per join
//! - **Registry**: [`GuildRegistry`] owns one tracker per active guild and
//!   wires outcomes to a [`RoleGranter`]
//! - **Scenario**: JSON replays for the `herald-replay` binary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use herald_tracker::{GuildRegistry, MemoryInviteSource, RoleMapGranter, TrackerConfig};
//! use herald_invites::{GuildId, Member, MemberJoin};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(MemoryInviteSource::new());
//!     let granter = Arc::new(RoleMapGranter::new().with_role(GuildId(1), "friends", "Friend"));
//!     let registry = GuildRegistry::new(source.clone(), granter, TrackerConfig::from_env()?);
//!
//!     source.set_invites(GuildId(1), [("friends", 0)].into_iter().collect()).await;
//!     registry.activate(GuildId(1)).await?;
//!
//!     source.set_invites(GuildId(1), [("friends", 1)].into_iter().collect()).await;
//!     let join = MemberJoin::new(GuildId(1), Member::new(10, "ada"));
//!     println!("{:?}", registry.dispatch(&join).await?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod grant;
pub mod registry;
pub mod scenario;
pub mod source;
pub mod tracker;

pub use config::{DispatchMode, RefreshMode, TrackerConfig};
pub use error::{Error, GrantError, Result, RetrievalError};
pub use grant::{Grant, RoleGranter, RoleMapGranter};
pub use registry::GuildRegistry;
pub use scenario::{replay, ReplayReport, Scenario};
pub use source::{InviteSource, MemoryInviteSource};
pub use tracker::{AttributionCallbacks, GuildInviteTracker};
