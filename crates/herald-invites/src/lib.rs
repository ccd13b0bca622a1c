//! Herald Invites
//!
//! Invite usage bookkeeping for join attribution.
//!
//! # Model
//!
//! A guild exposes a set of invite codes, each with a cumulative use counter.
//! An [`InviteUsageSnapshot`] captures the complete set at one instant. Two
//! snapshots of the same guild taken around a member join differ by an
//! [`InviteDelta`]:
//!
//! ```text
//! before = {A:9, B:0, C:3}
//! after  = {B:1, C:3, D:1}
//!
//! removed = [A]            codes gone from `after`
//! used    = {B:+1, D:+1}   non-zero increments, new codes count from 0
//! ```
//!
//! The delta is then classified into an [`Attribution`]: one confident code,
//! an ambiguous candidate list, or nothing at all.
//!
//! Everything in this crate is pure. Fetching snapshots, locking and
//! dispatching outcomes live in `herald-tracker`.

mod attribution;
mod delta;
mod snapshot;
mod types;

pub use attribution::{attribute, classify, Attribution};
pub use delta::InviteDelta;
pub use snapshot::InviteUsageSnapshot;
pub use types::{GuildId, InviteCode, Member, MemberJoin, UserId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_matches_diff_then_classify() {
        let before = InviteUsageSnapshot::from_iter([("A", 0), ("B", 0)]);
        let after = InviteUsageSnapshot::from_iter([("A", 1), ("B", 0)]);

        let delta = before.diff(&after);
        assert_eq!(classify(&delta), attribute(&before, &after));
        assert_eq!(attribute(&before, &after), Attribution::Confident("A".into()));
    }
}
