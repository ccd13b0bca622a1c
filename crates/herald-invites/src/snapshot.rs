//! Point-in-time invite usage tables.

use std::collections::BTreeMap;

use crate::delta::InviteDelta;
use crate::types::InviteCode;

/// Complete invite code → cumulative use count table of one guild.
///
/// A snapshot lists every invite valid at the instant it was taken. A code
/// missing from a later snapshot expired, was revoked or hit its use limit;
/// it is never "not yet observed".
///
/// Codes iterate in lexical order so that every sequence derived from a
/// snapshot (see [`InviteDelta`]) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct InviteUsageSnapshot {
    uses: BTreeMap<InviteCode, u64>,
}

impl InviteUsageSnapshot {
    /// Empty snapshot (a guild with no invites).
    pub fn new() -> Self {
        Self::default()
    }

    /// Use count of a code, if the code is present.
    pub fn uses(&self, code: &str) -> Option<u64> {
        self.uses.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.uses.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.uses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }

    /// Codes in iteration order.
    pub fn codes(&self) -> impl Iterator<Item = &InviteCode> {
        self.uses.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InviteCode, u64)> {
        self.uses.iter().map(|(code, uses)| (code, *uses))
    }

    /// Structural difference from `self` (before) to `after`.
    ///
    /// Codes only in `self` are `removed`. Codes whose count changed, including
    /// codes only in `after` (baseline 0), land in `used`. Unchanged codes
    /// appear in neither.
    pub fn diff(&self, after: &InviteUsageSnapshot) -> InviteDelta {
        let removed = self
            .uses
            .keys()
            .filter(|code| !after.uses.contains_key(*code))
            .cloned()
            .collect();

        let used = after
            .uses
            .iter()
            .filter_map(|(code, &now)| {
                let was = self.uses.get(code).copied().unwrap_or(0);
                let change = i128::from(now) - i128::from(was);
                (change != 0).then(|| (code.clone(), change))
            })
            .collect();

        InviteDelta::new(removed, used)
    }
}

impl<C: Into<InviteCode>> FromIterator<(C, u64)> for InviteUsageSnapshot {
    fn from_iter<I: IntoIterator<Item = (C, u64)>>(iter: I) -> Self {
        Self {
            uses: iter.into_iter().map(|(code, uses)| (code.into(), uses)).collect(),
        }
    }
}

impl From<BTreeMap<InviteCode, u64>> for InviteUsageSnapshot {
    fn from(uses: BTreeMap<InviteCode, u64>) -> Self {
        Self { uses }
    }
}
