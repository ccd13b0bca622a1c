//! Difference between two snapshots of the same guild.

use std::collections::BTreeMap;

use crate::types::InviteCode;

/// Removed codes and non-zero usage increments between two snapshots.
///
/// Built by [`InviteUsageSnapshot::diff`](crate::InviteUsageSnapshot::diff).
/// A code is in at most one of `removed` and `used`: a removed code has no
/// "after" count to diff against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InviteDelta {
    removed: Vec<InviteCode>,
    used: BTreeMap<InviteCode, i128>,
}

impl InviteDelta {
    pub(crate) fn new(removed: Vec<InviteCode>, used: BTreeMap<InviteCode, i128>) -> Self {
        debug_assert!(removed.iter().all(|code| !used.contains_key(code)));
        debug_assert!(used.values().all(|&change| change != 0));
        Self { removed, used }
    }

    /// Codes present before and absent after, in the before snapshot's order.
    pub fn removed(&self) -> &[InviteCode] {
        &self.removed
    }

    /// Code → signed change in use count. Never contains zero.
    pub fn used(&self) -> &BTreeMap<InviteCode, i128> {
        &self.used
    }

    pub fn increment(&self, code: &str) -> Option<i128> {
        self.used.get(code).copied()
    }

    /// No counter moved and nothing disappeared.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.used.is_empty()
    }

    /// Every code the delta mentions: `used` codes first, then `removed`.
    pub fn candidates(&self) -> Vec<InviteCode> {
        self.used
            .keys()
            .chain(self.removed.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_list_used_before_removed() {
        let delta = InviteDelta::new(
            vec!["A".into()],
            BTreeMap::from([(InviteCode::from("B"), 1), (InviteCode::from("C"), 2)]),
        );
        let codes: Vec<_> = delta.candidates().iter().map(|c| c.to_string()).collect();
        assert_eq!(codes, vec!["B", "C", "A"]);
    }

    #[test]
    fn default_is_empty() {
        let delta = InviteDelta::default();
        assert!(delta.is_empty());
        assert!(delta.candidates().is_empty());
        assert_eq!(delta.increment("A"), None);
    }
}
