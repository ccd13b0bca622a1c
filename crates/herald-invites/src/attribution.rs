//! Join attribution from an invite delta.
//!
//! # Rules
//!
//! ```text
//! used     removed   outcome
//! ───────────────────────────────────────────────
//! 1        0         Confident(used code)
//! ≥1       any       Ambiguous(used ++ removed)   (other than the row above)
//! 0        1         Confident(removed code)
//! 0        ≥2        Ambiguous(removed)
//! 0        0         Unattributed
//! ```
//!
//! One incremented code with nothing removed is the common case: one invite,
//! one extra use. Several increments, or an increment racing a removal, can't
//! be told apart from counters alone, so every candidate is reported.
//!
//! A lone removal with no increment is weaker evidence. The invite may have
//! been revoked independently of this join, or consumed by a concurrent join.
//! It is still reported as confident because the dominant cause is a
//! single-use invite being consumed. Treat it as a known false-positive source.

use crate::delta::InviteDelta;
use crate::snapshot::InviteUsageSnapshot;
use crate::types::InviteCode;

/// Outcome of attributing one join.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "outcome", content = "codes", rename_all = "snake_case"))]
pub enum Attribution {
    /// Exactly one invite explains the change.
    Confident(InviteCode),
    /// Several invites could explain the change. Used codes first, then removed.
    Ambiguous(Vec<InviteCode>),
    /// No invite counter moved (e.g. a discovery join).
    Unattributed,
}

impl Attribution {
    pub fn is_confident(&self) -> bool {
        matches!(self, Self::Confident(_))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }

    /// Every code the outcome names.
    pub fn codes(&self) -> &[InviteCode] {
        match self {
            Self::Confident(code) => std::slice::from_ref(code),
            Self::Ambiguous(codes) => codes,
            Self::Unattributed => &[],
        }
    }
}

/// Classify a delta. Total over every delta, including the empty one.
pub fn classify(delta: &InviteDelta) -> Attribution {
    let used = delta.used();
    let removed = delta.removed();

    if !used.is_empty() {
        if used.len() == 1 && removed.is_empty() {
            if let Some(code) = used.keys().next() {
                return Attribution::Confident(code.clone());
            }
        }
        return Attribution::Ambiguous(delta.candidates());
    }

    match removed {
        [] => Attribution::Unattributed,
        [code] => Attribution::Confident(code.clone()),
        codes => Attribution::Ambiguous(codes.to_vec()),
    }
}

/// Diff `before` against `after` and classify the result.
pub fn attribute(before: &InviteUsageSnapshot, after: &InviteUsageSnapshot) -> Attribution {
    classify(&before.diff(after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snap(entries: &[(&str, u64)]) -> InviteUsageSnapshot {
        entries.iter().map(|&(c, u)| (c, u)).collect()
    }

    fn codes(list: &[&str]) -> Vec<InviteCode> {
        list.iter().map(|&c| c.into()).collect()
    }

    #[test]
    fn confident_increment() {
        let outcome = attribute(&snap(&[("A", 0), ("B", 0)]), &snap(&[("A", 1), ("B", 0)]));
        assert_eq!(outcome, Attribution::Confident("A".into()));
    }

    #[test]
    fn confident_new_invite() {
        let outcome = attribute(&snap(&[("B", 0)]), &snap(&[("A", 1), ("B", 0)]));
        assert_eq!(outcome, Attribution::Confident("A".into()));
    }

    #[test]
    fn confident_single_use_consumed() {
        let outcome = attribute(&snap(&[("A", 9), ("B", 0)]), &snap(&[("B", 0)]));
        assert_eq!(outcome, Attribution::Confident("A".into()));
    }

    #[test]
    fn ambiguous_double_increment() {
        let outcome = attribute(&snap(&[("A", 0), ("B", 0)]), &snap(&[("A", 1), ("B", 1)]));
        assert_eq!(outcome, Attribution::Ambiguous(codes(&["A", "B"])));
    }

    #[test]
    fn ambiguous_increment_racing_removal() {
        let before = snap(&[("A", 9), ("B", 0)]);
        let after = snap(&[("B", 1)]);

        let delta = before.diff(&after);
        assert_eq!(delta.removed(), codes(&["A"]).as_slice());
        assert_eq!(delta.increment("B"), Some(1));

        assert_eq!(classify(&delta), Attribution::Ambiguous(codes(&["B", "A"])));
    }

    #[test]
    fn ambiguous_multiple_removals() {
        let outcome = attribute(&snap(&[("A", 1), ("B", 1), ("C", 0)]), &snap(&[("C", 0)]));
        assert_eq!(outcome, Attribution::Ambiguous(codes(&["A", "B"])));
    }

    #[test]
    fn no_signal() {
        let s = snap(&[("A", 0), ("B", 0)]);
        assert_eq!(attribute(&s, &s.clone()), Attribution::Unattributed);
        assert_eq!(
            attribute(&InviteUsageSnapshot::new(), &InviteUsageSnapshot::new()),
            Attribution::Unattributed
        );
    }

    #[test]
    fn single_decrease_is_still_a_change() {
        // A counter going down is odd but counts as the only moving code.
        let outcome = attribute(&snap(&[("A", 4)]), &snap(&[("A", 3)]));
        assert_eq!(outcome, Attribution::Confident("A".into()));
    }

    #[test]
    fn codes_accessor() {
        assert_eq!(Attribution::Confident("A".into()).codes(), codes(&["A"]).as_slice());
        assert_eq!(Attribution::Ambiguous(codes(&["A", "B"])).codes().len(), 2);
        assert!(Attribution::Unattributed.codes().is_empty());
        assert!(Attribution::Confident("A".into()).is_confident());
        assert!(Attribution::Ambiguous(vec![]).is_ambiguous());
    }

    fn arb_snapshot() -> impl Strategy<Value = InviteUsageSnapshot> {
        prop::collection::btree_map("[a-e]", 0u64..5, 0..6).prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn classification_is_deterministic(before in arb_snapshot(), after in arb_snapshot()) {
            prop_assert_eq!(attribute(&before, &after), attribute(&before, &after));
        }

        #[test]
        fn outcome_names_only_delta_codes(before in arb_snapshot(), after in arb_snapshot()) {
            let delta = before.diff(&after);
            let outcome = classify(&delta);
            let candidates = delta.candidates();
            for code in outcome.codes() {
                prop_assert!(candidates.contains(code));
            }
            prop_assert_eq!(outcome == Attribution::Unattributed, delta.is_empty());
        }
    }
}
