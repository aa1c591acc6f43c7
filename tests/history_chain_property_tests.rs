//! Property-based tests for the transition history chain
//!
//! The history log is the audit trail regulators ask for, so its integrity
//! checks have to hold for any sequence of attempts, not just the ones a
//! scenario happens to produce.

use audit_workflow::{
    AuditState, ReasonCode, Role, TimeStamp, TransitionHistory, TransitionHistoryEntry,
    error::HistoryError,
    history::{GENESIS_HASH, Outcome},
};
use proptest::prelude::*;

// These property tests cover:
//
// 1. Integrity - any sequence of in-order appends verifies
// 2. Persistence - the CBOR encoding preserves the chain
// 3. Ordering - an entry older than the last one is refused
//
// What these tests DON'T cover (deliberately):
//
// - Whether the attempts themselves were valid (the engine's job)
// - Tamper evidence (needs access to the links, see the history module tests)
// - Concurrent appends (covered by the sled store's compare-and-swap)

const AUDIT_ID: &str = "audit_chain";

fn state_strategy() -> impl Strategy<Value = AuditState> {
    prop::sample::select(AuditState::ALL.to_vec())
}

fn reason_strategy() -> impl Strategy<Value = ReasonCode> {
    prop::sample::select(ReasonCode::ALL.to_vec())
}

/// One attempt; a reason code makes it a rejection
fn entry_strategy() -> impl Strategy<Value = TransitionHistoryEntry> {
    (
        state_strategy(),
        state_strategy(),
        prop::sample::select(Role::ALL.to_vec()),
        prop::option::of(reason_strategy()),
    )
        .prop_map(|(from_state, to_state, actor_role, reason_code)| {
            TransitionHistoryEntry {
                audit_id: AUDIT_ID.into(),
                from_state,
                to_state,
                actor_role,
                outcome: if reason_code.is_some() {
                    Outcome::Rejected
                } else {
                    Outcome::Accepted
                },
                // placeholder, restamped in sequence below
                timestamp: TimeStamp::now(),
                reason_code,
            }
        })
}

/// 1 to 12 entries with non-decreasing timestamps
fn entry_sequence_strategy() -> impl Strategy<Value = Vec<TransitionHistoryEntry>> {
    prop::collection::vec((entry_strategy(), 0u32..3), 1..=12).prop_map(|entries| {
        let mut minute = 0;
        entries
            .into_iter()
            .map(|(mut entry, step)| {
                minute += step;
                entry.timestamp = TimeStamp::new_with(2025, 5, 5, 8, minute, 0).unwrap();
                entry
            })
            .collect()
    })
}

fn build(entries: &[TransitionHistoryEntry]) -> TransitionHistory {
    let mut history = TransitionHistory::new(AUDIT_ID.into());
    for entry in entries {
        history.append(entry.clone()).unwrap();
    }
    history
}

proptest! {
    /// Property: every in-order sequence of appends verifies, and the head is
    /// the digest returned by the last append
    #[test]
    fn prop_appended_chain_verifies(entries in entry_sequence_strategy()) {
        let mut history = TransitionHistory::new(AUDIT_ID.into());
        let mut last_head = GENESIS_HASH.to_string();

        for entry in &entries {
            let head = history.append(entry.clone()).unwrap();
            prop_assert_ne!(&head, &last_head);
            last_head = head;
        }

        prop_assert_eq!(history.len(), entries.len());
        prop_assert_eq!(history.head(), last_head.as_str());
        prop_assert!(history.verify().is_ok());
        prop_assert!(history.entries().eq(entries.iter()));
    }

    /// Property: the CBOR encoding preserves the chain and its integrity
    #[test]
    fn prop_cbor_roundtrip_preserves_chain(entries in entry_sequence_strategy()) {
        let history = build(&entries);

        let cbor = minicbor::to_vec(&history).unwrap();
        let decoded: TransitionHistory = minicbor::decode(&cbor).unwrap();

        prop_assert_eq!(&decoded, &history);
        prop_assert!(decoded.verify().is_ok());
    }

    /// Property: an entry older than the last recorded one is refused and the
    /// log is left untouched
    #[test]
    fn prop_out_of_order_is_refused(
        entries in entry_sequence_strategy(),
        late in entry_strategy(),
    ) {
        let mut history = build(&entries);
        let head = history.head().to_string();

        let mut late = late;
        late.timestamp = TimeStamp::new_with(2025, 5, 4, 8, 0, 0).unwrap();

        prop_assert_eq!(history.append(late), Err(HistoryError::OutOfOrder));
        prop_assert_eq!(history.len(), entries.len());
        prop_assert_eq!(history.head(), head.as_str());
    }
}
