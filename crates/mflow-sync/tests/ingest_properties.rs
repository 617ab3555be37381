// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for the merge rules of [`InboxState::apply_batch`].

use std::collections::BTreeSet;

use mflow_core::{Message, MessageOrigin};
use mflow_sync::InboxState;
use mflow_test_utils::fixtures::{conversation, incoming, optimistic, outbound};
use proptest::prelude::*;

fn fresh_state() -> InboxState {
    InboxState::new(
        vec![],
        vec![conversation("c1", "p1", "u1"), conversation("c2", "p1", "u2")],
        vec![],
        vec![],
        vec![],
        vec![],
    )
}

fn message_strategy() -> impl Strategy<Value = Message> {
    (
        0u8..12,
        prop::sample::select(vec!["c1", "c2", "ghost"]),
        prop::sample::select(vec!["hi", "hello", "thanks", "ok"]),
        any::<bool>(),
        0i64..3600,
    )
        .prop_map(|(id, conv, text, is_incoming, secs)| {
            let id = format!("m{id}");
            if is_incoming {
                incoming(&id, conv, text, secs)
            } else {
                outbound(&id, conv, text, secs)
            }
        })
}

/// Local sends awaiting their echo. Each is ingested on its own, as a send is.
fn optimistic_strategy() -> impl Strategy<Value = Message> {
    (
        0u8..6,
        prop::sample::select(vec!["c1", "c2"]),
        prop::sample::select(vec!["hi", "hello", "thanks", "ok"]),
        0i64..3600,
    )
        .prop_map(|(id, conv, text, secs)| optimistic(&format!("local-{id}"), conv, text, secs))
}

fn with_sends(sends: &[Message]) -> InboxState {
    let mut state = fresh_state();
    for send in sends {
        state.apply_batch(vec![send.clone()], true).unwrap();
    }
    state
}

/// No local send survives next to a provider copy of the same outbound text.
fn no_shadowed_sends(state: &InboxState) -> bool {
    state
        .messages
        .iter()
        .filter(|m| m.origin == MessageOrigin::Optimistic)
        .all(|local| {
            !state.messages.iter().any(|m| {
                m.origin == MessageOrigin::Authoritative
                    && !m.is_incoming
                    && m.conversation_id == local.conversation_id
                    && m.text == local.text
            })
        })
}

fn fingerprint(state: &InboxState) -> (BTreeSet<String>, Vec<(String, u32)>) {
    let ids = state.messages.iter().map(|m| m.id.clone()).collect();
    let unread = state
        .conversations
        .iter()
        .map(|c| (c.id.clone(), c.unread_count))
        .collect();
    (ids, unread)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// Re-applying a batch never changes state, and every echo has replaced
    /// the local send it confirms.
    #[test]
    fn ingest_twice_equals_ingest_once(
        sends in prop::collection::vec(optimistic_strategy(), 0..8),
        batch in prop::collection::vec(message_strategy(), 0..40),
    ) {
        let mut state = with_sends(&sends);
        state.apply_batch(batch.clone(), true).unwrap();
        let once = fingerprint(&state);
        prop_assert!(no_shadowed_sends(&state));

        let (plan, report) = state.apply_batch(batch, true).unwrap();
        prop_assert_eq!(report.inserted, 0);
        prop_assert_eq!(report.superseded, 0);
        prop_assert!(plan.is_empty());
        prop_assert_eq!(fingerprint(&state), once);
        prop_assert!(no_shadowed_sends(&state));
    }

    /// Splitting a batch into two consecutive ingests gives the same messages
    /// and unread counters as ingesting it whole, local sends included.
    #[test]
    fn split_batches_converge(
        sends in prop::collection::vec(optimistic_strategy(), 0..8),
        batch in prop::collection::vec(message_strategy(), 0..40),
        cut in 0usize..40,
    ) {
        let cut = cut.min(batch.len());
        let mut whole = with_sends(&sends);
        whole.apply_batch(batch.clone(), true).unwrap();

        let mut split = with_sends(&sends);
        let tail = batch[cut..].to_vec();
        let head = batch[..cut].to_vec();
        split.apply_batch(head, true).unwrap();
        split.apply_batch(tail, true).unwrap();

        prop_assert_eq!(fingerprint(&whole), fingerprint(&split));
        prop_assert!(no_shadowed_sends(&whole));
        prop_assert!(no_shadowed_sends(&split));
    }

    /// Orphans are never inserted and every id appears once.
    #[test]
    fn no_orphans_no_duplicate_ids(batch in prop::collection::vec(message_strategy(), 0..40)) {
        let mut state = fresh_state();
        let (_, report) = state.apply_batch(batch.clone(), true).unwrap();

        let ids: Vec<&str> = state.messages.iter().map(|m| m.id.as_str()).collect();
        let unique: BTreeSet<&str> = ids.iter().copied().collect();
        prop_assert_eq!(ids.len(), unique.len());
        prop_assert!(state.messages.iter().all(|m| m.conversation_id != "ghost"));
        prop_assert_eq!(
            report.inserted + report.duplicates + report.orphaned,
            batch.len()
        );
    }
}
