//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for any valid input.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;

use raffle_reconciler::domain::{
    normalize_address, same_address, Participant, QrTicket, Raffle, TicketClaim, TicketId,
};
use raffle_reconciler::infra::{InMemoryRaffleStore, RaffleStore};
use raffle_reconciler::service::{RaffleService, ServiceConfig};

use common::{FakeLedger, PlainEncoder};

// ============================================================================
// Custom Strategies
// ============================================================================

/// Generate a 20-byte hex address with random letter casing
fn arb_address() -> impl Strategy<Value = String> {
    (any::<[u8; 20]>(), any::<u32>()).prop_map(|(bytes, casing)| {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let mixed: String = hex
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if casing & (1 << (i % 32)) != 0 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect();
        format!("0x{mixed}")
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn service(store: Arc<InMemoryRaffleStore>) -> RaffleService {
    RaffleService::new(
        Arc::new(FakeLedger::new()),
        store,
        Arc::new(PlainEncoder),
        ServiceConfig::default(),
    )
}

// ============================================================================
// Ticket issuance
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// tickets_issued grows by exactly the requested count, with fresh ids.
    #[test]
    fn prop_ticket_generation_adds_exactly_count(batches in prop::collection::vec(1i64..40, 1..6)) {
        let rt = runtime();
        rt.block_on(async {
            let store = Arc::new(InMemoryRaffleStore::new());
            store.insert_raffle(&Raffle::new(1, "0xowner", "1", 1, 0)).await.unwrap();
            let service = service(store.clone());

            let mut ids = HashSet::new();
            let mut expected = 0u64;
            for count in &batches {
                let before = store.get_raffle(1).await.unwrap().unwrap().tickets_issued;
                let batch = service.generate_tickets(1, Some(*count)).await.unwrap();
                expected += *count as u64;

                prop_assert_eq!(batch.tickets_issued, before + *count as u64);
                prop_assert_eq!(batch.tickets.len() as i64, *count);
                for issued in batch.tickets {
                    prop_assert!(ids.insert(issued.ticket.ticket_id));
                }
            }

            prop_assert_eq!(store.ticket_count(1).await as u64, expected);
            prop_assert_eq!(ids.len() as u64, expected);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A ticket can be claimed at most once, however many callers race for it.
    #[test]
    fn prop_ticket_claimed_at_most_once(contenders in 2usize..16) {
        let rt = runtime();
        rt.block_on(async {
            let store = Arc::new(InMemoryRaffleStore::new());
            store.insert_raffle(&Raffle::new(1, "0xowner", "1", 1, 0)).await.unwrap();
            let ticket = QrTicket::new(TicketId::generate(), 1);
            let id = ticket.ticket_id.clone();
            store.insert_tickets(&[ticket]).await.unwrap();

            let handles: Vec<_> = (0..contenders)
                .map(|_| {
                    let store = store.clone();
                    let id = id.clone();
                    tokio::spawn(async move { store.claim_ticket(&id, 1, Utc::now()).await.unwrap() })
                })
                .collect();

            let mut claimed = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    TicketClaim::Claimed(_) => claimed += 1,
                    TicketClaim::AlreadyUsed => {}
                    TicketClaim::NotFound => prop_assert!(false, "ticket vanished"),
                }
            }
            prop_assert_eq!(claimed, 1);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Applying the same winner set twice leaves the same participant state.
    #[test]
    fn prop_winner_marking_is_idempotent(
        addresses in prop::collection::vec(arb_address(), 1..12),
        picks in prop::collection::vec(any::<bool>(), 12),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = InMemoryRaffleStore::new();
            store.insert_raffle(&Raffle::new(1, "0xowner", "1", 1, 0)).await.unwrap();
            for (i, address) in addresses.iter().enumerate() {
                let ticket = QrTicket::new(TicketId::from(format!("t-{i}")), 1);
                store.insert_tickets(std::slice::from_ref(&ticket)).await.unwrap();
                store
                    .complete_entry(&Participant::new(1, ticket.ticket_id, address.clone(), "0xtx"))
                    .await
                    .unwrap();
            }

            let winners: Vec<String> = addresses
                .iter()
                .zip(&picks)
                .filter(|(_, pick)| **pick)
                .map(|(a, _)| a.to_lowercase())
                .collect();

            store.mark_winners(1, &winners).await.unwrap();
            let once = store.list_participants(1).await.unwrap();
            store.mark_winners(1, &winners).await.unwrap();
            let twice = store.list_participants(1).await.unwrap();

            prop_assert_eq!(&once, &twice);
            let winner_set: HashSet<_> = winners.iter().cloned().collect();
            for participant in &twice {
                prop_assert_eq!(
                    participant.winner,
                    winner_set.contains(&normalize_address(&participant.user_address))
                );
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Address comparison ignores hex casing.
    #[test]
    fn prop_address_comparison_ignores_case(address in arb_address()) {
        prop_assert!(same_address(&address, &address.to_uppercase()));
        prop_assert!(same_address(&address.to_lowercase(), &address));
        prop_assert_eq!(normalize_address(&address), address.to_lowercase());
    }
}
