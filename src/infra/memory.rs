//! In-memory raffle store
//!
//! Same semantics as the Postgres store, with one mutex standing in for the
//! database's per-statement atomicity. Selected with `STORE_BACKEND=memory`
//! for local development; the test suites run against it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    normalize_address, Participant, QrTicket, Raffle, RaffleId, TicketClaim, TicketId, User,
};
use crate::infra::{RaffleError, RaffleStore, Result};

#[derive(Default)]
struct Inner {
    raffles: HashMap<RaffleId, Raffle>,
    tickets: HashMap<TicketId, QrTicket>,
    participants: Vec<Participant>,
    users: Vec<User>,
}

/// Process-local raffle store
#[derive(Default)]
pub struct InMemoryRaffleStore {
    inner: Mutex<Inner>,
}

impl InMemoryRaffleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tickets stored for a raffle.
    pub async fn ticket_count(&self, raffle_id: RaffleId) -> usize {
        let inner = self.inner.lock().await;
        inner
            .tickets
            .values()
            .filter(|t| t.raffle_id == raffle_id)
            .count()
    }
}

#[async_trait]
impl RaffleStore for InMemoryRaffleStore {
    async fn insert_raffle(&self, raffle: &Raffle) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.raffles.contains_key(&raffle.raffle_id) {
            return Err(RaffleError::DuplicateRaffle(raffle.raffle_id));
        }
        inner.raffles.insert(raffle.raffle_id, raffle.clone());
        Ok(())
    }

    async fn get_raffle(&self, raffle_id: RaffleId) -> Result<Option<Raffle>> {
        Ok(self.inner.lock().await.raffles.get(&raffle_id).cloned())
    }

    async fn mark_raffle_revealed(
        &self,
        raffle_id: RaffleId,
        tx_hash: &str,
    ) -> Result<Option<Raffle>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.raffles.get_mut(&raffle_id).map(|raffle| {
            raffle.revealed = true;
            raffle.reveal_tx_hash = Some(tx_hash.to_string());
            raffle.clone()
        }))
    }

    async fn add_tickets_issued(&self, raffle_id: RaffleId, count: u64) -> Result<Option<Raffle>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.raffles.get_mut(&raffle_id).map(|raffle| {
            raffle.tickets_issued += count;
            raffle.clone()
        }))
    }

    async fn insert_tickets(&self, tickets: &[QrTicket]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let mut batch = HashSet::with_capacity(tickets.len());
        for ticket in tickets {
            if inner.tickets.contains_key(&ticket.ticket_id) || !batch.insert(&ticket.ticket_id) {
                return Err(RaffleError::Internal(format!(
                    "duplicate ticket id {}",
                    ticket.ticket_id
                )));
            }
        }
        for ticket in tickets {
            inner.tickets.insert(ticket.ticket_id.clone(), ticket.clone());
        }
        Ok(())
    }

    async fn get_ticket(
        &self,
        ticket_id: &TicketId,
        raffle_id: RaffleId,
    ) -> Result<Option<QrTicket>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .get(ticket_id)
            .filter(|t| t.raffle_id == raffle_id)
            .cloned())
    }

    async fn claim_ticket(
        &self,
        ticket_id: &TicketId,
        raffle_id: RaffleId,
        scanned_at: DateTime<Utc>,
    ) -> Result<TicketClaim> {
        let mut inner = self.inner.lock().await;
        let ticket = match inner
            .tickets
            .get_mut(ticket_id)
            .filter(|t| t.raffle_id == raffle_id)
        {
            Some(ticket) => ticket,
            None => return Ok(TicketClaim::NotFound),
        };
        if ticket.used {
            return Ok(TicketClaim::AlreadyUsed);
        }
        ticket.used = true;
        ticket.scanned_at = Some(scanned_at);
        Ok(TicketClaim::Claimed(ticket.clone()))
    }

    async fn release_ticket(&self, ticket_id: &TicketId, raffle_id: RaffleId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let entered = inner
            .participants
            .iter()
            .any(|p| p.raffle_id == raffle_id && &p.ticket_id == ticket_id);
        if entered {
            return Ok(());
        }
        if let Some(ticket) = inner
            .tickets
            .get_mut(ticket_id)
            .filter(|t| t.raffle_id == raffle_id)
        {
            ticket.used = false;
            ticket.scanned_at = None;
        }
        Ok(())
    }

    async fn complete_entry(&self, participant: &Participant) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let duplicate = inner.participants.iter().any(|p| {
            p.raffle_id == participant.raffle_id && p.ticket_id == participant.ticket_id
        });
        if duplicate {
            return Err(RaffleError::TicketAlreadyUsed);
        }
        if let Some(ticket) = inner.tickets.get_mut(&participant.ticket_id) {
            ticket.user_address = Some(participant.user_address.clone());
        }
        if let Some(raffle) = inner.raffles.get_mut(&participant.raffle_id) {
            raffle.entries_redeemed += 1;
        }
        inner.participants.push(participant.clone());
        Ok(())
    }

    async fn mark_winners(&self, raffle_id: RaffleId, winners: &[String]) -> Result<u64> {
        let winners: HashSet<String> = winners.iter().map(|w| normalize_address(w)).collect();
        let mut inner = self.inner.lock().await;
        let mut matched = 0;
        for participant in inner.participants.iter_mut().filter(|p| {
            p.raffle_id == raffle_id && winners.contains(&normalize_address(&p.user_address))
        }) {
            participant.winner = true;
            matched += 1;
        }
        Ok(matched)
    }

    async fn list_participants(&self, raffle_id: RaffleId) -> Result<Vec<Participant>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .participants
            .iter()
            .filter(|p| p.raffle_id == raffle_id)
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|u| u.wallet == user.wallet) {
            return Err(RaffleError::DuplicateUser(user.wallet.clone()));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.inner.lock().await.users.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}
