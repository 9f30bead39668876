//! Off-chain raffle records.
//!
//! The store is the system of record for these; the ledger stays authoritative
//! for prize custody and winner selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RaffleId, TicketId};

/// A raffle confirmed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raffle {
    pub raffle_id: RaffleId,
    pub owner_address: String,
    /// Prize per winner as a decimal ether string.
    pub prize_amount: String,
    pub num_winners: u32,
    /// Epoch seconds.
    pub end_time: u64,
    /// Tickets generated for this raffle.
    pub tickets_issued: u64,
    /// Tickets redeemed into a participant entry.
    pub entries_redeemed: u64,
    pub revealed: bool,
    pub reveal_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Raffle {
    pub fn new(
        raffle_id: RaffleId,
        owner_address: impl Into<String>,
        prize_amount: impl Into<String>,
        num_winners: u32,
        end_time: u64,
    ) -> Self {
        Self {
            raffle_id,
            owner_address: owner_address.into(),
            prize_amount: prize_amount.into(),
            num_winners,
            end_time,
            tickets_issued: 0,
            entries_redeemed: 0,
            revealed: false,
            reveal_tx_hash: None,
            created_at: Utc::now(),
        }
    }
}

/// A single-use QR ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrTicket {
    pub ticket_id: TicketId,
    pub raffle_id: RaffleId,
    pub used: bool,
    /// Wallet the ticket was issued to, or that redeemed it.
    pub user_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub scanned_at: Option<DateTime<Utc>>,
}

impl QrTicket {
    pub fn new(ticket_id: TicketId, raffle_id: RaffleId) -> Self {
        Self {
            ticket_id,
            raffle_id,
            used: false,
            user_address: None,
            created_at: Utc::now(),
            scanned_at: None,
        }
    }

    /// A ticket issued to a known wallet ahead of redemption.
    pub fn bound_to(mut self, address: impl Into<String>) -> Self {
        self.user_address = Some(address.into());
        self
    }
}

/// Outcome of the atomic test-and-set on a ticket's `used` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketClaim {
    /// The ticket was unused and is now marked used by this caller.
    Claimed(QrTicket),
    AlreadyUsed,
    NotFound,
}

/// A confirmed raffle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub raffle_id: RaffleId,
    pub ticket_id: TicketId,
    pub user_address: String,
    pub tx_hash: String,
    pub entered_at: DateTime<Utc>,
    pub winner: bool,
}

impl Participant {
    pub fn new(
        raffle_id: RaffleId,
        ticket_id: TicketId,
        user_address: impl Into<String>,
        tx_hash: impl Into<String>,
    ) -> Self {
        Self {
            raffle_id,
            ticket_id,
            user_address: user_address.into(),
            tx_hash: tx_hash.into(),
            entered_at: Utc::now(),
            winner: false,
        }
    }
}

/// A registered end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub wallet: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        wallet: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            wallet: wallet.into(),
            username: username.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}
