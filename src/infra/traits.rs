//! Trait definitions for the collaborators behind the reconciliation service

use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    LedgerReceipt, Participant, QrTicket, Raffle, RaffleId, TicketClaim, TicketId, User,
};

use super::Result;

/// Ledger client wraps the on-chain raffle contract.
///
/// Mutating calls wait for confirmation and return the decoded receipt.
/// There is no timeout or retry here; a stalled confirmation stalls the caller.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit `createRaffle`, funded with `value` wei.
    async fn create_raffle(
        &self,
        num_winners: u32,
        prize_per_winner: U256,
        end_time: u64,
        value: U256,
    ) -> Result<LedgerReceipt>;

    /// Submit `enterRaffle` signed with the participant's private key.
    async fn enter_raffle(&self, raffle_id: RaffleId, participant_key: &str)
        -> Result<LedgerReceipt>;

    /// Submit `revealWinners`.
    async fn reveal_winners(&self, raffle_id: RaffleId) -> Result<LedgerReceipt>;

    /// Current on-chain participant list.
    async fn participants(&self, raffle_id: RaffleId) -> Result<Vec<String>>;

    /// Current on-chain winner list.
    async fn winners(&self, raffle_id: RaffleId) -> Result<Vec<String>>;

    /// Submit `deployNFTForRaffle`.
    async fn deploy_nft(
        &self,
        raffle_id: RaffleId,
        name: &str,
        symbol: &str,
        base_uri: &str,
    ) -> Result<LedgerReceipt>;

    /// Submit `mintNFTToLosers`.
    async fn mint_to_losers(&self, raffle_id: RaffleId) -> Result<LedgerReceipt>;
}

/// Persistence store for off-chain raffle state.
///
/// Every method is a single atomic operation on the backend; cross-request
/// serialization on a record is the store's responsibility.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RaffleStore: Send + Sync {
    /// Insert a new raffle. Fails with `DuplicateRaffle` if the id exists.
    async fn insert_raffle(&self, raffle: &Raffle) -> Result<()>;

    async fn get_raffle(&self, raffle_id: RaffleId) -> Result<Option<Raffle>>;

    /// Find-and-update: set `revealed` and the reveal tx hash.
    async fn mark_raffle_revealed(
        &self,
        raffle_id: RaffleId,
        tx_hash: &str,
    ) -> Result<Option<Raffle>>;

    /// Find-and-update: add `count` to `tickets_issued`.
    async fn add_tickets_issued(&self, raffle_id: RaffleId, count: u64) -> Result<Option<Raffle>>;

    /// Insert a batch of tickets in one operation.
    async fn insert_tickets(&self, tickets: &[QrTicket]) -> Result<()>;

    async fn get_ticket(&self, ticket_id: &TicketId, raffle_id: RaffleId)
        -> Result<Option<QrTicket>>;

    /// Atomic test-and-set of the `used` flag.
    async fn claim_ticket(
        &self,
        ticket_id: &TicketId,
        raffle_id: RaffleId,
        scanned_at: DateTime<Utc>,
    ) -> Result<TicketClaim>;

    /// Undo a claim whose ledger entry never happened. No-op once a
    /// participant exists for the ticket.
    async fn release_ticket(&self, ticket_id: &TicketId, raffle_id: RaffleId) -> Result<()>;

    /// Record a confirmed entry: participant row, ticket holder address, and
    /// the raffle's redeemed count, in one unit.
    async fn complete_entry(&self, participant: &Participant) -> Result<()>;

    /// Update-many: flag every participant whose address is in `winners`.
    /// Returns the number of matching participants.
    async fn mark_winners(&self, raffle_id: RaffleId, winners: &[String]) -> Result<u64>;

    async fn list_participants(&self, raffle_id: RaffleId) -> Result<Vec<Participant>>;

    /// Insert a user. Fails with `DuplicateUser` if the wallet exists.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<User>>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<()>;

    /// Release backend resources on shutdown.
    async fn close(&self);
}

/// Content-addressed upload service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload `bytes` and return a retrieval URL.
    async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<String>;
}
