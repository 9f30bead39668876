//! Error types for the raffle backend

use thiserror::Error;

use crate::domain::{EventKind, RaffleId};

/// Errors raised by the reconciliation service and its collaborators
#[derive(Error, Debug)]
pub enum RaffleError {
    /// Missing or invalid request field
    #[error("{0}")]
    Validation(String),

    /// Ticket count outside the accepted range
    #[error("Invalid number of QR codes")]
    InvalidCount,

    /// No raffle record for the id
    #[error("Raffle not found")]
    RaffleNotFound(RaffleId),

    /// No ticket for the (ticket, raffle) pair
    #[error("QR code not found")]
    TicketNotFound,

    /// Ticket was redeemed before
    #[error("QR code already used")]
    TicketAlreadyUsed,

    /// A raffle record with this id exists already
    #[error("Raffle {0} already exists")]
    DuplicateRaffle(RaffleId),

    /// A user with this wallet exists already
    #[error("User already exists")]
    DuplicateUser(String),

    /// Expected event absent from a confirmed receipt
    #[error("{0}")]
    EventNotFound(String),

    /// Ledger call failed before a transaction was accepted, or it reverted
    #[error("{0}")]
    Ledger(String),

    /// Transaction was broadcast but its receipt could not be obtained
    #[error("Transaction {tx_hash} submitted but not confirmed: {reason}")]
    Unconfirmed { tx_hash: String, reason: String },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Content store upload failed
    #[error("upload failed: {0}")]
    Upload(String),

    /// Optional collaborator was not configured at startup
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    /// Internal error
    #[error("{0}")]
    Internal(String),
}

impl RaffleError {
    /// `EventNotFound` for an event missing from a receipt.
    pub fn event_not_found(kind: &EventKind) -> Self {
        RaffleError::EventNotFound(format!("{kind} event not found"))
    }

    /// Whether the ledger may have applied the call despite this error.
    pub fn may_have_landed(&self) -> bool {
        matches!(self, RaffleError::Unconfirmed { .. })
    }

    /// `EventNotFound` for a reveal whose winner list is absent or empty.
    pub fn no_winners() -> Self {
        RaffleError::EventNotFound(format!(
            "{} event not found or no winners",
            EventKind::WinnersRevealed
        ))
    }
}

/// Result type for raffle operations
pub type Result<T> = std::result::Result<T, RaffleError>;
