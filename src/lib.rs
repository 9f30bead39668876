//! Raffle Reconciler Library
//!
//! Backend that keeps off-chain raffle, ticket and participant records in
//! agreement with an on-chain raffle contract.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (raffles, tickets, participants, receipts)
//! - [`infra`] - Infrastructure implementations (PostgreSQL, in-memory, IPFS)
//! - [`ledger`] - Raffle contract client
//! - [`ticketing`] - QR ticket generation
//! - [`service`] - Reconciliation service
//! - [`api`] - REST API routes

pub mod api;
pub mod domain;
pub mod infra;
pub mod ledger;
pub mod migrations;
pub mod server;
pub mod service;
pub mod ticketing;

// Re-export commonly used types
pub use domain::{LedgerReceipt, Participant, QrTicket, Raffle, RaffleId, TicketId, User};
pub use infra::{LedgerClient, RaffleError, RaffleStore, Result};
pub use service::{RaffleService, ServiceConfig};
