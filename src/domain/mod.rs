//! Domain models for the raffle backend.
//!
//! Off-chain records (raffles, tickets, participants, users) and the typed
//! view of ledger transaction receipts.

mod raffle;
mod receipt;
mod types;

pub use raffle::*;
pub use receipt::*;
pub use types::*;
