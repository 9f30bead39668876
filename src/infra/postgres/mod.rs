//! PostgreSQL implementation of the raffle store
//!
//! Production backend for off-chain raffle state.

mod raffle_store;

pub use raffle_store::*;
