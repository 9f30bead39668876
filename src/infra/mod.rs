//! Infrastructure layer
//!
//! Contains trait definitions and implementations for:
//! - Raffle persistence (PostgreSQL, in-memory)
//! - Content-addressed uploads (Pinata/IPFS)
//! - Graceful shutdown (request draining)

mod content;
mod error;
mod memory;
pub mod postgres;
mod shutdown;
mod traits;

pub use content::{ContentStoreConfig, PinataContentStore};
pub use error::*;
pub use memory::InMemoryRaffleStore;
pub use postgres::PgRaffleStore;
pub use shutdown::{shutdown_signal, RequestGuard, RequestTracker, ShutdownCoordinator};
pub use traits::*;
