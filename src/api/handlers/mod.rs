//! REST API handlers organized by domain.

pub mod health;
pub mod nft;
pub mod raffles;
pub mod tickets;
pub mod users;

pub use health::*;
pub use nft::*;
pub use raffles::*;
pub use tickets::*;
pub use users::*;
