//! # modX Core
//!
//! Position, reward and valuation accounting for the modX DeFi client.
//!
//! Everything in this crate is synchronous and free of I/O. Chain reads,
//! transaction submission and price polling live in `modx-server`; this
//! crate turns their raw results into stakes, liquidity positions,
//! portfolio snapshots and history lists.

pub mod alarm;
pub mod error;
pub mod history;
pub mod impact;
pub mod liquidity;
pub mod models;
pub mod portfolio;
pub mod profile;
pub mod reward;
pub mod units;
pub mod validation;

pub use error::*;
pub use models::*;
