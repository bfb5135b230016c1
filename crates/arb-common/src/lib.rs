//! Shared market vocabulary for the cross-venue arbitrage executor.
//!
//! CRITICAL: All prices and quantities use `rust_decimal::Decimal`.
//! NEVER use f64 for financial math.

pub mod book;
pub mod types;

pub use book::{BookError, L2Book, Level};
pub use types::{Side, Venue};
