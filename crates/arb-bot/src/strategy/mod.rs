//! Two-leg open/close strategy.
//!
//! The machine's states, its event vocabulary, and the handlers that
//! drive them live here. See [`machine::StrategyMachine`] for the
//! transition rules.

pub mod events;
pub mod machine;
pub mod state;

pub use events::{OrderEvent, OrderEventKind};
pub use machine::{InitialPosition, StrategyConfig, StrategyHandle, StrategyMachine};
pub use state::{ActiveOrder, PositionLedger, StrategyState};
