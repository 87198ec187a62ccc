pub mod position;

pub use position::{ExitReason, OpenPosition, SimulatedTrade};
