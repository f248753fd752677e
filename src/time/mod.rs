//! Time handling: clocks, cancellable waits and cadence alignment.

pub mod source;
pub mod timer;

pub use source::{Clock, SimulatedClock, SystemClock};
pub use timer::{Timer, WaitOutcome, delay_to_next_boundary};
