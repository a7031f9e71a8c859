//! Background workers.

pub mod continuation_pump;

pub use continuation_pump::{ContinuationPump, PumpSettings, PumpStats, WorkerHandle};
