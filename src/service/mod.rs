//! Service wiring: the driver task that owns the engine

pub mod driver;

pub use driver::{EngineDriver, ShutdownSignal};
