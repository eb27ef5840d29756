//! Resilience primitives: per-upstream circuit breakers and per-class
//! concurrency gates.

mod breaker;
mod gate;

pub use breaker::{BreakerSnapshot, CircuitBreaker};
pub use gate::{ConcurrencyGate, GatePermit, GateSnapshot, LaneSnapshot};
