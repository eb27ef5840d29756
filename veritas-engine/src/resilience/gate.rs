//! Per-class concurrency gate for one upstream service.
//!
//! Each priority class owns a lane: a FIFO semaphore sized to the class
//! limit plus a bounded waiting line. Lanes never borrow capacity from each
//! other. When a lane already has `max_queue_depth` callers waiting, new
//! callers are refused with `UpstreamError::GateSaturated` instead of
//! queueing without bound.

use crate::telemetry::metrics;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;
use veritas_core::{GateConfig, PriorityClass, UpstreamError, UpstreamResult};

struct Lane {
    semaphore: Arc<Semaphore>,
    limit: usize,
    waiting: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
}

/// Occupancy of one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneSnapshot {
    pub class: PriorityClass,
    pub limit: usize,
    pub in_flight: usize,
    pub waiting: usize,
}

/// Occupancy of a whole gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateSnapshot {
    pub service: String,
    pub max_queue_depth: usize,
    pub lanes: Vec<LaneSnapshot>,
}

/// Admission slot. Dropping it frees the slot for the next waiter.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Concurrency gate with one independent lane per priority class.
pub struct ConcurrencyGate {
    service: &'static str,
    max_queue_depth: usize,
    lanes: HashMap<PriorityClass, Lane>,
}

impl ConcurrencyGate {
    pub fn new(service: &'static str, config: &GateConfig) -> Self {
        let lanes = PriorityClass::ALL
            .iter()
            .map(|&class| {
                let limit = config.limit_for(class).max(1);
                (
                    class,
                    Lane {
                        semaphore: Arc::new(Semaphore::new(limit)),
                        limit,
                        waiting: AtomicUsize::new(0),
                        in_flight: Arc::new(AtomicUsize::new(0)),
                    },
                )
            })
            .collect();

        Self {
            service,
            max_queue_depth: config.max_queue_depth,
            lanes,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    fn lane(&self, class: PriorityClass) -> UpstreamResult<&Lane> {
        self.lanes
            .get(&class)
            .ok_or_else(|| UpstreamError::InvalidResponse {
                service: self.service.to_string(),
                reason: format!("no gate lane for class {}", class),
            })
    }

    /// Wait for a slot in `class`, in arrival order.
    pub async fn acquire(&self, class: PriorityClass) -> UpstreamResult<GatePermit> {
        let lane = self.lane(class)?;

        let ahead = lane.waiting.fetch_add(1, Ordering::SeqCst);
        if ahead >= self.max_queue_depth {
            lane.waiting.fetch_sub(1, Ordering::SeqCst);
            warn!(
                service = self.service,
                class = %class,
                depth = ahead,
                "Gate saturated, refusing admission"
            );
            if let Some(m) = metrics() {
                m.record_gate_saturation(self.service, class.as_str());
            }
            return Err(UpstreamError::GateSaturated {
                service: self.service.to_string(),
                class,
                depth: ahead,
            });
        }

        let waiter = WaitGuard {
            waiting: &lane.waiting,
        };
        let permit = lane.semaphore.clone().acquire_owned().await;
        drop(waiter);

        // The semaphore is never closed.
        let permit = permit.map_err(|_| UpstreamError::InvalidResponse {
            service: self.service.to_string(),
            reason: "gate closed".to_string(),
        })?;

        lane.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(GatePermit {
            _permit: permit,
            in_flight: Arc::clone(&lane.in_flight),
        })
    }

    pub fn snapshot(&self) -> GateSnapshot {
        let lanes = PriorityClass::ALL
            .iter()
            .filter_map(|class| {
                self.lanes.get(class).map(|lane| LaneSnapshot {
                    class: *class,
                    limit: lane.limit,
                    in_flight: lane.in_flight.load(Ordering::SeqCst),
                    waiting: lane.waiting.load(Ordering::SeqCst),
                })
            })
            .collect();

        GateSnapshot {
            service: self.service.to_string(),
            max_queue_depth: self.max_queue_depth,
            lanes,
        }
    }
}

/// Keeps the waiting count honest when an acquiring future is dropped.
struct WaitGuard<'a> {
    waiting: &'a AtomicUsize,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("service", &self.service)
            .field("max_queue_depth", &self.max_queue_depth)
            .finish()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
