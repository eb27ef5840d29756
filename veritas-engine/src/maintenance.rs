//! Maintenance Background Task
//!
//! Periodically:
//!
//! - sweeps expired entries out of the analysis cache
//! - purges stored messages older than the retention window, in batches,
//!   dropping the cached history of every author/scope it touched
//!
//! Runs until the shutdown signal flips to `true`.

use crate::context::PipelineContext;
use chrono::{TimeDelta, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use veritas_core::{MaintenanceConfig, Snowflake, Timestamp};

// ============================================================================
// METRICS
// ============================================================================

/// Counters for maintenance activity since startup.
#[derive(Debug, Default)]
pub struct MaintenanceMetrics {
    pub cycles: AtomicU64,
    pub cache_entries_swept: AtomicU64,
    pub messages_purged: AtomicU64,
    pub errors: AtomicU64,
}

impl MaintenanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MaintenanceSnapshot {
        MaintenanceSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            cache_entries_swept: self.cache_entries_swept.load(Ordering::Relaxed),
            messages_purged: self.messages_purged.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of maintenance metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceSnapshot {
    pub cycles: u64,
    pub cache_entries_swept: u64,
    pub messages_purged: u64,
    pub errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run maintenance cycles every `config.sweep_interval` until shutdown.
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(maintenance_task(ctx, config, shutdown_rx));
/// // ...
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn maintenance_task(
    ctx: Arc<PipelineContext>,
    config: MaintenanceConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<MaintenanceMetrics> {
    let metrics = Arc::new(MaintenanceMetrics::new());

    let mut sweep_interval = interval(config.sweep_interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        retention_secs = config.message_retention.as_secs(),
        batch_size = config.purge_batch_size,
        "Maintenance task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Maintenance task shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                run_maintenance_cycle(&ctx, &config, Utc::now(), &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        cache_entries_swept = snapshot.cache_entries_swept,
        messages_purged = snapshot.messages_purged,
        errors = snapshot.errors,
        "Maintenance task completed"
    );

    metrics
}

/// One maintenance cycle as of `now`.
pub async fn run_maintenance_cycle(
    ctx: &PipelineContext,
    config: &MaintenanceConfig,
    now: Timestamp,
    metrics: &MaintenanceMetrics,
) {
    metrics.cycles.fetch_add(1, Ordering::Relaxed);

    let swept = ctx.sweep_caches() as u64;
    metrics
        .cache_entries_swept
        .fetch_add(swept, Ordering::Relaxed);

    let purged = purge_expired_messages(ctx, config, now, metrics).await;

    if swept > 0 || purged > 0 {
        tracing::info!(swept, purged, "Maintenance cycle completed");
    } else {
        tracing::trace!("Maintenance cycle completed with nothing to do");
    }
}

async fn purge_expired_messages(
    ctx: &PipelineContext,
    config: &MaintenanceConfig,
    now: Timestamp,
    metrics: &MaintenanceMetrics,
) -> u64 {
    let Some(cutoff) = TimeDelta::from_std(config.message_retention)
        .ok()
        .and_then(|retention| now.checked_sub_signed(retention))
    else {
        tracing::debug!("Retention window exceeds representable time, nothing to purge");
        return 0;
    };

    let expired = match ctx
        .store()
        .find_older_than(cutoff, config.purge_batch_size)
        .await
    {
        Ok(expired) => expired,
        Err(e) => {
            tracing::error!(error = %e, "Failed to find expired messages");
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return 0;
        }
    };
    if expired.is_empty() {
        return 0;
    }

    let ids: Vec<Snowflake> = expired.iter().map(|m| m.id).collect();
    let touched: HashSet<(Snowflake, Snowflake)> = expired
        .iter()
        .map(|m| (m.author_id, m.scope_id))
        .collect();

    let deleted = match ctx.store().delete_many(&ids).await {
        Ok(deleted) => deleted as u64,
        Err(e) => {
            tracing::error!(error = %e, batch = ids.len(), "Failed to purge expired messages");
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return 0;
        }
    };

    for (author_id, scope_id) in touched {
        ctx.history().invalidate(author_id, scope_id);
    }
    metrics.messages_purged.fetch_add(deleted, Ordering::Relaxed);
    deleted
}
