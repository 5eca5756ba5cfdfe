use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(30);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Session-wide counters shared by the orchestrator, mutation tracker and
/// normalizer.
#[derive(Default, Debug)]
pub struct Telemetry {
    composite_fetches: AtomicU64,
    composite_failures: AtomicU64,
    source_failures: AtomicU64,
    superseded: AtomicU64,
    anomalies: AtomicU64,
    mutations_committed: AtomicU64,
    mutations_reverted: AtomicU64,
}

impl Telemetry {
    pub fn record_composite_fetch(&self) {
        self.composite_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_composite_failure(&self) {
        self.composite_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_failure(&self) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_anomalies(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.anomalies.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_mutation_committed(&self) {
        self.mutations_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mutation_reverted(&self) {
        self.mutations_reverted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            composite_fetches: self.composite_fetches.load(Ordering::Relaxed),
            composite_failures: self.composite_failures.load(Ordering::Relaxed),
            source_failures: self.source_failures.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            mutations_committed: self.mutations_committed.load(Ordering::Relaxed),
            mutations_reverted: self.mutations_reverted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub composite_fetches: u64,
    pub composite_failures: u64,
    pub source_failures: u64,
    pub superseded: u64,
    pub anomalies: u64,
    pub mutations_committed: u64,
    pub mutations_reverted: u64,
}

/// Spawns a background task that periodically logs fetch and mutation counters.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "courseblock::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current = telemetry.snapshot();
                    if current == last_snapshot {
                        continue;
                    }

                    tracing::info!(
                        target: "courseblock::metrics",
                        composite_fetches = current.composite_fetches,
                        fetches_since_last = current
                            .composite_fetches
                            .saturating_sub(last_snapshot.composite_fetches),
                        composite_failures = current.composite_failures,
                        source_failures = current.source_failures,
                        superseded = current.superseded,
                        anomalies = current.anomalies,
                        mutations_committed = current.mutations_committed,
                        mutations_reverted = current.mutations_reverted,
                        "session metrics snapshot"
                    );

                    last_snapshot = current;
                }
            }
        }
    })
}
