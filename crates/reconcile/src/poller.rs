//! The poll-reconcile loop.
//!
//! Each cycle fetches the snapshot, updates the status line and the markers,
//! then the loop sleeps for the full interval before starting the next one.
//! Cycles never overlap and failures never stop the loop.

use std::time::Duration;

use fleet_source_core::{SnapshotSource, SourceError};
use model::Snapshot;
use tracing::{debug, info, trace, warn};

use crate::reconciler::Reconciler;
use crate::status::{StatusFormatter, WAITING_STATUS};
use crate::surface::{MapSurface, StatusDisplay};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL }
    }
}

/// The one failure a cycle distinguishes. Both causes are handled the same way.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotUnavailable {
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Rendered { vehicles: usize },
    Waiting,
}

pub struct Poller<S, M: MapSurface, D> {
    source: S,
    reconciler: Reconciler<M>,
    status: D,
    formatter: StatusFormatter,
    cfg: PollConfig,
    waiting: Option<bool>,
}

impl<S, M, D> Poller<S, M, D>
where
    S: SnapshotSource,
    M: MapSurface,
    D: StatusDisplay,
{
    pub fn new(source: S, reconciler: Reconciler<M>, status: D, formatter: StatusFormatter, cfg: PollConfig) -> Self {
        Self { source, reconciler, status, formatter, cfg, waiting: None }
    }

    async fn load(&self) -> Result<Snapshot, SnapshotUnavailable> {
        let body = self.source.fetch().await?;
        Ok(Snapshot::from_slice(&body)?)
    }

    /// One fetch-reconcile cycle. Never fails; an unavailable snapshot only
    /// changes the status line.
    pub async fn tick(&mut self) -> CycleOutcome {
        let snap = match self.load().await {
            Ok(snap) => snap,
            Err(err) => {
                if self.waiting != Some(true) {
                    warn!(source = %self.source.describe(), error = %err, "snapshot unavailable, waiting for data");
                } else {
                    trace!(error = %err, "still waiting");
                }
                self.waiting = Some(true);
                self.status.set_status(WAITING_STATUS);
                return CycleOutcome::Waiting;
            }
        };

        let vehicles = snap.vehicle_count();
        if self.waiting != Some(false) {
            info!(source = %self.source.describe(), vehicles, "snapshot available");
        }
        self.waiting = Some(false);

        self.status.set_status(&self.formatter.format(&snap));
        self.reconciler.apply(&snap);
        if let Err(err) = self.reconciler.present() {
            warn!(error = %format!("{err:#}"), "presenting markers failed");
        }
        debug!(vehicles, task = snap.task.is_some(), "snapshot reconciled");
        CycleOutcome::Rendered { vehicles }
    }

    /// Tick forever, sleeping the configured interval after every cycle.
    pub async fn run(mut self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.cfg.interval).await;
        }
    }

    pub fn reconciler(&self) -> &Reconciler<M> {
        &self.reconciler
    }

    pub fn status(&self) -> &D {
        &self.status
    }
}
