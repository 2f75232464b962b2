//! Status line and popup text.

use model::{Snapshot, VehicleState};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Shown whenever the snapshot cannot be fetched or parsed.
pub const WAITING_STATUS: &str = "waiting for state.json...";

#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter {
    offset: UtcOffset,
}

impl Default for StatusFormatter {
    fn default() -> Self {
        Self::utc()
    }
}

impl StatusFormatter {
    pub fn utc() -> Self {
        Self { offset: UtcOffset::UTC }
    }

    /// Format times at `offset`. Resolve the local offset before any
    /// threads are spawned and pass it in here.
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }

    pub fn format(&self, snap: &Snapshot) -> String {
        format!("vehicles: {} | last update: {}", snap.vehicle_count(), self.clock(snap.ts))
    }

    /// `HH:MM:SS` for unix seconds. Values that are not finite or not
    /// representable fall back to the epoch.
    pub fn clock(&self, ts: f64) -> String {
        let at = if ts.is_finite() {
            OffsetDateTime::from_unix_timestamp_nanos((ts * 1e9) as i128).ok()
        } else {
            None
        };
        at.unwrap_or(OffsetDateTime::UNIX_EPOCH)
            .to_offset(self.offset)
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default()
    }
}

pub fn vehicle_label(id: &str, v: &VehicleState) -> String {
    format!(
        "{id}\n x={}, y={}\n {}",
        coord(v.x),
        coord(v.y),
        if v.busy { "BUSY" } else { "FREE" }
    )
}

pub fn pickup_label(task_id: &str) -> String {
    format!("PICKUP {task_id}")
}

pub fn dropoff_label(task_id: &str) -> String {
    format!("DROPOFF {task_id}")
}

fn coord(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.1}"),
        None => "-".into(),
    }
}
