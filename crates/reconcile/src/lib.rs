//! Marker reconciliation for the fleet map viewer.
//!
//! A [`Poller`] fetches snapshots from a [`fleet_source_core::SnapshotSource`],
//! a [`Reconciler`] mirrors them onto a [`MapSurface`], and the status line
//! goes to a [`StatusDisplay`].

mod poller;
mod reconciler;
mod registry;
mod status;
mod surface;

pub use poller::{CycleOutcome, PollConfig, Poller, SnapshotUnavailable, DEFAULT_POLL_INTERVAL};
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use registry::{MarkerRegistry, TaskMarkers};
pub use status::{dropoff_label, pickup_label, vehicle_label, StatusFormatter, WAITING_STATUS};
pub use surface::{MapSurface, MarkerStyle, StatusDisplay};
