use model::{Snapshot, Task};
use tracing::{debug, info};

use crate::registry::{MarkerRegistry, TaskMarkers, VehicleMarker};
use crate::status::{dropoff_label, pickup_label, vehicle_label};
use crate::surface::{MapSurface, MarkerStyle};

#[derive(Clone, Debug, Default)]
pub struct ReconcilerConfig {
    /// Remove a vehicle marker once its id has been missing from this many
    /// consecutive snapshots. `None` keeps markers for the whole session.
    /// `Some(0)` behaves like `Some(1)`.
    pub evict_after: Option<u32>,
}

/// Keeps the markers on a [`MapSurface`] in line with the latest snapshot,
/// moving existing markers instead of recreating them.
pub struct Reconciler<M: MapSurface> {
    surface: M,
    registry: MarkerRegistry<M::Handle>,
    cfg: ReconcilerConfig,
}

impl<M: MapSurface> Reconciler<M> {
    pub fn new(surface: M, cfg: ReconcilerConfig) -> Self {
        Self { surface, registry: MarkerRegistry::new(), cfg }
    }

    pub fn apply(&mut self, snap: &Snapshot) {
        self.sync_vehicles(snap);
        self.evict_missing(snap);
        self.sync_task(snap.task.as_ref());
    }

    pub fn present(&mut self) -> anyhow::Result<()> {
        self.surface.present()
    }

    pub fn registry(&self) -> &MarkerRegistry<M::Handle> {
        &self.registry
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    fn sync_vehicles(&mut self, snap: &Snapshot) {
        for (id, v) in &snap.vehicles {
            let label = vehicle_label(id, v);
            match self.registry.vehicles.get_mut(id) {
                Some(marker) => {
                    marker.missed = 0;
                    self.surface.move_marker(&marker.handle, v.position());
                    self.surface.set_popup(&marker.handle, &label);
                }
                None => {
                    let handle = self.surface.create_marker(v.position(), MarkerStyle::Vehicle);
                    self.surface.set_popup(&handle, &label);
                    debug!(vehicle = %id, lat = v.lat, lon = v.lon, "vehicle marker created");
                    self.registry.vehicles.insert(id.clone(), VehicleMarker::new(handle));
                }
            }
        }
    }

    fn evict_missing(&mut self, snap: &Snapshot) {
        let Some(limit) = self.cfg.evict_after else { return };
        let limit = limit.max(1);

        let mut gone = Vec::new();
        for (id, marker) in self.registry.vehicles.iter_mut() {
            if snap.vehicles.contains_key(id) {
                continue;
            }
            marker.missed += 1;
            if marker.missed >= limit {
                gone.push(id.clone());
            }
        }
        for id in gone {
            if let Some(marker) = self.registry.vehicles.remove(&id) {
                self.surface.remove_marker(marker.handle);
                info!(vehicle = %id, missed = limit, "stale vehicle marker evicted");
            }
        }
    }

    fn sync_task(&mut self, task: Option<&Task>) {
        let Some(task) = task else {
            if let Some(old) = self.registry.task.take() {
                self.surface.remove_marker(old.pickup);
                self.surface.remove_marker(old.dropoff);
                debug!("task markers cleared");
            }
            return;
        };

        let markers = match self.registry.task.take() {
            Some(m) => {
                self.surface.move_marker(&m.pickup, task.pickup);
                self.surface.move_marker(&m.dropoff, task.dropoff);
                m
            }
            None => {
                debug!(task = %task.task_id, "task markers created");
                TaskMarkers {
                    pickup: self.surface.create_marker(task.pickup, MarkerStyle::Pickup),
                    dropoff: self.surface.create_marker(task.dropoff, MarkerStyle::Dropoff),
                }
            }
        };
        self.surface.set_popup(&markers.pickup, &pickup_label(&task.task_id));
        self.surface.set_popup(&markers.dropoff, &dropoff_label(&task.task_id));
        self.registry.task = Some(markers);
    }
}
