use std::collections::HashMap;

pub(crate) struct VehicleMarker<H> {
    pub(crate) handle: H,
    // consecutive parsed snapshots without this id
    pub(crate) missed: u32,
}

impl<H> VehicleMarker<H> {
    pub(crate) fn new(handle: H) -> Self {
        Self { handle, missed: 0 }
    }
}

/// Pickup and dropoff always exist together.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskMarkers<H> {
    pub pickup: H,
    pub dropoff: H,
}

/// Marker handles currently owned by the reconciler.
pub struct MarkerRegistry<H> {
    pub(crate) vehicles: HashMap<String, VehicleMarker<H>>,
    pub(crate) task: Option<TaskMarkers<H>>,
}

impl<H> Default for MarkerRegistry<H> {
    fn default() -> Self {
        Self { vehicles: HashMap::new(), task: None }
    }
}

impl<H> MarkerRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vehicle(&self, id: &str) -> Option<&H> {
        self.vehicles.get(id).map(|m| &m.handle)
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn vehicle_ids(&self) -> impl Iterator<Item = &str> {
        self.vehicles.keys().map(String::as_str)
    }

    pub fn task(&self) -> Option<&TaskMarkers<H>> {
        self.task.as_ref()
    }

    /// Either 0 or 2.
    pub fn task_handle_count(&self) -> usize {
        if self.task.is_some() { 2 } else { 0 }
    }
}
