//! GeoJSON marker layer: a [`MapSurface`] that keeps markers in memory and
//! can write them out as a FeatureCollection for any GeoJSON-aware map.

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::{Path, PathBuf}};
use serde_json::{json, Value};
use uuid::Uuid;
use model::Point;
use reconcile::{MapSurface, MarkerStyle};

struct Feature {
    seq: u64,
    at: Point,
    style: MarkerStyle,
    popup: String,
}

#[derive(Default)]
pub struct GeoJsonLayer {
    features: HashMap<Uuid, Feature>,
    seq: u64,
    out: Option<PathBuf>,
    dirty: bool,
}

impl GeoJsonLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer that rewrites `path` on every `present` that follows a change.
    pub fn with_output(path: impl Into<PathBuf>) -> Self {
        Self { out: Some(path.into()), ..Self::default() }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in creation order. Coordinates are `[lon, lat]` per RFC 7946.
    pub fn to_geojson(&self) -> Value {
        let mut ordered: Vec<(&Uuid, &Feature)> = self.features.iter().collect();
        ordered.sort_by_key(|(_, f)| f.seq);
        let features: Vec<Value> = ordered
            .into_iter()
            .map(|(id, f)| json!({
                "type": "Feature",
                "id": id.to_string(),
                "geometry": { "type": "Point", "coordinates": [f.at.lon, f.at.lat] },
                "properties": { "kind": f.style.label(), "popup": f.popup }
            }))
            .collect();
        json!({ "type": "FeatureCollection", "features": features })
    }

    /// Write via a temp file in the same directory and rename over `path`,
    /// so readers never see a partial document.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(&self.to_geojson())?;
        let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("markers.geojson");
        let tmp = dir.join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));
        let written = fs::write(&tmp, &body)
            .with_context(|| format!("write {}", tmp.display()))
            .and_then(|_| fs::rename(&tmp, path).with_context(|| format!("rename onto {}", path.display())));
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }
}

impl MapSurface for GeoJsonLayer {
    type Handle = Uuid;

    fn create_marker(&mut self, at: Point, style: MarkerStyle) -> Uuid {
        let id = Uuid::new_v4();
        self.seq += 1;
        self.features.insert(id, Feature { seq: self.seq, at, style, popup: String::new() });
        self.dirty = true;
        tracing::trace!(%id, kind = style.label(), lat = at.lat, lon = at.lon, "marker created");
        id
    }

    fn move_marker(&mut self, handle: &Uuid, at: Point) {
        if let Some(f) = self.features.get_mut(handle) {
            if f.at != at {
                f.at = at;
                self.dirty = true;
            }
        }
    }

    fn set_popup(&mut self, handle: &Uuid, text: &str) {
        if let Some(f) = self.features.get_mut(handle) {
            if f.popup != text {
                f.popup = text.to_string();
                self.dirty = true;
            }
        }
    }

    fn remove_marker(&mut self, handle: Uuid) {
        if self.features.remove(&handle).is_some() {
            self.dirty = true;
            tracing::trace!(id = %handle, "marker removed");
        }
    }

    fn present(&mut self) -> Result<()> {
        let Some(path) = &self.out else { return Ok(()) };
        if !self.dirty {
            return Ok(());
        }
        self.write_to(path)?;
        self.dirty = false;
        Ok(())
    }
}
