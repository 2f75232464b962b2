//! Snapshot document polled by the viewer.
//!
//! Decoding is lenient in the same places the snapshot producer is loose:
//! `updated_ts` stands in for `ts`, `vehicles` may be a list keyed by `jid`,
//! points may be `[lat, lon]` pairs.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(from = "RawPoint")]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Obj { lat: f64, lon: f64 },
    Pair([f64; 2]),
}

impl From<RawPoint> for Point {
    fn from(raw: RawPoint) -> Self {
        match raw {
            RawPoint::Obj { lat, lon } => Point { lat, lon },
            RawPoint::Pair([lat, lon]) => Point { lat, lon },
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct VehicleState {
    pub lat: f64,
    pub lon: f64,
    // planar sim coordinates, the producer does not always write them
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub busy: bool,
}

impl VehicleState {
    pub fn position(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Task {
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,
    pub pickup: Point,
    pub dropoff: Point,
}

/// One polled document. Missing `ts` decodes as epoch 0, missing
/// `vehicles` as an empty map, missing or null `task` as no task.
/// The top level must be a JSON object.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(try_from = "Map<String, Value>")]
pub struct Snapshot {
    pub ts: f64,
    pub vehicles: BTreeMap<String, VehicleState>,
    pub task: Option<Task>,
}

impl Snapshot {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    ts: Option<f64>,
    #[serde(default)]
    updated_ts: Option<f64>,
    #[serde(default)]
    vehicles: Option<RawVehicles>,
    #[serde(default)]
    task: Option<Task>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVehicles {
    ById(BTreeMap<String, VehicleState>),
    Listed(Vec<ListedVehicle>),
}

#[derive(Deserialize)]
struct ListedVehicle {
    #[serde(default)]
    jid: Option<String>,
    #[serde(flatten)]
    state: VehicleState,
}

impl TryFrom<Map<String, Value>> for Snapshot {
    type Error = serde_json::Error;

    // going through a map keeps serde from matching fields by position
    fn try_from(doc: Map<String, Value>) -> Result<Self, Self::Error> {
        serde_json::from_value::<RawSnapshot>(Value::Object(doc)).map(Snapshot::from)
    }
}

impl From<RawSnapshot> for Snapshot {
    fn from(raw: RawSnapshot) -> Self {
        let vehicles = match raw.vehicles {
            None => BTreeMap::new(),
            Some(RawVehicles::ById(map)) => map,
            Some(RawVehicles::Listed(list)) => list
                .into_iter()
                .filter_map(|v| v.jid.map(|jid| (jid, v.state)))
                .collect(),
        };
        Snapshot {
            ts: raw.ts.or(raw.updated_ts).unwrap_or(0.0),
            vehicles,
            task: raw.task,
        }
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(d)?.unwrap_or(false))
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Id::deserialize(d)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
