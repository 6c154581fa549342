//! Charging-station registry with an R-tree for radius queries.
//!
//! The R-tree stores `[lat, lon]` points.  A radius query first selects the
//! degree box that encloses the circle, then applies the exact haversine
//! check, so the result is independent of projection error.

use rstar::{AABB, RTree, RTreeObject};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use evr_core::{GeoPoint, PowerClass, StationId};

use crate::{NetworkError, NetworkResult};

// ── ChargingStation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingStation {
    pub id:          String,
    pub lat:         f64,
    pub lon:         f64,
    pub power_class: PowerClass,
    pub power_kw:    f64,
}

impl ChargingStation {
    pub fn new(id: &str, lat: f64, lon: f64, power_class: PowerClass, power_kw: f64) -> Self {
        Self { id: id.to_string(), lat, lon, power_class, power_kw }
    }

    #[inline]
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct StationEntry {
    point: [f64; 2], // [lat, lon]
    id:    StationId,
}

impl RTreeObject for StationEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

// ── StationRegistry ───────────────────────────────────────────────────────────

pub struct StationRegistry {
    stations: Vec<ChargingStation>,
    by_name:  FxHashMap<String, StationId>,
    index:    RTree<StationEntry>,
}

impl StationRegistry {
    /// Index `stations`.  `StationId`s follow the input order.
    pub fn new(stations: Vec<ChargingStation>) -> NetworkResult<Self> {
        let mut by_name = FxHashMap::default();
        let mut entries = Vec::with_capacity(stations.len());
        for (i, s) in stations.iter().enumerate() {
            let id = StationId::try_from(i)
                .map_err(|e| NetworkError::Parse(format!("too many stations: {e}")))?;
            if by_name.insert(s.id.clone(), id).is_some() {
                return Err(NetworkError::DuplicateStation(s.id.clone()));
            }
            entries.push(StationEntry { point: [s.lat, s.lon], id });
        }
        Ok(Self {
            stations,
            by_name,
            index: RTree::bulk_load(entries),
        })
    }

    pub fn empty() -> Self {
        Self {
            stations: Vec::new(),
            by_name:  FxHashMap::default(),
            index:    RTree::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    #[inline]
    pub fn get(&self, id: StationId) -> &ChargingStation {
        &self.stations[id.index()]
    }

    pub fn find(&self, name: &str) -> Option<StationId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChargingStation> + '_ {
        self.stations.iter()
    }

    /// Stations within `radius_km` great-circle distance of `center`, with
    /// their distance, in registry order.
    ///
    /// A search box that crosses ±180° longitude is split in two.
    pub fn within(&self, center: GeoPoint, radius_km: f64) -> Vec<(StationId, f64)> {
        let (dlat, dlon) = center.degree_box(radius_km);
        let (lat_lo, lat_hi) = (center.lat - dlat, center.lat + dlat);
        let (lon_lo, lon_hi) = (center.lon - dlon, center.lon + dlon);

        let mut spans = vec![(lon_lo.max(-180.0), lon_hi.min(180.0))];
        if lon_lo < -180.0 {
            spans.push((lon_lo + 360.0, 180.0));
        }
        if lon_hi > 180.0 {
            spans.push((-180.0, lon_hi - 360.0));
        }

        let mut found: Vec<(StationId, f64)> = Vec::new();
        for (lo, hi) in spans {
            let envelope = AABB::from_corners([lat_lo, lo], [lat_hi, hi]);
            found.extend(self.index.locate_in_envelope(&envelope).filter_map(|e| {
                let d = center.distance_km(self.get(e.id).location());
                (d <= radius_km).then_some((e.id, d))
            }));
        }
        found.sort_unstable_by_key(|(id, _)| *id);
        found.dedup_by_key(|(id, _)| *id);
        found
    }
}
