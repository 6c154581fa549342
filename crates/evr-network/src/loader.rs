//! CSV region loader.
//!
//! # Directory layout
//!
//! ```text
//! <root>/<region>/nodes.csv      id,lat,lon
//! <root>/<region>/edges.csv      from,to,weight_km
//! <root>/<region>/stations.csv   id,lat,lon,power_class,power_kw   (optional)
//! ```
//!
//! `power_class` is one of `standard`, `fast`, `ultra_fast`.  Edges are
//! undirected.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::{ChargingStation, EdgeRecord, GraphData, NetworkResult, NodeRecord, RegionSource};

/// Load `nodes.csv`, `edges.csv` and (if present) `stations.csv` from `dir`.
pub fn load_graph_dir(dir: &Path) -> NetworkResult<GraphData> {
    let stations = dir.join("stations.csv");
    let stations = if stations.exists() { Some(File::open(stations)?) } else { None };
    load_graph_readers(
        File::open(dir.join("nodes.csv"))?,
        File::open(dir.join("edges.csv"))?,
        stations,
    )
}

/// Like [`load_graph_dir`] but accepts any `Read` sources.
pub fn load_graph_readers<N: Read, E: Read, S: Read>(
    nodes:    N,
    edges:    E,
    stations: Option<S>,
) -> NetworkResult<GraphData> {
    Ok(GraphData {
        nodes:    read_rows::<NodeRecord, _>(nodes)?,
        edges:    read_rows::<EdgeRecord, _>(edges)?,
        stations: match stations {
            Some(r) => read_rows::<ChargingStation, _>(r)?,
            None => Vec::new(),
        },
    })
}

fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> NetworkResult<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize::<T>() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Serves regions from `<root>/<region>/*.csv`.  A region without a
/// `nodes.csv` is unknown to this source.
#[derive(Debug, Clone)]
pub struct CsvRegionSource {
    root: PathBuf,
}

impl CsvRegionSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RegionSource for CsvRegionSource {
    fn load_region(&self, region: &str) -> NetworkResult<Option<GraphData>> {
        let dir = self.root.join(region);
        if !dir.join("nodes.csv").exists() {
            return Ok(None);
        }
        load_graph_dir(&dir).map(Some)
    }
}
