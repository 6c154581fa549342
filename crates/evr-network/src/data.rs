//! Plain serializable records describing a region's graph.
//!
//! `GraphData` is the interchange format between region sources, the disk
//! cache and [`RoadGraph::from_data`](crate::RoadGraph::from_data).

use serde::{Deserialize, Serialize};

use crate::ChargingStation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id:  String,
    pub lat: f64,
    pub lon: f64,
}

/// An undirected road segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from:      String,
    pub to:        String,
    pub weight_km: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes:    Vec<NodeRecord>,
    pub edges:    Vec<EdgeRecord>,
    #[serde(default)]
    pub stations: Vec<ChargingStation>,
}

impl GraphData {
    pub fn node(&mut self, id: &str, lat: f64, lon: f64) -> &mut Self {
        self.nodes.push(NodeRecord { id: id.to_string(), lat, lon });
        self
    }

    pub fn edge(&mut self, from: &str, to: &str, weight_km: f64) -> &mut Self {
        self.edges.push(EdgeRecord {
            from: from.to_string(),
            to: to.to_string(),
            weight_km,
        });
        self
    }

    pub fn station(&mut self, station: ChargingStation) -> &mut Self {
        self.stations.push(station);
        self
    }
}
