//! Road graph representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! Roads are undirected: every segment is stored as two directed edges.
//! Nodes keep their external string names; the search only ever touches the
//! dense `NodeId` indices and resolves names at the boundary.

use rustc_hash::FxHashMap;

use evr_core::{EdgeId, GeoPoint, NodeId, StationId};

use crate::{ChargingStation, GraphData, NetworkError, NetworkResult, StationRegistry};

// ── RoadGraph ─────────────────────────────────────────────────────────────────

/// Static weighted graph plus the charging stations of its region.
///
/// Do not construct directly; use [`RoadGraphBuilder`] or
/// [`RoadGraph::from_data`].
pub struct RoadGraph {
    // ── Node data ─────────────────────────────────────────────────────────
    /// External identifier of each node.  Indexed by `NodeId`.
    pub node_name: Vec<String>,

    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    /// Source node of each edge.
    pub edge_from: Vec<NodeId>,

    /// Destination node of each edge.
    pub edge_to: Vec<NodeId>,

    /// Edge weight in kilometres.
    pub edge_weight_km: Vec<f64>,

    by_name:      FxHashMap<String, NodeId>,
    stations:     StationRegistry,
    /// Graph node sharing each station's identifier, if any.
    station_node: Vec<Option<NodeId>>,
}

impl RoadGraph {
    /// A graph with no nodes, edges or stations.
    pub fn empty() -> Self {
        Self {
            node_name:      Vec::new(),
            node_pos:       Vec::new(),
            node_out_start: vec![0],
            edge_from:      Vec::new(),
            edge_to:        Vec::new(),
            edge_weight_km: Vec::new(),
            by_name:        FxHashMap::default(),
            stations:       StationRegistry::empty(),
            station_node:   Vec::new(),
        }
    }

    /// Build a graph from serialized records.
    ///
    /// Fails on duplicate node or station ids, on edges naming unknown nodes,
    /// and on negative or non-finite weights.
    pub fn from_data(data: &GraphData) -> NetworkResult<Self> {
        let mut b = RoadGraphBuilder::with_capacity(data.nodes.len(), data.edges.len() * 2);
        for n in &data.nodes {
            b.add_node(&n.id, GeoPoint::new(n.lat, n.lon))?;
        }
        for e in &data.edges {
            let from = b.node_id(&e.from)
                .ok_or_else(|| NetworkError::UnknownNode(e.from.clone()))?;
            let to = b.node_id(&e.to)
                .ok_or_else(|| NetworkError::UnknownNode(e.to.clone()))?;
            b.add_road(from, to, e.weight_km)?;
        }
        b.stations(data.stations.clone());
        b.build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn name(&self, node: NodeId) -> &str {
        &self.node_name[node.index()]
    }

    #[inline]
    pub fn pos(&self, node: NodeId) -> GeoPoint {
        self.node_pos[node.index()]
    }

    /// Node names in insertion order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.node_name.iter().map(String::as_str)
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    #[inline]
    pub fn edge_target(&self, edge: EdgeId) -> NodeId {
        self.edge_to[edge.index()]
    }

    #[inline]
    pub fn edge_weight(&self, edge: EdgeId) -> f64 {
        self.edge_weight_km[edge.index()]
    }

    // ── Charging stations ─────────────────────────────────────────────────

    pub fn stations(&self) -> &StationRegistry {
        &self.stations
    }

    /// The graph node that shares `station`'s identifier, if any.
    #[inline]
    pub fn station_node(&self, station: StationId) -> Option<NodeId> {
        self.station_node[station.index()]
    }
}

// ── RoadGraphBuilder ──────────────────────────────────────────────────────────

/// Construct a [`RoadGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use evr_core::GeoPoint;
/// use evr_network::RoadGraphBuilder;
///
/// let mut b = RoadGraphBuilder::new();
/// let p = b.add_node("P", GeoPoint::new(52.37, 4.89)).unwrap();
/// let q = b.add_node("Q", GeoPoint::new(52.38, 4.90)).unwrap();
/// b.add_road(p, q, 3.0).unwrap();
/// let g = b.build().unwrap();
/// assert_eq!(g.node_count(), 2);
/// assert_eq!(g.edge_count(), 2); // bidirectional
/// ```
pub struct RoadGraphBuilder {
    names:     Vec<String>,
    positions: Vec<GeoPoint>,
    by_name:   FxHashMap<String, NodeId>,
    raw_edges: Vec<RawEdge>,
    stations:  Vec<ChargingStation>,
}

struct RawEdge {
    from:      NodeId,
    to:        NodeId,
    weight_km: f64,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            names:     Vec::with_capacity(nodes),
            positions: Vec::with_capacity(nodes),
            by_name:   FxHashMap::default(),
            raw_edges: Vec::with_capacity(edges),
            stations:  Vec::new(),
        }
    }

    /// Add a named node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, name: &str, pos: GeoPoint) -> NetworkResult<NodeId> {
        if self.by_name.contains_key(name) {
            return Err(NetworkError::DuplicateNode(name.to_string()));
        }
        let id = NodeId::try_from(self.names.len())
            .map_err(|e| NetworkError::Parse(format!("too many nodes: {e}")))?;
        self.names.push(name.to_string());
        self.positions.push(pos);
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Add a **directed** edge from `from` to `to`.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, weight_km: f64) -> NetworkResult<()> {
        if !weight_km.is_finite() || weight_km < 0.0 {
            return Err(NetworkError::InvalidWeight {
                from:   self.names[from.index()].clone(),
                to:     self.names[to.index()].clone(),
                weight: weight_km,
            });
        }
        self.raw_edges.push(RawEdge { from, to, weight_km });
        Ok(())
    }

    /// Add edges in **both directions** for an undirected road segment.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, weight_km: f64) -> NetworkResult<()> {
        self.add_directed_edge(a, b, weight_km)?;
        self.add_directed_edge(b, a, weight_km)
    }

    /// Attach the charging stations of this region.
    pub fn stations(&mut self, stations: Vec<ChargingStation>) -> &mut Self {
        self.stations = stations;
        self
    }

    pub fn node_count(&self) -> usize { self.names.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`RoadGraph`].
    ///
    /// Edges are sorted by source node with a stable sort, so each node's
    /// neighbours keep their insertion order.
    pub fn build(self) -> NetworkResult<RoadGraph> {
        let node_count = self.names.len();
        let edge_count = self.raw_edges.len();

        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);

        let edge_from:      Vec<NodeId> = raw.iter().map(|e| e.from).collect();
        let edge_to:        Vec<NodeId> = raw.iter().map(|e| e.to).collect();
        let edge_weight_km: Vec<f64>    = raw.iter().map(|e| e.weight_km).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let station_node = self
            .stations
            .iter()
            .map(|s| self.by_name.get(&s.id).copied())
            .collect();
        let stations = StationRegistry::new(self.stations)?;

        Ok(RoadGraph {
            node_name: self.names,
            node_pos:  self.positions,
            node_out_start,
            edge_from,
            edge_to,
            edge_weight_km,
            by_name: self.by_name,
            stations,
            station_node,
        })
    }
}

impl Default for RoadGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
