//! Region-keyed graph cache: in-memory map plus an on-disk JSON copy.
//!
//! # Concurrency
//!
//! Lookups take a shared read lock.  On a miss the caller takes the
//! region's gate mutex and re-checks memory before loading, so within one
//! process a region is loaded at most once.  Across processes the disk copy
//! is written to a temporary file and renamed into place: two workers racing
//! on the same uncached region both produce a complete file and the last
//! rename wins.
//!
//! # Lookup order
//!
//! memory → disk copy → [`RegionSource`].  A corrupt disk copy is logged,
//! deleted and treated as a miss.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::{GraphData, NetworkResult, RegionSource, RoadGraph};

pub struct GraphCache<S: RegionSource> {
    source:   S,
    disk_dir: Option<PathBuf>,
    memory:   RwLock<FxHashMap<String, Arc<RoadGraph>>>,
    gates:    Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl<S: RegionSource> GraphCache<S> {
    /// Memory-only cache over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            disk_dir: None,
            memory:   RwLock::new(FxHashMap::default()),
            gates:    Mutex::new(FxHashMap::default()),
        }
    }

    /// Also persist loaded regions under `dir` as `<region>_graph.json`.
    pub fn with_disk_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.disk_dir = Some(dir.into());
        self
    }

    pub fn disk_dir(&self) -> Option<&Path> {
        self.disk_dir.as_deref()
    }

    /// The graph for `region`, loading it on first access.
    ///
    /// Returns `Ok(None)` if no source knows the region or the region's
    /// graph has no nodes.
    pub fn get(&self, region: &str) -> NetworkResult<Option<Arc<RoadGraph>>> {
        if let Some(g) = self.cached(region) {
            debug!("graph cache hit for region {region}");
            return Ok(Some(g));
        }

        let gate = self.gate(region);
        let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);

        // Another thread may have finished loading while we waited.
        if let Some(g) = self.cached(region) {
            return Ok(Some(g));
        }

        if let Some(g) = self.load_from_disk(region) {
            info!("loaded graph for region {region} from disk cache");
            return Ok(Some(self.insert(region, g)));
        }

        let Some(data) = self.source.load_region(region)? else {
            warn!("no graph available for region {region}");
            return Ok(None);
        };
        let graph = RoadGraph::from_data(&data)?;
        if graph.is_empty() {
            warn!("graph for region {region} has no nodes; not caching");
            return Ok(None);
        }
        self.write_to_disk(region, &data);
        info!(
            "built graph for region {region}: {} nodes, {} edges, {} stations",
            graph.node_count(),
            graph.edge_count(),
            graph.stations().len(),
        );
        Ok(Some(self.insert(region, graph)))
    }

    /// Regions currently held in memory, sorted.
    pub fn cached_regions(&self) -> Vec<String> {
        let memory = self.memory.read().unwrap_or_else(PoisonError::into_inner);
        let mut regions: Vec<String> = memory.keys().cloned().collect();
        regions.sort();
        regions
    }

    /// Drop `region` (or every region when `None`) from memory and disk.
    pub fn clear(&self, region: Option<&str>) -> NetworkResult<()> {
        let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
        match region {
            Some(r) => {
                memory.remove(r);
                if let Some(path) = self.disk_path(r) {
                    remove_if_present(&path)?;
                }
                info!("cleared graph cache for region {r}");
            }
            None => {
                memory.clear();
                if let Some(dir) = self.disk_dir.as_deref().filter(|d| d.exists()) {
                    for entry in fs::read_dir(dir)? {
                        let path = entry?.path();
                        let is_graph = path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.ends_with("_graph.json"));
                        if is_graph {
                            remove_if_present(&path)?;
                        }
                    }
                }
                info!("cleared all graph caches");
            }
        }
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn cached(&self, region: &str) -> Option<Arc<RoadGraph>> {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(region)
            .cloned()
    }

    fn insert(&self, region: &str, graph: RoadGraph) -> Arc<RoadGraph> {
        let graph = Arc::new(graph);
        self.memory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(region.to_string(), Arc::clone(&graph));
        graph
    }

    fn gate(&self, region: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(region.to_string()).or_default())
    }

    fn disk_path(&self, region: &str) -> Option<PathBuf> {
        self.disk_dir
            .as_ref()
            .map(|d| d.join(format!("{region}_graph.json")))
    }

    fn load_from_disk(&self, region: &str) -> Option<RoadGraph> {
        let path = self.disk_path(region).filter(|p| p.exists())?;
        let parsed = fs::read(&path)
            .map_err(crate::NetworkError::from)
            .and_then(|bytes| Ok(serde_json::from_slice::<GraphData>(&bytes)?))
            .and_then(|data| RoadGraph::from_data(&data));
        match parsed {
            Ok(g) if !g.is_empty() => Some(g),
            Ok(_) => None,
            Err(e) => {
                warn!("discarding corrupt graph cache {}: {e}", path.display());
                if let Err(e) = fs::remove_file(&path) {
                    warn!("could not remove {}: {e}", path.display());
                }
                None
            }
        }
    }

    fn write_to_disk(&self, region: &str, data: &GraphData) {
        let Some(path) = self.disk_path(region) else { return };
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .map_err(crate::NetworkError::from)
            .and_then(|_| Ok(serde_json::to_vec(data)?))
            .and_then(|bytes| Ok(fs::write(&tmp, bytes)?))
            .and_then(|_| Ok(fs::rename(&tmp, &path)?));
        if let Err(e) = written {
            warn!("failed to write graph cache {}: {e}", path.display());
            let _ = fs::remove_file(&tmp);
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
