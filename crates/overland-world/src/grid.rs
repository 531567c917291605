use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use overland_chunk::Chunk;
use overland_core::{CellCoord, ChunkCoord, TerrainTag};
use overland_overlay::{PlotKind, PlotStore};

use crate::config::WorldConfig;
use crate::entities::EntityRegistry;
use crate::runtime::GenWorker;

/// Errors surfaced by the fallible grid accessors. Queries never error; they
/// degrade to sentinels instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("chunk ({}, {}) lies outside the world envelope", .0.cx, .0.cy)]
    OutOfBounds(ChunkCoord),
    #[error("chunk ({}, {}) is not resident", .0.cx, .0.cy)]
    NotResident(ChunkCoord),
}

/// Result of asking for a world edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotOutcome {
    /// Stored and applied to the resident owning chunk.
    Applied,
    /// Stored; the owning chunk is not resident, so application waits for
    /// the replay on residency.
    Deferred,
    /// Out of bounds, or the edit itself was refused (occupied footprint).
    Rejected,
}

/// Resolution of the unified chunk request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkRequest {
    /// Available for synchronous query right now.
    Resident,
    /// Queued or in flight; poll again after `pump`.
    Pending,
    OutOfBounds,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QueuedLoad {
    coord: ChunkCoord,
    priority: u8,
    dist: i32,
}

impl Ord for QueuedLoad {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.dist.cmp(&other.dist))
            .then((self.coord.cx, self.coord.cy).cmp(&(other.coord.cx, other.coord.cy)))
    }
}

impl PartialOrd for QueuedLoad {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns the resident chunk cache, the streaming policy around the viewer,
/// the plot overlay, and the world query surface. Single-writer: all state
/// is mutated only through these methods on the caller's thread; generation
/// alone runs on the background worker.
pub struct WorldGrid {
    cfg: WorldConfig,
    chunks: HashMap<ChunkCoord, Chunk>,
    inflight: HashSet<ChunkCoord>,
    queued: HashSet<ChunkCoord>,
    queue: BinaryHeap<Reverse<QueuedLoad>>,
    center: ChunkCoord,
    plots: PlotStore,
    entities: EntityRegistry,
    terrain_rev: u64,
    worker: GenWorker,
}

impl WorldGrid {
    pub fn new(cfg: WorldConfig) -> Self {
        let worker = GenWorker::new(cfg.chunk_size, cfg.terrain.clone());
        Self {
            cfg,
            chunks: HashMap::new(),
            inflight: HashSet::new(),
            queued: HashSet::new(),
            queue: BinaryHeap::new(),
            center: ChunkCoord::new(0, 0),
            plots: PlotStore::new(),
            entities: EntityRegistry::default(),
            terrain_rev: 0,
            worker,
        }
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.cfg
    }

    #[inline]
    pub fn center_chunk(&self) -> ChunkCoord {
        self.center
    }

    #[inline]
    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    #[inline]
    pub fn entities_mut(&mut self) -> &mut EntityRegistry {
        &mut self.entities
    }

    #[inline]
    pub fn plots(&self) -> &PlotStore {
        &self.plots
    }

    /// Monotonic counter bumped by every accepted terrain edit; path caches
    /// key their validity off it.
    #[inline]
    pub fn terrain_rev(&self) -> u64 {
        self.terrain_rev
    }

    /// Synchronously generate the render-radius square around the current
    /// center. Initial population only; steady-state loading goes through
    /// the queue.
    pub fn bootstrap(&mut self) {
        let rr = self.cfg.render_radius;
        for dy in -rr..=rr {
            for dx in -rr..=rr {
                let _ = self.ensure_chunk(self.center.offset(dx, dy));
            }
        }
        log::info!(
            target: "stream",
            "bootstrapped {} chunks around {:?}",
            self.chunks.len(),
            self.center
        );
    }

    #[inline]
    fn chunk_of(&self, x: i32, y: i32) -> ChunkCoord {
        CellCoord::new(x, y).chunk(self.cfg.chunk_size)
    }

    /// Absolute envelope check for a cell position.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x.abs() <= self.cfg.world_extent && y.abs() <= self.cfg.world_extent
    }

    fn chunk_in_envelope(&self, coord: ChunkCoord) -> bool {
        let cs = self.cfg.chunk_size as i32;
        let min_c = (-self.cfg.world_extent).div_euclid(cs);
        let max_c = self.cfg.world_extent.div_euclid(cs);
        coord.cx >= min_c && coord.cx <= max_c && coord.cy >= min_c && coord.cy <= max_c
    }

    /// One shared materialize routine behind both the synchronous and the
    /// queued acquisition paths: generate, replay plots, install.
    fn materialize(&mut self, coord: ChunkCoord) {
        let mut chunk = Chunk::generate(coord, self.cfg.chunk_size, &self.cfg.terrain);
        let applied = self.plots.replay_onto(&mut chunk);
        if applied > 0 {
            log::debug!(target: "stream", "replayed {applied} plots onto {coord:?}");
        }
        self.queued.remove(&coord);
        self.chunks.insert(coord, chunk);
    }

    /// Blocking path for immediate needs (the cell under the viewer). Must
    /// not be used for bulk preloading.
    pub fn ensure_chunk(&mut self, coord: ChunkCoord) -> Result<&Chunk, WorldError> {
        if !self.chunk_in_envelope(coord) {
            return Err(WorldError::OutOfBounds(coord));
        }
        if !self.chunks.contains_key(&coord) {
            self.materialize(coord);
        }
        self.chunks.get(&coord).ok_or(WorldError::NotResident(coord))
    }

    /// Unified request path: resolves now when resident, otherwise enqueues
    /// (unless already pending) and reports `Pending`.
    pub fn request_chunk(&mut self, coord: ChunkCoord) -> ChunkRequest {
        if !self.chunk_in_envelope(coord) {
            return ChunkRequest::OutOfBounds;
        }
        if self.chunks.contains_key(&coord) {
            return ChunkRequest::Resident;
        }
        if !self.inflight.contains(&coord) && !self.queued.contains(&coord) {
            self.enqueue(coord);
            self.submit_next();
        }
        ChunkRequest::Pending
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    fn enqueue(&mut self, coord: ChunkCoord) {
        let priority = if coord.chebyshev(self.center) <= self.cfg.render_radius {
            1
        } else {
            2
        };
        let dist = coord.manhattan(self.center);
        self.queued.insert(coord);
        self.queue.push(Reverse(QueuedLoad {
            coord,
            priority,
            dist,
        }));
    }

    /// Viewer moved. No-op while the viewer chunk is unchanged; otherwise
    /// evict everything outside the preload square immediately and queue the
    /// missing coordinates by (priority, distance).
    pub fn update_viewer(&mut self, x: i32, y: i32) {
        self.entities.set_viewer(CellCoord::new(x, y));
        let new_center = self.chunk_of(x, y);
        if new_center == self.center {
            return;
        }
        log::info!(
            target: "stream",
            "viewer chunk {:?} -> {:?}",
            self.center,
            new_center
        );
        self.center = new_center;
        let pr = self.cfg.preload_radius();

        let before = self.chunks.len();
        let center = self.center;
        self.chunks
            .retain(|coord, _| coord.chebyshev(center) <= pr);
        let evicted = before - self.chunks.len();
        if evicted > 0 {
            log::debug!(target: "stream", "evicted {evicted} chunks");
        }

        for dy in -pr..=pr {
            for dx in -pr..=pr {
                let coord = center.offset(dx, dy);
                if !self.chunk_in_envelope(coord) {
                    continue;
                }
                if self.chunks.contains_key(&coord)
                    || self.inflight.contains(&coord)
                    || self.queued.contains(&coord)
                {
                    continue;
                }
                self.enqueue(coord);
            }
        }
        self.submit_next();
    }

    /// Drain completed generations and feed the worker the next coordinate.
    /// Call from the consumer's tick loop. Returns the number of chunks
    /// installed.
    pub fn pump(&mut self) -> usize {
        let pr = self.cfg.preload_radius();
        let mut installed = 0;
        for out in self.worker.drain() {
            self.inflight.remove(&out.coord);
            if self.chunks.contains_key(&out.coord) {
                // The synchronous path won the race; keep the resident copy.
                log::debug!(target: "stream", "{:?} already resident", out.coord);
            } else if out.coord.chebyshev(self.center) <= pr {
                let mut chunk = out.chunk;
                let applied = self.plots.replay_onto(&mut chunk);
                if applied > 0 {
                    log::debug!(
                        target: "stream",
                        "replayed {applied} plots onto {:?}",
                        out.coord
                    );
                }
                self.chunks.insert(out.coord, chunk);
                installed += 1;
            } else {
                // Viewer moved on while this generated; discard, don't retry.
                log::debug!(target: "stream", "discarding stale chunk {:?}", out.coord);
            }
        }
        self.submit_next();
        installed
    }

    /// True once nothing is queued or in flight.
    pub fn is_streaming_idle(&self) -> bool {
        self.inflight.is_empty() && self.queue.is_empty()
    }

    pub fn queue_debug_counts(&self) -> (usize, usize, usize) {
        (self.chunks.len(), self.inflight.len(), self.queue.len())
    }

    #[inline]
    pub fn resident_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn resident_coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    #[inline]
    pub fn is_resident(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    #[inline]
    pub fn is_inflight(&self, coord: ChunkCoord) -> bool {
        self.inflight.contains(&coord)
    }

    #[inline]
    pub fn is_queued(&self, coord: ChunkCoord) -> bool {
        self.queued.contains(&coord)
    }

    fn submit_next(&mut self) {
        // One generation outstanding at a time; the gap between submissions
        // is the inter-item yield that keeps the caller responsive.
        if !self.inflight.is_empty() {
            return;
        }
        while let Some(Reverse(item)) = self.queue.pop() {
            self.queued.remove(&item.coord);
            if self.chunks.contains_key(&item.coord) {
                continue;
            }
            if item.coord.chebyshev(self.center) > self.cfg.preload_radius() {
                // Stale entry from a previous center.
                continue;
            }
            if self.worker.submit(item.coord) {
                self.inflight.insert(item.coord);
            } else {
                log::error!(
                    target: "stream",
                    "generation worker unavailable; dropping {:?}",
                    item.coord
                );
            }
            return;
        }
    }

    /// Terrain tag at an absolute position, or the `Loading` sentinel while
    /// the owning chunk is absent or in flight. Never errors.
    pub fn cell_at(&self, x: i32, y: i32) -> TerrainTag {
        let coord = self.chunk_of(x, y);
        match self.chunks.get(&coord) {
            Some(chunk) => {
                let (lx, ly) = CellCoord::new(x, y).local(self.cfg.chunk_size);
                chunk.get_local(lx, ly)
            }
            None => TerrainTag::Loading,
        }
    }

    #[inline]
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.cell_at(x, y).is_solid()
    }

    /// Inside the envelope, owning chunk resident, local coordinates in
    /// range. Degrades to `false` rather than erroring.
    pub fn is_valid_position(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let coord = self.chunk_of(x, y);
        let Some(chunk) = self.chunks.get(&coord) else {
            return false;
        };
        let (lx, ly) = CellCoord::new(x, y).local(self.cfg.chunk_size);
        chunk.is_valid_local(lx as i32, ly as i32)
    }

    /// Create or overwrite a durable world edit, applying it immediately
    /// when the owning chunk is resident.
    pub fn plot_item(&mut self, x: i32, y: i32, kind: PlotKind) -> PlotOutcome {
        if !self.in_bounds(x, y) {
            log::warn!(target: "plot", "plot at ({x}, {y}) outside world envelope");
            return PlotOutcome::Rejected;
        }
        let at = CellCoord::new(x, y);
        self.plots.insert(at, kind);
        let coord = at.chunk(self.cfg.chunk_size);
        match self.chunks.get_mut(&coord) {
            Some(chunk) => {
                if self.plots.apply_to(chunk, at) {
                    self.terrain_rev += 1;
                    PlotOutcome::Applied
                } else {
                    // Stored but refused by the chunk (e.g. occupied
                    // footprint); it will retry on the next regeneration.
                    PlotOutcome::Rejected
                }
            }
            None => {
                log::debug!(target: "plot", "plot at ({x}, {y}) deferred until residency");
                PlotOutcome::Deferred
            }
        }
    }
}
