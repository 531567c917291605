//! Persistent world plots, replayed onto regenerated chunks.
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use overland_chunk::Chunk;
use overland_core::{CellCoord, StructureKind, TerrainTag};
use serde::{Deserialize, Serialize};

/// A durable point or area edit. Chunks are a volatile derived cache; plots
/// are the source of truth that outlives chunk eviction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlotKind {
    /// Delegates to the chunk's structure placement at the plot cell.
    Structure(StructureKind),
    /// Overwrites the square neighborhood of `radius` around the plot cell,
    /// clipped to the owning chunk's bounds.
    Biome { biome: TerrainTag, radius: i32 },
    /// Overwrites the single plot cell.
    Terrain(TerrainTag),
}

#[derive(Default, Debug, Clone, Copy)]
pub struct PlotStoreStats {
    pub entries: usize,
}

#[derive(Clone, Copy)]
struct PlotEntry {
    seq: u64,
    kind: PlotKind,
}

/// Sparse mapping from absolute cell coordinate to its latest plot. At most
/// one plot per coordinate; insertion overwrites in place, keeping the
/// original position in the replay order. Entries carry a sequence number so
/// replay applies overlapping plots in the order they were created, matching
/// how they were applied to the live chunk.
#[derive(Default)]
pub struct PlotStore {
    inner: HashMap<CellCoord, PlotEntry>,
    next_seq: u64,
}

impl PlotStore {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn insert(&mut self, at: CellCoord, kind: PlotKind) {
        match self.inner.entry(at) {
            Entry::Occupied(mut e) => {
                e.get_mut().kind = kind;
                log::debug!(target: "plot", "overwrote plot at ({}, {})", at.x, at.y);
            }
            Entry::Vacant(v) => {
                v.insert(PlotEntry {
                    seq: self.next_seq,
                    kind,
                });
                self.next_seq += 1;
            }
        }
    }

    pub fn get(&self, at: CellCoord) -> Option<PlotKind> {
        self.inner.get(&at).map(|e| e.kind)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate all plots in insertion order, e.g. for an external save
    /// collaborator.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, PlotKind)> {
        let mut plots: Vec<(u64, CellCoord, PlotKind)> = self
            .inner
            .iter()
            .map(|(at, e)| (e.seq, *at, e.kind))
            .collect();
        plots.sort_by_key(|&(seq, _, _)| seq);
        plots.into_iter().map(|(_, at, kind)| (at, kind))
    }

    pub fn stats(&self) -> PlotStoreStats {
        PlotStoreStats {
            entries: self.inner.len(),
        }
    }

    /// Apply the plot stored at `at` to the chunk that owns that cell.
    /// Reports `false` when no plot exists, the chunk does not own the cell,
    /// or the edit itself is rejected (occupied structure footprint).
    pub fn apply_to(&self, chunk: &mut Chunk, at: CellCoord) -> bool {
        let Some(kind) = self.get(at) else {
            log::debug!(target: "plot", "no plot at ({}, {})", at.x, at.y);
            return false;
        };
        if !chunk.coord().contains_cell(at, chunk.size()) {
            log::debug!(
                target: "plot",
                "chunk {:?} does not own plot cell ({}, {})",
                chunk.coord(),
                at.x,
                at.y
            );
            return false;
        }
        let (lx, ly) = at.local(chunk.size());
        apply_kind(chunk, lx as i32, ly as i32, kind)
    }

    /// Replay every stored plot that falls inside the chunk's bounds, in
    /// insertion order so overlapping plots resolve exactly as they did on
    /// the live chunk; called whenever a chunk becomes resident. Returns the
    /// number applied.
    pub fn replay_onto(&self, chunk: &mut Chunk) -> usize {
        let mut owned: Vec<(u64, CellCoord, PlotKind)> = self
            .inner
            .iter()
            .filter(|(at, _)| chunk.coord().contains_cell(**at, chunk.size()))
            .map(|(at, e)| (e.seq, *at, e.kind))
            .collect();
        owned.sort_by_key(|&(seq, _, _)| seq);
        let mut applied = 0;
        for (_, at, kind) in owned {
            let (lx, ly) = at.local(chunk.size());
            if apply_kind(chunk, lx as i32, ly as i32, kind) {
                applied += 1;
            }
        }
        applied
    }
}

fn apply_kind(chunk: &mut Chunk, lx: i32, ly: i32, kind: PlotKind) -> bool {
    match kind {
        PlotKind::Structure(s) => chunk.place_structure(lx, ly, s),
        PlotKind::Biome { biome, radius } => {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    chunk.set_local(lx + dx, ly + dy, biome);
                }
            }
            true
        }
        PlotKind::Terrain(t) => {
            chunk.set_local(lx, ly, t);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overland_chunk::GenParams;
    use overland_core::ChunkCoord;

    fn chunk(cx: i32, cy: i32) -> Chunk {
        Chunk::generate(ChunkCoord::new(cx, cy), 16, &GenParams::default())
    }

    #[test]
    fn insert_overwrites_per_coordinate() {
        let mut store = PlotStore::new();
        let at = CellCoord::new(3, 4);
        store.insert(at, PlotKind::Terrain(TerrainTag::Water));
        store.insert(at, PlotKind::Terrain(TerrainTag::Desert));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(at), Some(PlotKind::Terrain(TerrainTag::Desert)));
    }

    #[test]
    fn terrain_plot_overwrites_single_cell() {
        let mut store = PlotStore::new();
        let mut c = chunk(0, 0);
        store.insert(CellCoord::new(5, 9), PlotKind::Terrain(TerrainTag::Water));
        assert!(store.apply_to(&mut c, CellCoord::new(5, 9)));
        assert_eq!(c.get_local(5, 9), TerrainTag::Water);
    }

    #[test]
    fn biome_plot_clips_to_chunk_bounds() {
        let mut store = PlotStore::new();
        let mut c = chunk(0, 0);
        let far_corner = c.get_local(15, 15);
        // Radius 2 around (1, 1) reaches outside the chunk on two sides.
        store.insert(
            CellCoord::new(1, 1),
            PlotKind::Biome {
                biome: TerrainTag::Tundra,
                radius: 2,
            },
        );
        assert!(store.apply_to(&mut c, CellCoord::new(1, 1)));
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(c.get_local(x, y), TerrainTag::Tundra);
            }
        }
        // Unrelated corner untouched by the clipped write.
        assert_eq!(c.get_local(15, 15), far_corner);
    }

    #[test]
    fn apply_to_rejects_foreign_chunk() {
        let mut store = PlotStore::new();
        let mut c = chunk(2, 2);
        store.insert(CellCoord::new(1, 1), PlotKind::Terrain(TerrainTag::Water));
        assert!(!store.apply_to(&mut c, CellCoord::new(1, 1)));
        assert!(!store.apply_to(&mut c, CellCoord::new(40, 40)));
    }

    #[test]
    fn replay_applies_only_owned_plots() {
        let mut store = PlotStore::new();
        store.insert(CellCoord::new(2, 2), PlotKind::Terrain(TerrainTag::Water));
        store.insert(CellCoord::new(10, 3), PlotKind::Terrain(TerrainTag::Desert));
        store.insert(
            CellCoord::new(40, 40),
            PlotKind::Terrain(TerrainTag::Forest),
        );
        let mut c = chunk(0, 0);
        assert_eq!(store.replay_onto(&mut c), 2);
        assert_eq!(c.get_local(2, 2), TerrainTag::Water);
        assert_eq!(c.get_local(10, 3), TerrainTag::Desert);
    }

    #[test]
    fn replay_matches_sequential_application_for_overlaps() {
        let mut store = PlotStore::new();
        let mut live = chunk(0, 0);
        let biomes = [
            TerrainTag::Forest,
            TerrainTag::Tundra,
            TerrainTag::Desert,
            TerrainTag::Swamp,
        ];
        // Overlapping area plots whose final cells depend on application
        // order.
        for i in 0..12i32 {
            let at = CellCoord::new(4 + i % 3, 4 + i / 3);
            let kind = PlotKind::Biome {
                biome: biomes[(i % 4) as usize],
                radius: 2,
            };
            store.insert(at, kind);
            assert!(store.apply_to(&mut live, at));
        }
        let mut replayed = chunk(0, 0);
        assert_eq!(store.replay_onto(&mut replayed), 12);
        assert_eq!(replayed.cells(), live.cells());
    }

    #[test]
    fn overwrite_keeps_original_replay_position() {
        let mut store = PlotStore::new();
        let a = CellCoord::new(5, 5);
        let b = CellCoord::new(6, 6);
        store.insert(
            a,
            PlotKind::Biome {
                biome: TerrainTag::Forest,
                radius: 2,
            },
        );
        store.insert(
            b,
            PlotKind::Biome {
                biome: TerrainTag::Tundra,
                radius: 2,
            },
        );
        // Rewriting the first plot must not move it behind the second.
        store.insert(
            a,
            PlotKind::Biome {
                biome: TerrainTag::Desert,
                radius: 2,
            },
        );
        let order: Vec<CellCoord> = store.iter().map(|(at, _)| at).collect();
        assert_eq!(order, vec![a, b]);

        let mut c = chunk(0, 0);
        assert_eq!(store.replay_onto(&mut c), 2);
        // Cells covered only by one plot carry its biome; the overlap
        // belongs to the later insertion.
        assert_eq!(c.get_local(3, 3), TerrainTag::Desert);
        assert_eq!(c.get_local(8, 8), TerrainTag::Tundra);
        assert_eq!(c.get_local(5, 5), TerrainTag::Tundra);
    }

    #[test]
    fn structure_plot_delegates_to_placement_rules() {
        let mut store = PlotStore::new();
        let mut c = chunk(0, 0);
        store.insert(
            CellCoord::new(4, 4),
            PlotKind::Structure(StructureKind::Tavern),
        );
        assert!(store.apply_to(&mut c, CellCoord::new(4, 4)));
        // Second structure plot overlapping the footprint is rejected at
        // application time but stays stored.
        store.insert(
            CellCoord::new(6, 6),
            PlotKind::Structure(StructureKind::Market),
        );
        assert!(!store.apply_to(&mut c, CellCoord::new(6, 6)));
        assert_eq!(store.len(), 2);
        assert_eq!(c.structure_at(4, 4), Some(StructureKind::Tavern));
    }
}
