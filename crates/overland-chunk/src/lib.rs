//! Chunk buffer and terrain generation.
#![forbid(unsafe_code)]

pub mod noise;

use std::collections::HashMap;

use overland_core::{ChunkCoord, StructureKind, TerrainTag, cell_mix, unit_draw};
use serde::Deserialize;

/// Generation parameters. Every field has a config default; the blend field
/// scale is always twice the elevation scale.
#[derive(Clone, Debug, Deserialize)]
pub struct GenParams {
    #[serde(default = "default_elevation_scale")]
    pub elevation_scale: f64,
    #[serde(default = "default_moisture_scale")]
    pub moisture_scale: f64,
    #[serde(default = "default_moisture_offset")]
    pub moisture_offset: f64,
    #[serde(default = "default_blend_offset")]
    pub blend_offset: f64,
    #[serde(default = "default_transition_chance")]
    pub transition_chance: f64,
    #[serde(default = "default_smoothing_salt")]
    pub smoothing_salt: u64,
}

fn default_elevation_scale() -> f64 {
    0.03
}
fn default_moisture_scale() -> f64 {
    0.02
}
fn default_moisture_offset() -> f64 {
    1000.0
}
fn default_blend_offset() -> f64 {
    2000.0
}
fn default_transition_chance() -> f64 {
    0.3
}
fn default_smoothing_salt() -> u64 {
    0x51ab_cd29_f0e1_d203
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            elevation_scale: default_elevation_scale(),
            moisture_scale: default_moisture_scale(),
            moisture_offset: default_moisture_offset(),
            blend_offset: default_blend_offset(),
            transition_chance: default_transition_chance(),
            smoothing_salt: default_smoothing_salt(),
        }
    }
}

impl GenParams {
    #[inline]
    pub fn blend_scale(&self) -> f64 {
        self.elevation_scale * 2.0
    }
}

/// Classify a cell from its elevation and moisture samples. Moisture lifts
/// the effective elevation slightly and disambiguates the two candidate
/// biomes inside each elevation band.
pub fn classify_biome(elevation: f64, moisture: f64) -> TerrainTag {
    let adjusted = elevation * (1.0 + moisture * 0.2);
    if adjusted < 0.2 {
        if moisture < 0.5 {
            TerrainTag::Water
        } else {
            TerrainTag::Swamp
        }
    } else if adjusted < 0.4 {
        if moisture < 0.3 {
            TerrainTag::Desert
        } else {
            TerrainTag::Plains
        }
    } else if adjusted < 0.6 {
        if moisture < 0.6 {
            TerrainTag::Plains
        } else {
            TerrainTag::Forest
        }
    } else if adjusted < 0.8 {
        if moisture < 0.5 {
            TerrainTag::Hills
        } else {
            TerrainTag::Mountains
        }
    } else {
        TerrainTag::Tundra
    }
}

/// Pre-smoothing classification at an absolute cell. Pure in position and
/// parameters; useful for map previews that do not want a whole chunk.
pub fn raw_tag_at(wx: i32, wy: i32, params: &GenParams) -> TerrainTag {
    let elevation = noise::sample_field(wx, wy, params.elevation_scale, 0.0);
    let moisture = noise::sample_field(wx, wy, params.moisture_scale, params.moisture_offset);
    // The blend field decorrelates at twice the elevation scale; it is
    // sampled alongside the others and reserved for transition tuning.
    let _blend = noise::sample_field(wx, wy, params.blend_scale(), params.blend_offset);
    classify_biome(elevation, moisture)
}

/// A fixed-size square of terrain, fully populated by one generation call.
/// Mutable only through overlay application and structure placement.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    size: usize,
    cells: Vec<TerrainTag>,
    structures: HashMap<(i32, i32), StructureKind>,
}

impl Chunk {
    /// Deterministic in `(coord, size, params)`: generating the same chunk
    /// twice, in any order relative to other chunks, yields identical cells.
    pub fn generate(coord: ChunkCoord, size: usize, params: &GenParams) -> Chunk {
        let mut chunk = Chunk {
            coord,
            size,
            cells: vec![TerrainTag::Ground; size * size],
            structures: HashMap::new(),
        };
        let base = coord.base(size);
        for y in 0..size {
            for x in 0..size {
                let wx = base.x + x as i32;
                let wy = base.y + y as i32;
                let idx = chunk.idx(x, y);
                chunk.cells[idx] = raw_tag_at(wx, wy, params);
            }
        }
        chunk.smooth_transitions(params);
        chunk.denoise_pass();
        chunk
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn cells(&self) -> &[TerrainTag] {
        &self.cells
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize) -> TerrainTag {
        self.cells[self.idx(x, y)]
    }

    #[inline]
    pub fn is_valid_local(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.size && y >= 0 && (y as usize) < self.size
    }

    /// Overwrite a single cell; out-of-range writes are ignored.
    pub fn set_local(&mut self, x: i32, y: i32, tag: TerrainTag) {
        if !self.is_valid_local(x, y) {
            return;
        }
        let idx = self.idx(x as usize, y as usize);
        self.cells[idx] = tag;
    }

    #[inline]
    pub fn structure_at(&self, x: i32, y: i32) -> Option<StructureKind> {
        self.structures.get(&(x, y)).copied()
    }

    #[inline]
    pub fn structure_cell_count(&self) -> usize {
        self.structures.len()
    }

    /// Stamp a structure footprint at chunk-local coordinates. Fails without
    /// mutating anything when the footprint leaves the chunk or overlaps a
    /// previously recorded footprint cell.
    pub fn place_structure(&mut self, x: i32, y: i32, kind: StructureKind) -> bool {
        let fp = kind.footprint() as i32;
        let side = self.size as i32;
        if x < 0 || y < 0 || x + fp > side || y + fp > side {
            log::warn!(
                target: "chunk",
                "no space for {fp}x{fp} {kind:?} at local ({x}, {y}) in chunk {:?}",
                self.coord
            );
            return false;
        }
        for dy in 0..fp {
            for dx in 0..fp {
                if self.structures.contains_key(&(x + dx, y + dy)) {
                    log::warn!(
                        target: "chunk",
                        "footprint cell ({}, {}) already occupied in chunk {:?}",
                        x + dx,
                        y + dy,
                        self.coord
                    );
                    return false;
                }
            }
        }
        for dy in 0..fp {
            for dx in 0..fp {
                self.structures.insert((x + dx, y + dy), kind);
                let idx = self.idx((x + dx) as usize, (y + dy) as usize);
                self.cells[idx] = TerrainTag::Structure(kind);
            }
        }
        true
    }

    fn neighbor_tags(&self, x: usize, y: usize, out: &mut Vec<TerrainTag>) {
        out.clear();
        let side = self.size as i32;
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx >= 0 && nx < side && ny >= 0 && ny < side {
                    out.push(self.cells[ny as usize * self.size + nx as usize]);
                }
            }
        }
    }

    /// Inject irregularity at biome boundaries. The draw and the neighbor
    /// pick both come from a hash of the absolute cell position, so the
    /// result is reproducible across eviction and regeneration.
    fn smooth_transitions(&mut self, params: &GenParams) {
        let base = self.coord.base(self.size);
        let mut neighbors = Vec::with_capacity(8);
        for y in 0..self.size {
            for x in 0..self.size {
                let center = self.cells[self.idx(x, y)];
                self.neighbor_tags(x, y, &mut neighbors);
                if neighbors.iter().all(|&t| t == center) {
                    continue;
                }
                let wx = base.x + x as i32;
                let wy = base.y + y as i32;
                let hash = cell_mix(wx, wy, params.smoothing_salt);
                if unit_draw(hash) < params.transition_chance {
                    let pick = ((hash >> 32) as usize) % neighbors.len();
                    let idx = self.idx(x, y);
                    self.cells[idx] = neighbors[pick];
                }
            }
        }
    }

    /// Remove isolated cells: one pass over a snapshot, interior cells only,
    /// replacing any cell whose tag appears fewer than 3 times among its 8
    /// neighbors with the neighborhood majority.
    fn denoise_pass(&mut self) {
        if self.size < 3 {
            return;
        }
        let prev = self.cells.clone();
        let mut counts: Vec<(TerrainTag, u8)> = Vec::with_capacity(8);
        for y in 1..self.size - 1 {
            for x in 1..self.size - 1 {
                counts.clear();
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = (x as i32 + dx) as usize;
                        let ny = (y as i32 + dy) as usize;
                        let tag = prev[ny * self.size + nx];
                        match counts.iter_mut().find(|(t, _)| *t == tag) {
                            Some((_, n)) => *n += 1,
                            None => counts.push((tag, 1)),
                        }
                    }
                }
                let own = prev[y * self.size + x];
                let own_count = counts
                    .iter()
                    .find(|(t, _)| *t == own)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                if own_count < 3 {
                    if let Some(&(first, first_n)) = counts.first() {
                        let mut majority = first;
                        let mut best = first_n;
                        // Strict comparison: ties keep the tag encountered
                        // first in scan order.
                        for &(tag, n) in &counts[1..] {
                            if n > best {
                                majority = tag;
                                best = n;
                            }
                        }
                        let idx = self.idx(x, y);
                        self.cells[idx] = majority;
                    }
                }
            }
        }
    }
}
