//! Coordinates, terrain vocabulary, and deterministic cell hashing.
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Absolute world cell coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chunk that owns this cell for the given chunk size.
    #[inline]
    pub fn chunk(self, chunk_size: usize) -> ChunkCoord {
        let cs = chunk_size as i32;
        ChunkCoord::new(self.x.div_euclid(cs), self.y.div_euclid(cs))
    }

    /// Chunk-local coordinates for the given chunk size.
    #[inline]
    pub fn local(self, chunk_size: usize) -> (usize, usize) {
        let cs = chunk_size as i32;
        (
            self.x.rem_euclid(cs) as usize,
            self.y.rem_euclid(cs) as usize,
        )
    }

    #[inline]
    pub fn manhattan(self, other: CellCoord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl From<(i32, i32)> for CellCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Chunk coordinate, the unit of generation, streaming, and eviction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
        }
    }

    /// World coordinate of the chunk's minimum corner.
    #[inline]
    pub fn base(self, chunk_size: usize) -> CellCoord {
        let cs = chunk_size as i32;
        CellCoord::new(self.cx * cs, self.cy * cs)
    }

    #[inline]
    pub fn contains_cell(self, cell: CellCoord, chunk_size: usize) -> bool {
        cell.chunk(chunk_size) == self
    }

    #[inline]
    pub fn manhattan(self, other: ChunkCoord) -> i32 {
        (self.cx - other.cx).abs() + (self.cy - other.cy).abs()
    }

    /// Ring distance used by the square load/evict envelopes.
    #[inline]
    pub fn chebyshev(self, other: ChunkCoord) -> i32 {
        (self.cx - other.cx).abs().max((self.cy - other.cy).abs())
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Placeable structure kinds. Every kind stamps a fixed square footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Tavern,
    Market,
    Temple,
    Blacksmith,
    Garden,
}

impl StructureKind {
    /// Side length of the square footprint, in cells.
    #[inline]
    pub const fn footprint(self) -> usize {
        4
    }

    #[inline]
    pub const fn walkable(self) -> bool {
        true
    }
}

/// Terrain vocabulary. `Loading` is a query-only sentinel for cells whose
/// chunk is not resident; it is never stored in a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainTag {
    Ground,
    Water,
    Swamp,
    Desert,
    Plains,
    Forest,
    Hills,
    Mountains,
    Tundra,
    Structure(StructureKind),
    Loading,
}

impl TerrainTag {
    /// Solid tags block movement. `Loading` is treated as passable-unknown;
    /// validity checks reject it before pathing ever steps there.
    #[inline]
    pub fn is_solid(self) -> bool {
        match self {
            TerrainTag::Water => true,
            TerrainTag::Structure(kind) => !kind.walkable(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_loading(self) -> bool {
        matches!(self, TerrainTag::Loading)
    }

    /// One-character display glyph for textual overviews.
    pub fn glyph(self) -> char {
        match self {
            TerrainTag::Ground => '.',
            TerrainTag::Water => '~',
            TerrainTag::Swamp => '%',
            TerrainTag::Desert => ':',
            TerrainTag::Plains => ',',
            TerrainTag::Forest => 'f',
            TerrainTag::Hills => 'n',
            TerrainTag::Mountains => '^',
            TerrainTag::Tundra => '*',
            TerrainTag::Structure(_) => '#',
            TerrainTag::Loading => '?',
        }
    }
}

/// Mix an absolute cell coordinate and salt into a 64-bit hash. Drives the
/// biome transition draws so regenerating an evicted chunk reproduces the
/// exact same smoothing decisions.
#[inline]
pub fn cell_mix(x: i32, y: i32, salt: u64) -> u64 {
    let packed = (x as u64 & 0xffff_ffff) | ((y as u64 & 0xffff_ffff) << 32);
    let mut z = packed ^ salt;
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Map the high bits of a hash onto `[0, 1)`.
#[inline]
pub fn unit_draw(hash: u64) -> f64 {
    (hash >> 11) as f64 / (1u64 << 53) as f64
}
