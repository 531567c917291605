//! Grid A* over the streamed world, with a revision-stamped result cache.
#![forbid(unsafe_code)]

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use overland_core::CellCoord;
use overland_world::WorldGrid;

const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const MAX_CACHE_ENTRIES: usize = 100;

#[derive(Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f: i32,
    coord: CellCoord,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.f
            .cmp(&other.f)
            .then((self.coord.x, self.coord.y).cmp(&(other.coord.x, other.coord.y)))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct CacheEntry {
    rev: u64,
    path: Option<Vec<CellCoord>>,
}

/// Shortest-path search over the world grid's read-only queries. Results are
/// memoized per `(start, goal)` pair and stamped with the grid's terrain
/// revision; a stale stamp forces a recompute instead of serving a path
/// through mutated terrain.
#[derive(Default)]
pub struct PathFinder {
    cache: HashMap<(CellCoord, CellCoord), CacheEntry>,
}

impl PathFinder {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    #[inline]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Ordered route from start to goal inclusive, or `None` when the goal
    /// is unreachable over resident, non-solid cells.
    pub fn find_path(
        &mut self,
        grid: &WorldGrid,
        start_x: i32,
        start_y: i32,
        goal_x: i32,
        goal_y: i32,
    ) -> Option<Vec<CellCoord>> {
        let start = CellCoord::new(start_x, start_y);
        let goal = CellCoord::new(goal_x, goal_y);
        let rev = grid.terrain_rev();
        if let Some(entry) = self.cache.get(&(start, goal)) {
            if entry.rev == rev {
                log::trace!(target: "path", "cache hit ({start_x},{start_y})->({goal_x},{goal_y})");
                return entry.path.clone();
            }
        }
        let path = astar(grid, start, goal);
        if self.cache.len() >= MAX_CACHE_ENTRIES {
            self.cache.retain(|_, e| e.rev == rev);
            if self.cache.len() >= MAX_CACHE_ENTRIES {
                self.cache.clear();
            }
        }
        self.cache.insert(
            (start, goal),
            CacheEntry {
                rev,
                path: path.clone(),
            },
        );
        path
    }
}

fn astar(grid: &WorldGrid, start: CellCoord, goal: CellCoord) -> Option<Vec<CellCoord>> {
    if !grid.is_valid_position(start.x, start.y) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut g_score: HashMap<CellCoord, i32> = HashMap::new();
    let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();
    let mut closed: HashSet<CellCoord> = HashSet::new();

    g_score.insert(start, 0);
    open.push(Reverse(OpenNode {
        f: start.manhattan(goal),
        coord: start,
    }));

    while let Some(Reverse(node)) = open.pop() {
        let current = node.coord;
        if current == goal {
            return Some(reconstruct(&came_from, current));
        }
        if !closed.insert(current) {
            continue;
        }
        let current_g = g_score.get(&current).copied().unwrap_or(i32::MAX);
        for (dx, dy) in DIRECTIONS {
            let next = current.offset(dx, dy);
            if !grid.is_valid_position(next.x, next.y) || grid.is_solid(next.x, next.y) {
                continue;
            }
            let tentative = current_g + 1;
            if tentative < g_score.get(&next).copied().unwrap_or(i32::MAX) {
                came_from.insert(next, current);
                g_score.insert(next, tentative);
                open.push(Reverse(OpenNode {
                    f: tentative + next.manhattan(goal),
                    coord: next,
                }));
            }
        }
    }
    None
}

fn reconstruct(came_from: &HashMap<CellCoord, CellCoord>, end: CellCoord) -> Vec<CellCoord> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
