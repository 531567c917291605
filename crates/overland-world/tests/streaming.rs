use std::thread;
use std::time::Duration;

use overland_core::{ChunkCoord, StructureKind, TerrainTag};
use overland_world::{ChunkRequest, PlotKind, PlotOutcome, WorldConfig, WorldError, WorldGrid};

fn small_grid() -> WorldGrid {
    let cfg = WorldConfig {
        chunk_size: 8,
        render_radius: 1,
        ..WorldConfig::default()
    };
    WorldGrid::new(cfg)
}

/// Pump until the queue and in-flight set drain.
fn settle(grid: &mut WorldGrid) {
    let mut spins = 0u32;
    while !grid.is_streaming_idle() {
        grid.pump();
        thread::sleep(Duration::from_millis(1));
        spins += 1;
        assert!(spins < 20_000, "streaming stalled");
    }
}

#[test]
fn bootstrap_installs_render_square() {
    let mut grid = small_grid();
    grid.bootstrap();
    assert_eq!(grid.resident_count(), 9);
    for coord in grid.resident_coords() {
        assert!(coord.chebyshev(grid.center_chunk()) <= 1);
    }
}

#[test]
fn queued_path_matches_sync_generation() {
    let mut grid = small_grid();
    let coord = ChunkCoord::new(2, 1);
    assert_eq!(grid.request_chunk(coord), ChunkRequest::Pending);
    settle(&mut grid);
    assert_eq!(grid.request_chunk(coord), ChunkRequest::Resident);

    let mut sync_grid = small_grid();
    let expected = sync_grid.ensure_chunk(coord).unwrap().cells().to_vec();
    assert_eq!(grid.chunk(coord).unwrap().cells(), &expected[..]);
}

#[test]
fn eviction_is_immediate_on_viewer_change() {
    let mut grid = small_grid();
    grid.bootstrap();
    assert_eq!(grid.resident_count(), 9);
    // 100 cells away: every previously resident chunk leaves the preload
    // square synchronously, before any pump.
    grid.update_viewer(100, 100);
    for coord in grid.resident_coords() {
        assert!(coord.chebyshev(grid.center_chunk()) <= grid.config().preload_radius());
    }
    assert_eq!(grid.resident_count(), 0);
    settle(&mut grid);
    // Preload square fully populated after the queue drains.
    let pr = grid.config().preload_radius();
    assert_eq!(grid.resident_count(), ((2 * pr + 1) * (2 * pr + 1)) as usize);
}

#[test]
fn absent_chunks_read_as_loading() {
    let mut grid = small_grid();
    grid.update_viewer(200, 200);
    assert_eq!(grid.cell_at(200, 200), TerrainTag::Loading);
    assert!(!grid.is_valid_position(200, 200));
    assert!(!grid.is_solid(200, 200));
    settle(&mut grid);
    assert!(!grid.cell_at(200, 200).is_loading());
    assert!(grid.is_valid_position(200, 200));
}

#[test]
fn plots_survive_eviction_and_regeneration() {
    let mut grid = small_grid();
    grid.bootstrap();
    assert_eq!(
        grid.plot_item(2, 3, PlotKind::Terrain(TerrainTag::Water)),
        PlotOutcome::Applied
    );
    assert_eq!(grid.cell_at(2, 3), TerrainTag::Water);
    let before = grid.chunk(ChunkCoord::new(0, 0)).unwrap().cells().to_vec();

    grid.update_viewer(500, 500);
    assert!(!grid.is_resident(ChunkCoord::new(0, 0)));
    assert_eq!(grid.cell_at(2, 3), TerrainTag::Loading);

    grid.update_viewer(0, 0);
    settle(&mut grid);
    assert_eq!(grid.cell_at(2, 3), TerrainTag::Water);
    // Regeneration plus replay reproduces the exact pre-eviction cells.
    assert_eq!(
        grid.chunk(ChunkCoord::new(0, 0)).unwrap().cells(),
        &before[..]
    );
}

#[test]
fn overlapping_plots_replay_in_creation_order() {
    let mut grid = small_grid();
    grid.bootstrap();
    // A dense field of overlapping area plots: the regenerated cells only
    // match the live ones if replay applies them in creation order.
    let biomes = [TerrainTag::Forest, TerrainTag::Tundra];
    for i in 0..20i32 {
        let outcome = grid.plot_item(
            1 + i % 5,
            1 + i / 5,
            PlotKind::Biome {
                biome: biomes[(i % 2) as usize],
                radius: 2,
            },
        );
        assert_eq!(outcome, PlotOutcome::Applied);
    }
    let before = grid.chunk(ChunkCoord::new(0, 0)).unwrap().cells().to_vec();

    grid.update_viewer(900, 900);
    assert!(!grid.is_resident(ChunkCoord::new(0, 0)));
    grid.update_viewer(0, 0);
    settle(&mut grid);
    assert_eq!(
        grid.chunk(ChunkCoord::new(0, 0)).unwrap().cells(),
        &before[..]
    );
}

#[test]
fn deferred_plot_applies_on_residency() {
    let mut grid = small_grid();
    grid.bootstrap();
    // Owning chunk far outside the resident set.
    assert_eq!(
        grid.plot_item(300, 300, PlotKind::Terrain(TerrainTag::Desert)),
        PlotOutcome::Deferred
    );
    grid.update_viewer(300, 300);
    settle(&mut grid);
    assert_eq!(grid.cell_at(300, 300), TerrainTag::Desert);
}

#[test]
fn envelope_bounds_are_enforced() {
    let mut grid = small_grid();
    grid.bootstrap();
    assert_eq!(
        grid.plot_item(2000, 0, PlotKind::Terrain(TerrainTag::Water)),
        PlotOutcome::Rejected
    );
    assert!(!grid.is_valid_position(1500, 0));
    let far = ChunkCoord::new(1000, 0);
    assert_eq!(grid.request_chunk(far), ChunkRequest::OutOfBounds);
    assert!(matches!(
        grid.ensure_chunk(far),
        Err(WorldError::OutOfBounds(c)) if c == far
    ));
}

#[test]
fn residency_sets_stay_disjoint_while_streaming() {
    let mut grid = small_grid();
    grid.update_viewer(50, -50);
    let mut spins = 0u32;
    loop {
        let (_, inflight, _) = grid.queue_debug_counts();
        assert!(inflight <= 1, "more than one generation outstanding");
        for coord in grid.resident_coords().collect::<Vec<_>>() {
            assert!(!grid.is_inflight(coord));
            assert!(!grid.is_queued(coord));
        }
        if grid.is_streaming_idle() {
            break;
        }
        grid.pump();
        thread::sleep(Duration::from_millis(1));
        spins += 1;
        assert!(spins < 20_000, "streaming stalled");
    }
}

#[test]
fn overlapping_structure_plots_reject_second() {
    let mut grid = small_grid();
    grid.bootstrap();
    assert_eq!(
        grid.plot_item(8, 8, PlotKind::Structure(StructureKind::Tavern)),
        PlotOutcome::Applied
    );
    let before = grid.chunk(ChunkCoord::new(1, 1)).unwrap().cells().to_vec();
    assert_eq!(
        grid.plot_item(10, 10, PlotKind::Structure(StructureKind::Market)),
        PlotOutcome::Rejected
    );
    assert_eq!(
        grid.chunk(ChunkCoord::new(1, 1)).unwrap().cells(),
        &before[..]
    );
    assert_eq!(
        grid.cell_at(8, 8),
        TerrainTag::Structure(StructureKind::Tavern)
    );
}

#[test]
fn terrain_rev_tracks_applied_edits() {
    let mut grid = small_grid();
    grid.bootstrap();
    let rev0 = grid.terrain_rev();
    assert_eq!(
        grid.plot_item(1, 1, PlotKind::Terrain(TerrainTag::Forest)),
        PlotOutcome::Applied
    );
    assert_eq!(grid.terrain_rev(), rev0 + 1);
    // Deferred edits do not bump until they actually land.
    assert_eq!(
        grid.plot_item(400, 400, PlotKind::Terrain(TerrainTag::Forest)),
        PlotOutcome::Deferred
    );
    assert_eq!(grid.terrain_rev(), rev0 + 1);
}

#[test]
fn viewer_position_lands_in_entity_registry() {
    let mut grid = small_grid();
    grid.update_viewer(42, -17);
    let viewer = grid.entities().viewer().unwrap();
    assert_eq!((viewer.x, viewer.y), (42, -17));
}
