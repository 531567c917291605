use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;

use overland_core::{StructureKind, TerrainTag};
use overland_path::PathFinder;
use overland_world::{PlotKind, WorldConfig, WorldGrid, load_config_from_path};

/// Walk a viewer across the streamed world and print terrain overviews.
#[derive(Parser, Debug)]
#[command(name = "overland", about = "Streaming tile world demo walk")]
struct Args {
    /// Optional TOML world config; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Viewer steps to take.
    #[arg(long, default_value_t = 24)]
    steps: u32,
    /// Cells moved east per step.
    #[arg(long, default_value_t = 4)]
    stride: i32,
    /// Half-width of the printed view.
    #[arg(long, default_value_t = 12)]
    view: i32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => match load_config_from_path(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("config load failed ({e}); using defaults");
                WorldConfig::default()
            }
        },
        None => WorldConfig::default(),
    };

    let mut grid = WorldGrid::new(cfg);
    grid.bootstrap();

    // A few durable edits near spawn; they survive eviction if the walk
    // loops back.
    grid.plot_item(3, 2, PlotKind::Structure(StructureKind::Tavern));
    grid.plot_item(
        -6,
        5,
        PlotKind::Biome {
            biome: TerrainTag::Forest,
            radius: 2,
        },
    );
    grid.plot_item(1, -2, PlotKind::Terrain(TerrainTag::Water));

    let mut finder = PathFinder::new();
    let (mut x, y) = (0i32, 0i32);

    for step in 0..args.steps {
        x += args.stride;
        grid.update_viewer(x, y);
        while !grid.is_streaming_idle() {
            grid.pump();
            thread::sleep(Duration::from_millis(1));
        }
        let (resident, inflight, queued) = grid.queue_debug_counts();
        log::debug!(
            "step {step}: viewer ({x}, {y}) resident={resident} inflight={inflight} queued={queued}"
        );
    }

    match finder.find_path(&grid, x, y, x + 6, y + 4) {
        Some(path) => log::info!("path from ({x}, {y}) reaches goal in {} cells", path.len()),
        None => log::info!("no path from ({x}, {y}) to ({}, {})", x + 6, y + 4),
    }

    print_view(&grid, x, y, args.view);
}

fn print_view(grid: &WorldGrid, cx: i32, cy: i32, half: i32) {
    let mut out = String::new();
    for y in (cy - half / 2)..=(cy + half / 2) {
        for x in (cx - half)..=(cx + half) {
            if x == cx && y == cy {
                out.push('@');
            } else {
                out.push(grid.cell_at(x, y).glyph());
            }
        }
        out.push('\n');
    }
    println!("{out}");
}
