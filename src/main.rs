mod interactive;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use audibility_grid::{
    AudibilityConfig, AudibilityEngine, AudibleSound, GridCoord, GridId, GridInfo, LoudnessLevel,
    MaterialLayer, PropagationConfig, Result, ViewerConfig, WorldPoint, save_ppm,
};
use audibility_grid::render::levels_to_string;
use interactive::InteractiveViewer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tile-grid audibility propagation", long_about = None)]
struct Cli {
    /// TOML config file; defaults are used for anything it leaves out
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propagate one source through a demo map and save a PPM heatmap
    Render {
        #[arg(short, long, default_value = "audibility.ppm")]
        output: PathBuf,

        /// Also write the raw settled levels (little-endian i16 per cell)
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Time sequential against parallel ticks
    Benchmark {
        #[arg(short, long, default_value_t = 20)]
        iterations: usize,

        #[arg(short, long, default_value_t = 8)]
        sources: usize,
    },
    /// Open a window: the mouse moves the source, clicks toggle walls
    Interactive,
}

const DEMO_GRID: GridId = GridId(0);

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AudibilityConfig::load(path)?,
        None => AudibilityConfig::default(),
    };

    match cli.command {
        Command::Render { output, dump } => run_render(&config, output, dump),
        Command::Benchmark { iterations, sources } => {
            run_benchmark(&config.propagation, iterations, sources)
        }
        Command::Interactive => {
            match InteractiveViewer::new(config) {
                Ok(mut viewer) => {
                    if let Err(e) = viewer.run() {
                        eprintln!("Error: {}", e);
                    }
                }
                Err(e) => {
                    eprintln!("Failed to create viewer: {}", e);
                }
            }
            Ok(())
        }
    }
}

/// Two rooms joined by a doorway, walls at `muffling` strength
fn demo_map(info: &GridInfo, muffling: i32) -> (MaterialLayer<LoudnessLevel>, Vec<bool>) {
    let mut layer = MaterialLayer::new(*info);
    let mut walls = vec![false; info.cell_count()];
    let size = info.size();
    let (w, h) = (size.x as i32, size.y as i32);
    let door = (h / 2 - 1)..=(h / 2 + 1);

    for y in 0..h {
        if door.contains(&y) {
            continue;
        }
        let coord = GridCoord::flat(w / 2, y);
        layer.set(coord, Some(LoudnessLevel::new(muffling)));
        if let Some(slot) = info.to_index_relative(coord).slot() {
            walls[slot] = true;
        }
    }
    (layer, walls)
}

fn run_render(config: &AudibilityConfig, output: PathBuf, dump: Option<PathBuf>) -> Result<()> {
    let viewer = &config.viewer;
    let info = GridInfo::flat((0, 0), (viewer.grid_width, viewer.grid_height), (0.0, 0.0), (1.0, 1.0))?;
    let (layer, walls) = demo_map(&info, viewer.wall_muffling);

    let mut engine = AudibilityEngine::new(config.propagation.clone());
    engine.register_grid(DEMO_GRID, info);

    let source = AudibleSound::new(
        WorldPoint::flat(viewer.grid_width as f32 / 4.0, viewer.grid_height as f32 / 2.0),
        LoudnessLevel::new(viewer.source_loudness),
        viewer.source_range,
    );
    let report = engine.tick(DEMO_GRID, &[source], &layer)?;
    log::info!(
        "tick: {} sources, {} expansions, {:?}",
        report.sources,
        report.expansions,
        report.convergence
    );

    let cells = engine.settled(DEMO_GRID)?;
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("settled levels:\n{}", levels_to_string(&info, cells));
    }
    save_ppm(&output, &info, cells, Some(walls.as_slice()), viewer.normalization, viewer.scale)?;
    println!("Wrote {}", output.display());

    if let Some(path) = dump {
        std::fs::write(&path, engine.level_bytes(DEMO_GRID)?)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_benchmark(propagation: &PropagationConfig, iterations: usize, source_count: usize) -> Result<()> {
    println!("=== Flood Fill Benchmark ===\n");

    let sizes = [(64, 64), (128, 128), (256, 256)];
    let iterations = iterations.max(1);

    for (width, height) in sizes {
        println!("Grid size: {}x{}, {} sources", width, height, source_count);
        println!("-----------------------");

        let info = GridInfo::flat((0, 0), (width, height), (0.0, 0.0), (1.0, 1.0))?;
        let (layer, _) = demo_map(&info, ViewerConfig::default().wall_muffling);
        let sources: Vec<_> = (0..source_count)
            .map(|i| {
                let t = (i as f32 + 0.5) / source_count.max(1) as f32;
                AudibleSound::new(
                    WorldPoint::flat(t * width as f32, (1.0 - t) * height as f32),
                    LoudnessLevel::new(120),
                    width as f32 / 4.0,
                )
            })
            .collect();

        let mut timings = [0.0f64; 2];
        for (timing, parallel) in timings.iter_mut().zip([false, true]) {
            let config = PropagationConfig { parallel, ..propagation.clone() };
            let mut engine = AudibilityEngine::new(config);
            engine.register_grid(DEMO_GRID, info);
            engine.ensure_built(DEMO_GRID, &layer)?;

            let start = Instant::now();
            for _ in 0..iterations {
                engine.tick(DEMO_GRID, &sources, &layer)?;
            }
            *timing = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;
        }

        let [sequential_ms, parallel_ms] = timings;
        println!("  Sequential: {:.3} ms/tick", sequential_ms);
        println!("  Parallel:   {:.3} ms/tick", parallel_ms);
        println!("  Speedup: {:.2}x", sequential_ms / parallel_ms.max(f64::EPSILON));
        println!();
    }
    Ok(())
}
