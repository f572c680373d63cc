//! Renders a generated world to PNG frames, scrolling the viewport and
//! editing the world between frames so later frames go through the
//! incremental path.

mod config;
mod worldgen;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use render_protocol::{DebugLevel, PlayerId, Viewport, WorldView};
use renderer::{TileRenderer, placeholder_atlas};
use tiles::Surface;
use tracing_subscriber::EnvFilter;
use transitions::TransitionTables;

use crate::config::MapViewConfig;

#[derive(Parser)]
#[command(author, version, about = "Render a wrapping tile map to PNG frames")]
struct Arguments {
    /// TOML configuration file.
    #[arg(long, short = 'c', value_parser)]
    config: Option<PathBuf>,
    /// Output directory for frames.
    #[arg(long, short = 'o', value_parser, default_value = "target/mapview")]
    output: PathBuf,
    /// Overrides the map seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Overrides the player whose fog of war is drawn.
    #[arg(long)]
    fog_player: Option<u8>,
    /// Overrides the debug overlay level (0 off, 1 terrain, 2 analysis).
    #[arg(long)]
    debug_level: Option<u8>,
    /// Overrides the number of frames.
    #[arg(long)]
    frames: Option<u32>,
}

fn load_config(arguments: &Arguments) -> Result<MapViewConfig> {
    let mut config = match &arguments.config {
        Some(path) => MapViewConfig::load(path)?,
        None => MapViewConfig::default(),
    };
    if let Some(seed) = arguments.seed {
        config.map.seed = seed;
    }
    if let Some(player) = arguments.fog_player {
        config.frames.fog_player = Some(player);
    }
    if let Some(level) = arguments.debug_level {
        config.frames.debug_level = DebugLevel::from_level(level);
    }
    if let Some(count) = arguments.frames {
        config.frames.count = count;
    }
    Ok(config)
}

fn write_png(surface: &Surface, path: &Path) -> Result<()> {
    let image =
        image::RgbaImage::from_raw(surface.width(), surface.height(), surface.as_bytes().to_vec())
            .context("frame buffer size mismatch")?;
    image
        .save(path)
        .with_context(|| format!("write frame {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let arguments = Arguments::parse();
    let config = load_config(&arguments)?;
    fs::create_dir_all(&arguments.output)
        .with_context(|| format!("create output directory {}", arguments.output.display()))?;

    let mut world = worldgen::generate(&config.map).context("generate world")?;
    let tables = Arc::new(TransitionTables::new());
    let atlas = placeholder_atlas(world.terrain_set(), &tables, &config.renderer.coastline)
        .context("build placeholder atlas")?;
    let mut renderer = TileRenderer::new(world.layout(), config.renderer.clone(), atlas, tables)
        .context("create tile renderer")?;
    renderer.attach(&mut world).context("attach renderer")?;

    let frames = &config.frames;
    let fog_player = frames.fog_player.map(PlayerId);
    let mut target = Surface::new(frames.width, frames.height);
    let mut edits = StdRng::seed_from_u64(config.map.seed ^ 0x5eed);
    for frame in 0..frames.count {
        if frame > 0 {
            for _ in 0..frames.edits_per_frame {
                worldgen::random_edit(&mut world, &mut edits)?;
            }
        }
        let viewport = Viewport::new(
            frames.scroll_x * frame as i64,
            frames.scroll_y * frame as i64,
            frames.width,
            frames.height,
        );
        let stats = renderer
            .render(&world, &mut target, viewport, fog_player, frames.debug_level)
            .with_context(|| format!("render frame {frame}"))?;
        let path = arguments.output.join(format!("frame_{frame:03}.png"));
        write_png(&target, &path)?;
        tracing::info!(
            frame,
            tiles = stats.tiles_recomputed,
            cells = stats.cells_recomposited,
            blits = stats.cells_blitted,
            path = %path.display(),
            "rendered frame"
        );
    }

    renderer.detach(&mut world);
    Ok(())
}
