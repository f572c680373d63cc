use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use render_protocol::DebugLevel;
use renderer::RendererConfig;
use serde::Deserialize;

/// Everything `mapview` reads from its TOML file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapViewConfig {
    pub map: MapConfig,
    pub renderer: RendererConfig,
    pub frames: FramesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    /// Percentage of tiles grown into land.
    pub land_percent: u8,
    pub players: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 48,
            height: 32,
            seed: 1,
            land_percent: 40,
            players: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FramesConfig {
    pub count: u32,
    pub width: u32,
    pub height: u32,
    /// Viewport movement between frames, in pixels.
    pub scroll_x: i64,
    pub scroll_y: i64,
    /// Random world edits applied before every frame after the first.
    pub edits_per_frame: u32,
    pub fog_player: Option<u8>,
    pub debug_level: DebugLevel,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            count: 4,
            width: 640,
            height: 480,
            scroll_x: 96,
            scroll_y: 40,
            edits_per_frame: 6,
            fog_player: None,
            debug_level: DebugLevel::Off,
        }
    }
}

impl MapViewConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse mapview config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("load config {}", path.display()))
    }
}
