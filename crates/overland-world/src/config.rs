use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use overland_chunk::GenParams;

/// World construction parameters, loadable from TOML. Every field has a
/// default so an empty config is valid.
#[derive(Clone, Debug, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_render_radius")]
    pub render_radius: i32,
    /// Absolute coordinate envelope: positions with |x| or |y| beyond this
    /// are invalid.
    #[serde(default = "default_world_extent")]
    pub world_extent: i32,
    #[serde(default)]
    pub terrain: GenParams,
}

fn default_chunk_size() -> usize {
    16
}
fn default_render_radius() -> i32 {
    2
}
fn default_world_extent() -> i32 {
    1000
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            render_radius: default_render_radius(),
            world_extent: default_world_extent(),
            terrain: GenParams::default(),
        }
    }
}

impl WorldConfig {
    /// Chunks are kept one ring beyond the render radius to mask streaming
    /// latency.
    #[inline]
    pub fn preload_radius(&self) -> i32 {
        self.render_radius + 1
    }
}

pub fn load_config_from_path(path: &Path) -> Result<WorldConfig, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let cfg: WorldConfig = toml::from_str(&text)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: WorldConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.chunk_size, 16);
        assert_eq!(cfg.render_radius, 2);
        assert_eq!(cfg.preload_radius(), 3);
        assert_eq!(cfg.world_extent, 1000);
    }

    #[test]
    fn partial_config_overrides() {
        let cfg: WorldConfig = toml::from_str(
            "chunk_size = 8\nrender_radius = 1\n\n[terrain]\nelevation_scale = 0.05\n",
        )
        .unwrap();
        assert_eq!(cfg.chunk_size, 8);
        assert_eq!(cfg.preload_radius(), 2);
        assert_eq!(cfg.terrain.elevation_scale, 0.05);
        // Untouched terrain fields keep their defaults.
        assert_eq!(cfg.terrain.moisture_scale, 0.02);
    }
}
