//! Configuration loader - YAML settings + .env overrides

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::colorize::ColorStop;
use crate::orbit::OrbitConfig;

/// Main configuration loaded from sonoverse.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub colors: ColorConfig,
    pub orbit: OrbitConfig,
    pub grid: GridConfig,
    pub viewer: ViewerConfig,
}

/// Blend gradient end points
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub low: ColorStop,
    pub high: ColorStop,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            low: ColorStop::rgba(0, 0, 0, 255),
            high: ColorStop::rgba(200, 30, 20, 255),
        }
    }
}

/// Mesh and field slice the server generates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub length: f32,
    pub h: f32,
    pub resolution: usize,
    pub margin: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            length: 3.0,
            h: 0.1,
            resolution: 64,
            margin: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub mesh_color: [u8; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Sonoverse".to_string(),
            width: 1200,
            height: 800,
            mesh_color: [255, 165, 0],
        }
    }
}

/// Settings from the environment / .env
#[derive(Debug, Clone)]
pub struct Env {
    pub grid_url: String,
    pub port: u16,
    pub log_dir: String,
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            Self::load(path)
        } else {
            tracing::warn!("Config file not found: {:?}, using defaults", path);
            Ok(Self::default())
        }
    }
}

impl Env {
    /// Load settings from .env file and process environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Env {
            grid_url: std::env::var("SONOVERSE_URL")
                .unwrap_or_else(|_| "http://localhost:5000/api/grid".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.colors.low, ColorStop::rgba(0, 0, 0, 255));
        assert_eq!(config.colors.high, ColorStop::rgba(200, 30, 20, 255));
        assert_eq!(config.orbit.radius, [10.0, 10.0, 10.0]);
        assert_eq!(config.grid.resolution, 64);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
colors:
  low: { r: 10, g: 20, b: 30 }
  high: { r: 250, g: 240, b: 230, a: 128 }
orbit:
  radius: [5.0, 6.0, 7.0]
grid:
  resolution: 32
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.colors.low, ColorStop::rgb(10, 20, 30));
        assert_eq!(config.colors.high.a, Some(128));
        assert_eq!(config.orbit.radius, [5.0, 6.0, 7.0]);
        assert_eq!(config.grid.resolution, 32);
        assert_eq!(config.grid.length, 3.0);
        assert_eq!(config.viewer.width, 1200);
    }

    #[test]
    fn test_single_color_stop_keeps_other_default() {
        let yaml = r#"
colors:
  low: { r: 10, g: 20, b: 30, a: 255 }
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.colors.low, ColorStop::rgba(10, 20, 30, 255));
        assert_eq!(config.colors.high, ColorStop::rgba(200, 30, 20, 255));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_or_default("does/not/exist.yaml").unwrap();
        assert_eq!(config.grid.h, 0.1);
    }
}
