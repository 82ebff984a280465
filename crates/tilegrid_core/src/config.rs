//! Map construction settings

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::geometry::{GridSize, TileSize};

fn default_grid_size() -> GridSize {
    GridSize::new(5, 5)
}

fn default_max_grid_size() -> GridSize {
    GridSize::new(100, 100)
}

/// Tile size and grid size bounds of a [`GridMap`](crate::GridMap)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMapConfig {
    #[serde(default)]
    pub tile_size: TileSize,
    /// Initial size; clamped into `[min_grid_size, max_grid_size]`
    #[serde(default = "default_grid_size")]
    pub grid_size: GridSize,
    #[serde(default = "default_grid_size")]
    pub min_grid_size: GridSize,
    #[serde(default = "default_max_grid_size")]
    pub max_grid_size: GridSize,
}

impl Default for GridMapConfig {
    fn default() -> Self {
        Self {
            tile_size: TileSize::default(),
            grid_size: default_grid_size(),
            min_grid_size: default_grid_size(),
            max_grid_size: default_max_grid_size(),
        }
    }
}

impl GridMapConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_grid_size.width > self.max_grid_size.width
            || self.min_grid_size.height > self.max_grid_size.height
        {
            return Err(ConfigError::Invalid(format!(
                "min_grid_size {} exceeds max_grid_size {}",
                self.min_grid_size, self.max_grid_size
            )));
        }
        if self.tile_size.width == 0 || self.tile_size.height == 0 {
            return Err(ConfigError::Invalid("tile_size must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GridMapConfig::from_toml_str("").unwrap();
        assert_eq!(config, GridMapConfig::default());
        assert_eq!(config.tile_size, TileSize::new(16, 16));
        assert_eq!(config.max_grid_size, GridSize::new(100, 100));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            tile_size = [32, 32]
            grid_size = [20, 12]
            max_grid_size = [64, 64]
        "#;
        let config = GridMapConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.tile_size, TileSize::new(32, 32));
        assert_eq!(config.grid_size, GridSize::new(20, 12));
        assert_eq!(config.min_grid_size, GridSize::new(5, 5));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let toml_str = r#"
            min_grid_size = [10, 10]
            max_grid_size = [8, 20]
        "#;
        assert!(matches!(
            GridMapConfig::from_toml_str(toml_str),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "grid_size = [7, 9]").unwrap();
        let config = GridMapConfig::load(file.path()).unwrap();
        assert_eq!(config.grid_size, GridSize::new(7, 9));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            GridMapConfig::from_toml_str("grid_size = \"big\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
