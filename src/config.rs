//! Site configuration.
//!
//! Loaded from `config.toml` in the XDG config directory (or an explicit
//! path). Every field has a default, so a missing file or a partial file both
//! work.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::layout::RowPacker;
use crate::models::Dimensions;

const CONFIG_FILE: &str = "config.toml";

/// A gallery tab and the collection folder it lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub label: String,
}

impl Tab {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,
    /// Directory holding one sub-folder per collection.
    pub media_root: PathBuf,
    /// URL path the media root is served under.
    pub url_prefix: String,
    /// Target row width in layout units.
    pub row_width: u32,
    /// Row height basis for scaled widths.
    pub target_row_height: u32,
    /// Per-item gap allowance in layout units.
    pub item_gap: u32,
    /// Dimensions assumed for media whose size cannot be probed.
    pub default_dimensions: Dimensions,
    /// Collection listed when a request names none.
    pub default_collection: String,
    pub tabs: Vec<Tab>,
    /// Seed for server-side shuffles; entropy when unset.
    pub shuffle_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            media_root: PathBuf::from("public/gallery-images"),
            url_prefix: "/gallery-images".to_string(),
            row_width: 2000,
            target_row_height: 400,
            item_gap: 32,
            default_dimensions: Dimensions::new(1920, 1080),
            default_collection: "outfit1".to_string(),
            tabs: vec![
                Tab::new("outfit1", "STYLE 1"),
                Tab::new("outfit2", "STYLE 2"),
                Tab::new("outfit3", "STYLE 3"),
                Tab::new("other", "OTHER STYLES"),
            ],
            shuffle_seed: None,
        }
    }
}

impl Config {
    /// Returns the default config path based on XDG directories.
    pub fn default_path() -> Result<PathBuf> {
        let dirs =
            ProjectDirs::from("", "", "folio").context("Failed to determine project directories")?;
        Ok(dirs.config_dir().join(CONFIG_FILE))
    }

    /// Loads `path`, or the XDG default when `None`. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn packer(&self) -> RowPacker {
        RowPacker::new(self.row_width, self.item_gap)
    }

    pub fn tab(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.row_width, 2000);
        assert_eq!(config.target_row_height, 400);
        assert_eq!(config.item_gap, 32);
        assert_eq!(config.default_dimensions, Dimensions::new(1920, 1080));
        assert_eq!(config.tabs.len(), 4);
        assert_eq!(config.tab("other").map(|t| t.label.as_str()), Some("OTHER STYLES"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
row_width = 1600
media_root = "/srv/media"

[default_dimensions]
width = 1280
height = 720

[[tabs]]
id = "film"
label = "FILM"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.row_width, 1600);
        assert_eq!(config.media_root, PathBuf::from("/srv/media"));
        assert_eq!(config.default_dimensions, Dimensions::new(1280, 720));
        assert_eq!(config.tabs, vec![Tab::new("film", "FILM")]);
        assert_eq!(config.item_gap, 32);
        assert_eq!(config.packer().row_width, 1600);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "row_width = \"wide\"").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
