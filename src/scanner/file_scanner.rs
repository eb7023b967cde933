//! Collection lister.
//!
//! Each collection is one folder under the media root. Listing reads the
//! folder (non-recursively), keeps recognised media files, probes their
//! dimensions and returns descriptors ordered widest first.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::task;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::{Dimensions, MediaDescriptor, MediaKind};
use crate::scanner::metadata::DimensionProbe;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),
    #[error("failed to create collection directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read collection directory {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("listing task failed: {0}")]
    Task(String),
}

/// Settings the lister needs, split out of [`Config`].
#[derive(Debug, Clone)]
pub struct ListConfig {
    /// Directory holding one sub-folder per collection.
    pub media_root: PathBuf,
    /// URL path the media root is served under.
    pub url_prefix: String,
    /// Row height basis for scaled widths.
    pub target_row_height: u32,
    /// Dimensions assumed when probing fails.
    pub default_dimensions: Dimensions,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ListConfig {
    fn from(config: &Config) -> Self {
        Self {
            media_root: config.media_root.clone(),
            url_prefix: config.url_prefix.clone(),
            target_row_height: config.target_row_height,
            default_dimensions: config.default_dimensions,
        }
    }
}

/// Lists media descriptors for named collections.
#[derive(Debug, Clone)]
pub struct MediaLister {
    config: ListConfig,
    probe: DimensionProbe,
}

impl MediaLister {
    pub fn new(config: ListConfig) -> Self {
        let probe = DimensionProbe::new(config.default_dimensions);
        Self { config, probe }
    }

    /// Lists a collection on the blocking pool.
    pub async fn list_async(
        &self,
        collection: &str,
    ) -> Result<Vec<MediaDescriptor>, ListingError> {
        let lister = self.clone();
        let collection = collection.to_string();
        task::spawn_blocking(move || lister.list(&collection))
            .await
            .map_err(|e| ListingError::Task(e.to_string()))?
    }

    /// Lists a collection.
    ///
    /// A missing collection folder is created and listed as empty.
    pub fn list(&self, collection: &str) -> Result<Vec<MediaDescriptor>, ListingError> {
        validate_collection(collection)?;
        let dir = self.config.media_root.join(collection);

        if !dir.exists() {
            info!("Creating missing collection directory {:?}", dir);
            fs::create_dir_all(&dir).map_err(|source| ListingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            return Ok(Vec::new());
        }

        let files = Self::discover_files(&dir)?;
        debug!("Discovered {} media files in {:?}", files.len(), dir);

        let mut items: Vec<MediaDescriptor> = files
            .into_iter()
            .enumerate()
            .map(|(index, (path, kind))| self.describe(collection, index as u32 + 1, &path, kind))
            .collect();

        // Widest first; the sort is stable so equal widths stay in name order
        items.sort_by(|a, b| b.scaled_width.cmp(&a.scaled_width));

        info!("Listed {} items for collection {}", items.len(), collection);
        Ok(items)
    }

    /// Media files directly inside `dir`, in file-name order.
    fn discover_files(dir: &Path) -> Result<Vec<(PathBuf, MediaKind)>, ListingError> {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // The collection folder itself is unreadable
                Err(source) if source.depth() == 0 => {
                    return Err(ListingError::Read {
                        path: dir.to_path_buf(),
                        source,
                    })
                }
                Err(e) => {
                    warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let ext = entry.path().extension().and_then(|e| e.to_str()).unwrap_or("");
            if let Some(kind) = MediaKind::from_extension(ext) {
                files.push((entry.into_path(), kind));
            }
        }

        Ok(files)
    }

    fn describe(&self, collection: &str, id: u32, path: &Path, kind: MediaKind) -> MediaDescriptor {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let src = format!(
            "{}/{}/{}",
            self.config.url_prefix.trim_end_matches('/'),
            collection,
            file_name
        );
        let dims = self.probe.dimensions(path, kind);

        MediaDescriptor::new(
            id,
            src,
            kind,
            dims,
            self.probe.fallback(),
            self.config.target_row_height,
        )
    }
}

/// Collection names are single path segments of letters, digits, `-` and `_`.
pub fn validate_collection(collection: &str) -> Result<(), ListingError> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ListingError::InvalidCollection(collection.to_string()))
    }
}
