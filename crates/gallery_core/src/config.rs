//! Gallery runtime configuration.
//!
//! # Responsibility
//! - Load JSON configuration with every field defaulted.
//! - Validate paging limits and asset URL prefixes.
//!
//! # Invariants
//! - `0 < default_page_size <= max_page_size`.
//! - `thumbnail_root` and `fallback_image` are absolute URL paths.

use crate::logging::default_log_level;
use crate::thumbnail::candidates::{DEFAULT_FALLBACK_IMAGE, DEFAULT_THUMBNAIL_ROOT};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_PAGE_SIZE: u32 = 30;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Gallery configuration loaded from a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// SQLite database file. `None` means the platform temp directory.
    pub db_path: Option<PathBuf>,
    /// Directory serving public assets, used by the filesystem probe.
    pub public_dir: Option<PathBuf>,
    pub thumbnail_root: String,
    pub fallback_image: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    /// File persisting the anonymous user id.
    pub temp_user_id_path: Option<PathBuf>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            public_dir: None,
            thumbnail_root: DEFAULT_THUMBNAIL_ROOT.to_string(),
            fallback_image: DEFAULT_FALLBACK_IMAGE.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            log_level: None,
            log_dir: None,
            temp_user_id_path: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl GalleryConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "default_page_size must be positive".to_string(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        for (field, value) in [
            ("thumbnail_root", &self.thumbnail_root),
            ("fallback_image", &self.fallback_image),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "{field} must start with `/`, got `{value}`"
                )));
            }
        }
        Ok(())
    }

    /// Applies paging defaults: `None`/`0` → default, above max → max.
    pub fn normalize_page_size(&self, page_size: Option<u32>) -> u32 {
        match page_size {
            None | Some(0) => self.default_page_size,
            Some(value) => value.min(self.max_page_size),
        }
    }

    pub fn effective_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .unwrap_or(default_log_level())
    }
}

/// Reads, parses and validates a config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<GalleryConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    GalleryConfig::from_json(&text)
}
