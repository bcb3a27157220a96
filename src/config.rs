use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LightgrokError, Result};

/// Default number of candidate documents examined per search.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 5000;
/// Default number of characters of a matching line that get reported.
pub const DEFAULT_MAX_LINE_CHARS: usize = 200;

const ENV_PREFIX: &str = "LIGHTGROK";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LightgrokConfig {
    pub index: IndexConfig,
    pub crawl: CrawlConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding one store per indexed root.
    pub root: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("lightgrok").join("index"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlConfig {
    /// Path substrings that prune a directory (and exclude a file).
    pub prune_patterns: Vec<String>,
    /// File name suffixes of packaged binaries that are never indexed.
    pub packaged_extensions: Vec<String>,
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            prune_patterns: [
                ".git",
                "LayoutTests",
                "PerformanceTests",
                "/.tars",
                "/.svn",
                "/android-sdk-linux/",
                "/out/",
                "/ucbrowser/OUT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            packaged_extensions: vec![".jar".to_string(), ".apk".to_string(), ".tgz".to_string()],
            follow_symlinks: false,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub candidate_limit: usize,
    pub max_line_chars: usize,
    /// Report paths under the root as `./relative/path`.
    pub strip_root_prefix: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            max_line_chars: DEFAULT_MAX_LINE_CHARS,
            strip_root_prefix: false,
        }
    }
}

impl LightgrokConfig {
    /// Load configuration from defaults, an optional TOML file and the
    /// `LIGHTGROK_<SECTION>__<KEY>` environment.
    ///
    /// An explicit `path` must exist; the per-user file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_config_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| LightgrokError::Config(e.to_string()))?;
        let config: LightgrokConfig = settings
            .try_deserialize()
            .map_err(|e| LightgrokError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/lightgrok/config.toml` for the current user.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lightgrok")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.candidate_limit == 0 {
            return Err(LightgrokError::Config(
                "search.candidate_limit must be at least 1".to_string(),
            ));
        }
        if self.search.max_line_chars == 0 {
            return Err(LightgrokError::Config(
                "search.max_line_chars must be at least 1".to_string(),
            ));
        }
        if self.index.root.as_os_str().is_empty() {
            return Err(LightgrokError::Config("index.root must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LightgrokError::Config(e.to_string()))
    }
}
