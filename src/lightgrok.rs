//! Public entry point tying the indexer and searcher to one configuration.
//!
//! ```no_run
//! use lightgrok::Lightgrok;
//! use std::path::Path;
//!
//! let grok = Lightgrok::builder()
//!     .index_root("/tmp/lightgrok-index")
//!     .strip_root_prefix(true)
//!     .build()?;
//!
//! grok.index(Path::new("./src"))?;
//! for line in grok.search(Path::new("./src"), "hello")?.matches {
//!     println!("{}", line);
//! }
//! # Ok::<(), lightgrok::LightgrokError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::LightgrokConfig;
use crate::crawler::ContentTypeDetector;
use crate::error::Result;
use crate::indexer::{IndexReport, Indexer};
use crate::searcher::{MatchSink, SearchOutcome, SearchSummary, Searcher};
use crate::storage::{IndexStore, WriteMode};

pub struct Lightgrok {
    config: LightgrokConfig,
    indexer: Indexer,
    searcher: Searcher,
}

impl Lightgrok {
    pub fn builder() -> LightgrokBuilder {
        LightgrokBuilder::default()
    }

    pub fn from_config(config: LightgrokConfig) -> Result<Self> {
        Self::assemble(config, None)
    }

    fn assemble(config: LightgrokConfig, detector: Option<Arc<dyn ContentTypeDetector>>) -> Result<Self> {
        config.validate()?;
        let mut indexer = Indexer::new(&config);
        if let Some(detector) = detector {
            indexer = indexer.with_detector(detector);
        }
        let searcher = Searcher::from_config(&config);
        Ok(Self {
            config,
            indexer,
            searcher,
        })
    }

    pub fn config(&self) -> &LightgrokConfig {
        &self.config
    }

    /// Rebuild the store for `root` from scratch.
    pub fn index(&self, root: &Path) -> Result<IndexReport> {
        self.indexer.rebuild(root)
    }

    /// Re-index `root` into its existing store, replacing documents by path.
    pub fn update(&self, root: &Path) -> Result<IndexReport> {
        self.indexer.update(root)
    }

    /// Index with a per-file progress callback.
    pub fn index_with_progress<F>(&self, root: &Path, mode: WriteMode, on_file: F) -> Result<IndexReport>
    where
        F: FnMut(&Path),
    {
        self.indexer.run(root, mode, on_file)
    }

    pub fn search(&self, root: &Path, query: &str) -> Result<SearchOutcome> {
        self.searcher.search(root, query)
    }

    pub fn search_into(&self, root: &Path, query: &str, sink: &mut dyn MatchSink) -> Result<SearchSummary> {
        self.searcher.search_into(root, query, sink)
    }

    pub fn index_location(&self, root: &Path) -> Result<PathBuf> {
        self.indexer.index_location(root)
    }

    pub fn is_indexed(&self, root: &Path) -> Result<bool> {
        Ok(IndexStore::exists(&self.index_location(root)?))
    }
}

/// Builder for [`Lightgrok`]; starts from [`LightgrokConfig::default`].
#[derive(Default)]
pub struct LightgrokBuilder {
    config: LightgrokConfig,
    detector: Option<Arc<dyn ContentTypeDetector>>,
}

impl LightgrokBuilder {
    /// Replace the whole configuration; later setters still apply on top.
    pub fn config(mut self, config: LightgrokConfig) -> Self {
        self.config = config;
        self
    }

    pub fn index_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.index.root = root.into();
        self
    }

    pub fn candidate_limit(mut self, limit: usize) -> Self {
        self.config.search.candidate_limit = limit;
        self
    }

    pub fn max_line_chars(mut self, chars: usize) -> Self {
        self.config.search.max_line_chars = chars;
        self
    }

    pub fn strip_root_prefix(mut self, strip: bool) -> Self {
        self.config.search.strip_root_prefix = strip;
        self
    }

    pub fn prune_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.crawl.prune_patterns = patterns;
        self
    }

    pub fn packaged_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.crawl.packaged_extensions = extensions;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.crawl.follow_symlinks = follow;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.crawl.max_depth = Some(depth);
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn ContentTypeDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn build(self) -> Result<Lightgrok> {
        Lightgrok::assemble(self.config, self.detector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::detect::MockContentTypeDetector;
    use crate::error::LightgrokError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builder_applies_settings() {
        let grok = Lightgrok::builder()
            .index_root("/tmp/somewhere")
            .candidate_limit(10)
            .max_line_chars(80)
            .strip_root_prefix(true)
            .max_depth(3)
            .follow_symlinks(true)
            .prune_patterns(vec!["/vendor/".to_string()])
            .packaged_extensions(vec![".zip".to_string()])
            .build()
            .unwrap();

        let config = grok.config();
        assert_eq!(config.index.root, PathBuf::from("/tmp/somewhere"));
        assert_eq!(config.search.candidate_limit, 10);
        assert_eq!(config.search.max_line_chars, 80);
        assert!(config.search.strip_root_prefix);
        assert_eq!(config.crawl.max_depth, Some(3));
        assert!(config.crawl.follow_symlinks);
        assert_eq!(config.crawl.prune_patterns, vec!["/vendor/"]);
        assert_eq!(config.crawl.packaged_extensions, vec![".zip"]);
    }

    #[test]
    fn test_builder_rejects_invalid_limits() {
        let result = Lightgrok::builder().candidate_limit(0).build();
        assert!(matches!(result, Err(LightgrokError::Config(_))));
    }

    #[test]
    fn test_index_then_search() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("src");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.txt"), "hello world").unwrap();

        let grok = Lightgrok::builder()
            .index_root(temp_dir.path().join("index"))
            .strip_root_prefix(true)
            .build()
            .unwrap();

        assert!(!grok.is_indexed(&root).unwrap());
        assert_eq!(grok.index(&root).unwrap().indexed, 1);
        assert!(grok.is_indexed(&root).unwrap());

        let outcome = grok.search(&root, "World").unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].to_string(), "./a.txt:1:\thello world");
    }

    #[test]
    fn test_custom_detector_is_used() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("src");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.txt"), "hello").unwrap();

        let mut detector = MockContentTypeDetector::new();
        detector.expect_detect().returning(|_| None);

        let grok = Lightgrok::builder()
            .index_root(temp_dir.path().join("index"))
            .with_detector(Arc::new(detector))
            .build()
            .unwrap();

        let report = grok.index(&root).unwrap();
        assert_eq!(report.indexed, 0);
        assert_eq!(report.skipped_count(), 1);
    }
}
