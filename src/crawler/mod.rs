//! Directory crawl that decides which files get indexed.

pub mod detect;
pub mod filter;

pub use detect::{ContentTypeDetector, MimeGuessDetector};
pub use filter::{match_key, Decision, EntryKind, FilterPolicy, SkipReason};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::CrawlConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleFile {
    pub path: PathBuf,
    /// Last modification time, milliseconds since the Unix epoch.
    pub modified_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEntry {
    Eligible(EligibleFile),
    Skipped(SkippedFile),
}

impl CrawlEntry {
    pub fn into_eligible(self) -> Option<EligibleFile> {
        match self {
            CrawlEntry::Eligible(file) => Some(file),
            CrawlEntry::Skipped(_) => None,
        }
    }

    fn skipped(path: impl Into<PathBuf>, reason: SkipReason) -> Self {
        let path = path.into();
        debug!("skip {}: {}", path.display(), reason);
        CrawlEntry::Skipped(SkippedFile { path, reason })
    }
}

/// Walks a root and classifies every entry with a [`FilterPolicy`].
pub struct Crawler {
    policy: FilterPolicy,
    detector: Arc<dyn ContentTypeDetector>,
    follow_symlinks: bool,
    max_depth: Option<usize>,
}

impl Crawler {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            policy: FilterPolicy::from_config(config),
            detector: Arc::new(MimeGuessDetector),
            follow_symlinks: config.follow_symlinks,
            max_depth: config.max_depth,
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn ContentTypeDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// Lazily walk `root`.
    ///
    /// A directory root is walked with every rule applied. Any other root is
    /// yielded as the single eligible file, unfiltered.
    pub fn walk(&self, root: &Path) -> Crawl<'_> {
        let state = if root.is_dir() {
            let mut walker = WalkDir::new(root).follow_links(self.follow_symlinks);
            if let Some(depth) = self.max_depth {
                walker = walker.max_depth(depth);
            }
            CrawlState::Tree(walker.into_iter())
        } else {
            CrawlState::Single(Some(root.to_path_buf()))
        };

        Crawl {
            crawler: self,
            root: root.to_path_buf(),
            state,
        }
    }

    fn single_file(&self, path: PathBuf) -> CrawlEntry {
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => CrawlEntry::Eligible(EligibleFile {
                modified_millis: modified_millis(&meta),
                path,
            }),
            Ok(_) => CrawlEntry::skipped(path, SkipReason::NotRegularFile),
            Err(e) => CrawlEntry::skipped(path, SkipReason::Unreadable(e.to_string())),
        }
    }

    fn classify_file(&self, root: &Path, entry: &DirEntry) -> Option<CrawlEntry> {
        let path = entry.path();
        if !entry.file_type().is_file() {
            return Some(CrawlEntry::skipped(path, SkipReason::NotRegularFile));
        }

        let key = match_key(root, path, EntryKind::File);
        let detected = self.detector.detect(path);
        match self.policy.decide(&key, EntryKind::File, detected.as_ref()) {
            Decision::Include => Some(match entry.metadata() {
                Ok(meta) => CrawlEntry::Eligible(EligibleFile {
                    path: path.to_path_buf(),
                    modified_millis: modified_millis(&meta),
                }),
                Err(e) => CrawlEntry::skipped(path, SkipReason::Unreadable(e.to_string())),
            }),
            Decision::Exclude(reason) => Some(CrawlEntry::skipped(path, reason)),
            Decision::Descend | Decision::SkipSubtree(_) => None,
        }
    }
}

enum CrawlState {
    Single(Option<PathBuf>),
    Tree(walkdir::IntoIter),
}

/// Single-pass iterator returned by [`Crawler::walk`].
pub struct Crawl<'a> {
    crawler: &'a Crawler,
    root: PathBuf,
    state: CrawlState,
}

impl Iterator for Crawl<'_> {
    type Item = CrawlEntry;

    fn next(&mut self) -> Option<CrawlEntry> {
        let crawler = self.crawler;
        let walker = match &mut self.state {
            CrawlState::Single(path) => return path.take().map(|p| crawler.single_file(p)),
            CrawlState::Tree(walker) => walker,
        };

        loop {
            let entry = match walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(CrawlEntry::skipped(path, SkipReason::Unreadable(err.to_string())));
                }
            };

            if entry.file_type().is_dir() {
                if entry.depth() == 0 {
                    continue;
                }
                let key = match_key(&self.root, entry.path(), EntryKind::Directory);
                if let Decision::SkipSubtree(pattern) =
                    crawler.policy.decide(&key, EntryKind::Directory, None)
                {
                    walker.skip_current_dir();
                    return Some(CrawlEntry::skipped(entry.into_path(), SkipReason::Pruned(pattern)));
                }
                continue;
            }

            if let Some(outcome) = crawler.classify_file(&self.root, &entry) {
                return Some(outcome);
            }
        }
    }
}

fn modified_millis(meta: &Metadata) -> i64 {
    meta.modified()
        .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
        .unwrap_or_default()
}
