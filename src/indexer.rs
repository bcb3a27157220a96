use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::LightgrokConfig;
use crate::crawler::{ContentTypeDetector, CrawlEntry, Crawler, EligibleFile, SkipReason, SkippedFile};
use crate::error::Result;
use crate::namespace::{canonical_root, resolve_index_location};
use crate::storage::store::{discard, promote};
use crate::storage::{IndexStore, SourceDocument, WriteMode};

/// Outcome of one indexing run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub root: PathBuf,
    pub location: PathBuf,
    #[serde(skip)]
    pub mode: WriteMode,
    pub indexed: usize,
    pub skipped: Vec<SkippedFile>,
    pub duration: Duration,
}

impl IndexReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Builds the index store for a root.
pub struct Indexer {
    index_root: PathBuf,
    crawler: Crawler,
}

impl Indexer {
    pub fn new(config: &LightgrokConfig) -> Self {
        Self {
            index_root: config.index.root.clone(),
            crawler: Crawler::new(&config.crawl),
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn ContentTypeDetector>) -> Self {
        self.crawler = self.crawler.with_detector(detector);
        self
    }

    pub fn index_root(&self) -> &Path {
        &self.index_root
    }

    /// Where the store for `root` lives.
    pub fn index_location(&self, root: &Path) -> Result<PathBuf> {
        Ok(resolve_index_location(&self.index_root, &canonical_root(root)?))
    }

    /// Rebuild the store for `root` from scratch.
    pub fn rebuild(&self, root: &Path) -> Result<IndexReport> {
        self.run(root, WriteMode::Create, |_| {})
    }

    /// Re-index every eligible file into the existing store, replacing
    /// documents by path. Documents for files that vanished are kept.
    pub fn update(&self, root: &Path) -> Result<IndexReport> {
        self.run(root, WriteMode::Update, |_| {})
    }

    /// Index `root` in the given mode, calling `on_file` before each eligible
    /// file is read.
    ///
    /// In [`WriteMode::Create`] the store is built in a staging directory and
    /// only moved into place after a successful commit. On failure the
    /// staging directory is removed and any previous store stays untouched.
    pub fn run<F>(&self, root: &Path, mode: WriteMode, mut on_file: F) -> Result<IndexReport>
    where
        F: FnMut(&Path),
    {
        let start = Instant::now();
        let root = canonical_root(root)?;
        let location = resolve_index_location(&self.index_root, &root);
        info!("Indexing {} into {}", root.display(), location.display());

        let (indexed, skipped) = match mode {
            WriteMode::Create => {
                let staging = staging_location(&location);
                let outcome = IndexStore::create(&staging)
                    .and_then(|store| self.populate(&store, &root, mode, &mut on_file))
                    .and_then(|counts| promote(&staging, &location).map(|_| counts));
                match outcome {
                    Ok(counts) => counts,
                    Err(e) => {
                        discard(&staging);
                        return Err(e);
                    }
                }
            }
            WriteMode::Update => {
                let store = IndexStore::open_or_create(&location)?;
                self.populate(&store, &root, mode, &mut on_file)?
            }
        };

        let duration = start.elapsed();
        info!(
            "Indexed {} files ({} skipped) in {} ms",
            indexed,
            skipped.len(),
            duration.as_millis()
        );

        Ok(IndexReport {
            root,
            location,
            mode,
            indexed,
            skipped,
            duration,
        })
    }

    fn populate<F>(
        &self,
        store: &IndexStore,
        root: &Path,
        mode: WriteMode,
        on_file: &mut F,
    ) -> Result<(usize, Vec<SkippedFile>)>
    where
        F: FnMut(&Path),
    {
        let mut writer = store.writer(mode)?;
        let mut skipped = Vec::new();

        for entry in self.crawler.walk(root) {
            match entry {
                CrawlEntry::Eligible(file) => {
                    on_file(&file.path);
                    match read_document(&file) {
                        Ok(doc) => {
                            writer.submit(&doc)?;
                            debug!("added {}", doc.path);
                        }
                        Err(reason) => {
                            debug!("skip {}: {}", file.path.display(), reason);
                            skipped.push(SkippedFile {
                                path: file.path,
                                reason,
                            });
                        }
                    }
                }
                CrawlEntry::Skipped(skip) => skipped.push(skip),
            }
        }

        let indexed = writer.written();
        writer.commit()?;
        Ok((indexed, skipped))
    }
}

fn read_document(file: &EligibleFile) -> std::result::Result<SourceDocument, SkipReason> {
    let bytes = fs::read(&file.path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    Ok(SourceDocument {
        path: file.path.to_string_lossy().into_owned(),
        modified_millis: file.modified_millis,
        contents: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// `<location>.staging`, a sibling of the live store.
fn staging_location(location: &Path) -> PathBuf {
    let mut name = location
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".staging");
    location.with_file_name(name)
}
