use std::fs;
use std::path::{Path, PathBuf};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::Query;
use tantivy::schema::Value;
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use super::schema::{register_tokenizers, DocumentSchema};
use crate::error::{LightgrokError, Result};

/// Heap for the single indexing thread. Tantivy needs at least 15MB per thread.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// How a write session treats documents already in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Start from an empty store; every document is a plain add.
    #[default]
    Create,
    /// Keep existing documents; a document replaces any other with the same path.
    Update,
}

/// One file's worth of index data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: String,
    pub modified_millis: i64,
    pub contents: String,
}

/// Candidates returned by a store query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    /// Every matching document, including those beyond the limit.
    pub total: usize,
    /// Stored paths of the top documents, at most `limit` of them.
    pub paths: Vec<String>,
}

/// A tantivy index holding the documents for one root.
pub struct IndexStore {
    index: Index,
    fields: DocumentSchema,
    location: PathBuf,
}

impl IndexStore {
    /// Create an empty store at `location`, wiping whatever was there.
    pub fn create(location: &Path) -> Result<Self> {
        if location.exists() {
            fs::remove_dir_all(location).map_err(|e| LightgrokError::io(location, e))?;
        }
        fs::create_dir_all(location).map_err(|e| LightgrokError::io(location, e))?;

        let fields = DocumentSchema::new();
        let index = Index::create_in_dir(location, fields.schema.clone())
            .map_err(|e| LightgrokError::store(location, e))?;
        register_tokenizers(&index);

        debug!("created index store at {}", location.display());
        Ok(Self {
            index,
            fields,
            location: location.to_path_buf(),
        })
    }

    pub fn open(location: &Path) -> Result<Self> {
        let index = Index::open_in_dir(location).map_err(|e| LightgrokError::store(location, e))?;
        let fields = DocumentSchema::from_schema(index.schema())
            .map_err(|e| LightgrokError::store(location, e))?;
        register_tokenizers(&index);

        Ok(Self {
            index,
            fields,
            location: location.to_path_buf(),
        })
    }

    pub fn open_or_create(location: &Path) -> Result<Self> {
        if Self::exists(location) {
            Self::open(location)
        } else {
            Self::create(location)
        }
    }

    pub fn exists(location: &Path) -> bool {
        location.join("meta.json").is_file()
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn fields(&self) -> &DocumentSchema {
        &self.fields
    }

    /// The analyzer `contents` is indexed with.
    pub fn contents_analyzer(&self) -> Result<TextAnalyzer> {
        self.index
            .tokenizer_for_field(self.fields.contents)
            .map_err(|e| LightgrokError::store(&self.location, e))
    }

    /// Open the exclusive write session. Fails if another writer holds the lock.
    pub fn writer(&self, mode: WriteMode) -> Result<StoreWriter> {
        let writer = self
            .index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| LightgrokError::store(&self.location, e))?;

        Ok(StoreWriter {
            writer,
            fields: self.fields.clone(),
            location: self.location.clone(),
            mode,
            written: 0,
        })
    }

    fn reader(&self) -> Result<IndexReader> {
        self.index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| LightgrokError::store(&self.location, e))
    }

    pub fn num_docs(&self) -> Result<u64> {
        Ok(self.reader()?.searcher().num_docs())
    }

    /// Run `query`, returning the total hit count and the paths of at most
    /// `limit` documents.
    pub fn query(&self, query: &dyn Query, limit: usize) -> Result<CandidateSet> {
        let searcher = self.reader()?.searcher();
        let (top_docs, total) = searcher
            .search(query, &(TopDocs::with_limit(limit.max(1)), Count))
            .map_err(|e| LightgrokError::store(&self.location, e))?;

        let mut paths = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| LightgrokError::store(&self.location, e))?;
            if let Some(path) = doc.get_first(self.fields.path).and_then(|v| v.as_str()) {
                paths.push(path.to_string());
            }
        }

        Ok(CandidateSet { total, paths })
    }

    /// Paths of every document in the store.
    pub fn all_paths(&self) -> Result<Vec<String>> {
        let total = self.num_docs()? as usize;
        Ok(self.query(&tantivy::query::AllQuery, total)?.paths)
    }
}

/// Exclusive write session over an [`IndexStore`].
///
/// Nothing becomes visible until [`StoreWriter::commit`]; dropping the writer
/// discards pending documents and releases the lock.
pub struct StoreWriter {
    writer: IndexWriter,
    fields: DocumentSchema,
    location: PathBuf,
    mode: WriteMode,
    written: usize,
}

impl StoreWriter {
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Submit a document according to the session's [`WriteMode`].
    pub fn submit(&mut self, doc: &SourceDocument) -> Result<()> {
        match self.mode {
            WriteMode::Create => self.add(doc),
            WriteMode::Update => self.replace(doc),
        }
    }

    /// Unconditional add.
    pub fn add(&mut self, doc: &SourceDocument) -> Result<()> {
        let document = self.to_document(doc);
        self.writer
            .add_document(document)
            .map_err(|e| LightgrokError::store(&self.location, e))?;
        self.written += 1;
        Ok(())
    }

    /// Replace any document whose `path` equals `doc.path`, then add.
    pub fn replace(&mut self, doc: &SourceDocument) -> Result<()> {
        self.writer
            .delete_term(Term::from_field_text(self.fields.path, &doc.path));
        self.add(doc)
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn commit(self) -> Result<()> {
        let StoreWriter {
            mut writer,
            location,
            ..
        } = self;
        writer
            .commit()
            .map_err(|e| LightgrokError::store(&location, e))?;
        writer
            .wait_merging_threads()
            .map_err(|e| LightgrokError::store(&location, e))
    }

    fn to_document(&self, doc: &SourceDocument) -> TantivyDocument {
        let mut document = TantivyDocument::default();
        document.add_text(self.fields.path, &doc.path);
        document.add_i64(self.fields.modified, doc.modified_millis);
        document.add_text(self.fields.contents, &doc.contents);
        document
    }
}

/// Move a fully committed staging store into place, replacing `location`.
pub fn promote(staging: &Path, location: &Path) -> Result<()> {
    if location.exists() {
        fs::remove_dir_all(location).map_err(|e| LightgrokError::io(location, e))?;
    }
    fs::rename(staging, location).map_err(|e| LightgrokError::io(staging, e))
}

/// Best-effort removal of an abandoned staging store.
pub fn discard(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_dir_all(staging) {
            debug!("could not remove staging store {}: {}", staging.display(), e);
        }
    }
}
