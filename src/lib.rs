//! Index a source tree once, then answer case-insensitive substring queries
//! over it grep-style: the index narrows the candidate files and each
//! candidate is re-read to confirm and report matching lines.

pub mod cli;
pub mod cli_types;
pub mod config;
pub mod crawler;
pub mod error;
pub mod indexer;
pub mod lightgrok;
pub mod namespace;
pub mod searcher;
pub mod storage;

// Re-export commonly used types
pub use cli::CliApp;
pub use crate::config::{CrawlConfig, IndexConfig, LightgrokConfig, SearchConfig};
pub use crawler::{ContentTypeDetector, CrawlEntry, Crawler, EligibleFile, MimeGuessDetector, SkipReason, SkippedFile};
pub use error::{LightgrokError, Result};
pub use indexer::{IndexReport, Indexer};
pub use lightgrok::{Lightgrok, LightgrokBuilder};
pub use namespace::{namespace_key, resolve_index_location};
pub use searcher::{LineMatch, MatchSink, SearchOutcome, SearchSummary, Searcher};
pub use storage::WriteMode;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
