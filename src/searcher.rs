//! Two-phase search: index recall, then line-level verification on disk.
//!
//! The index only narrows the set of files worth reading. Every reported
//! line comes from re-reading the candidate file, so results reflect the
//! live file content and exact case-insensitive substring semantics.

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, RegexQuery};
use tracing::{debug, info, warn};

use crate::config::{LightgrokConfig, SearchConfig};
use crate::crawler::{SkipReason, SkippedFile};
use crate::error::{LightgrokError, Result};
use crate::namespace::{canonical_root, display_path, resolve_index_location};
use crate::storage::schema::tokenize;
use crate::storage::IndexStore;

/// One verified matching line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    pub path: String,
    /// 1-based.
    pub line_number: usize,
    /// Leading characters of the line, capped at `max_line_chars`.
    pub line: String,
}

impl fmt::Display for LineMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:\t{}", self.path, self.line_number, self.line)
    }
}

/// Receives search results as they are produced.
pub trait MatchSink {
    /// Called once, after the index query and before any file is scanned.
    fn candidates(&mut self, _total: usize, _examined: usize) {}

    fn matched(&mut self, line: &LineMatch);

    fn skipped(&mut self, _file: &SkippedFile) {}
}

/// Counters for a streamed search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    /// Documents the index matched, before the candidate cap.
    pub total_candidates: usize,
    /// Candidates actually re-scanned.
    pub examined: usize,
    pub matched_lines: usize,
    pub skipped: usize,
}

/// Collected results of [`Searcher::search`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub total_candidates: usize,
    pub examined: usize,
    pub matches: Vec<LineMatch>,
    pub skipped: Vec<SkippedFile>,
}

impl MatchSink for SearchOutcome {
    fn candidates(&mut self, total: usize, examined: usize) {
        self.total_candidates = total;
        self.examined = examined;
    }

    fn matched(&mut self, line: &LineMatch) {
        self.matches.push(line.clone());
    }

    fn skipped(&mut self, file: &SkippedFile) {
        self.skipped.push(file.clone());
    }
}

/// Case-insensitive substring test plus reporting truncation.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    needle: String,
    max_chars: usize,
}

impl LineMatcher {
    pub fn new(query: &str, max_chars: usize) -> Self {
        Self {
            needle: fold_case(query),
            max_chars,
        }
    }

    pub fn is_match(&self, line: &str) -> bool {
        fold_case(line).contains(&self.needle)
    }

    /// The first `max_chars` characters of `line`.
    pub fn truncate<'a>(&self, line: &'a str) -> &'a str {
        match line.char_indices().nth(self.max_chars) {
            Some((idx, _)) => &line[..idx],
            None => line,
        }
    }
}

/// Per-character lowercase. Unlike `str::to_lowercase` this has no
/// word-final sigma rule, so a substring folds the same way inside a longer
/// line as it does on its own.
fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

pub struct Searcher {
    index_root: PathBuf,
    config: SearchConfig,
}

impl Searcher {
    pub fn new(index_root: impl Into<PathBuf>, config: SearchConfig) -> Self {
        Self {
            index_root: index_root.into(),
            config,
        }
    }

    pub fn from_config(config: &LightgrokConfig) -> Self {
        Self::new(config.index.root.clone(), config.search.clone())
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search `root`'s store for `query` and collect every verified line.
    pub fn search(&self, root: &Path, query: &str) -> Result<SearchOutcome> {
        let mut outcome = SearchOutcome::default();
        self.search_into(root, query, &mut outcome)?;
        Ok(outcome)
    }

    /// Streaming form of [`Searcher::search`].
    pub fn search_into(&self, root: &Path, query: &str, sink: &mut dyn MatchSink) -> Result<SearchSummary> {
        if query.trim().is_empty() {
            return Err(LightgrokError::InvalidQuery {
                query: query.to_string(),
                reason: "query is empty".to_string(),
            });
        }

        let root = canonical_root(root)?;
        let location = resolve_index_location(&self.index_root, &root);
        if !IndexStore::exists(&location) {
            return Err(LightgrokError::IndexNotFound { root, location });
        }

        let store = IndexStore::open(&location)?;
        let recall = recall_query(&store, query)?;
        let candidates = store.query(recall.as_ref(), self.config.candidate_limit)?;
        info!(
            "{} total matching documents, scanning {}",
            candidates.total,
            candidates.paths.len()
        );

        let mut summary = SearchSummary {
            total_candidates: candidates.total,
            examined: candidates.paths.len(),
            ..SearchSummary::default()
        };
        sink.candidates(summary.total_candidates, summary.examined);

        let matcher = LineMatcher::new(query, self.config.max_line_chars);
        for path in &candidates.paths {
            let shown = display_path(path, &root, self.config.strip_root_prefix);
            match scan_candidate(Path::new(path), &shown, &matcher, sink) {
                Ok(matched) => summary.matched_lines += matched,
                Err(e) => {
                    warn!("cannot re-read candidate {}: {}", path, e);
                    summary.skipped += 1;
                    sink.skipped(&SkippedFile {
                        path: PathBuf::from(path),
                        reason: SkipReason::Unreadable(e.to_string()),
                    });
                }
            }
        }

        Ok(summary)
    }
}

/// Longest token prefix turned into a recall regex. Longer tokens blow
/// tantivy's compiled-regex state limit; any prefix still recalls a superset.
const MAX_RECALL_TOKEN_CHARS: usize = 64;

/// Broadened query over `contents`.
///
/// Each token the `contents` analyzer produces from `query` must occur as a
/// substring of some indexed term (`.*token.*`), using at most the first
/// [`MAX_RECALL_TOKEN_CHARS`] characters of the token. A query with no tokens
/// recalls every document.
pub fn recall_query(store: &IndexStore, query: &str) -> Result<Box<dyn Query>> {
    let mut analyzer = store.contents_analyzer()?;
    let mut tokens: Vec<String> = tokenize(&mut analyzer, query)
        .into_iter()
        .map(|token| token.chars().take(MAX_RECALL_TOKEN_CHARS).collect())
        .collect();
    tokens.sort();
    tokens.dedup();

    if tokens.is_empty() {
        debug!("query '{}' has no indexable tokens; recalling all documents", query);
        return Ok(Box::new(AllQuery));
    }

    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let pattern = format!(".*{}.*", regex::escape(token));
        let term_query = RegexQuery::from_pattern(&pattern, store.fields().contents).map_err(|e| {
            LightgrokError::InvalidQuery {
                query: query.to_string(),
                reason: e.to_string(),
            }
        })?;
        clauses.push((Occur::Must, Box::new(term_query)));
    }

    if clauses.len() == 1 {
        let (_, only) = clauses.remove(0);
        return Ok(only);
    }
    Ok(Box::new(BooleanQuery::new(clauses)))
}

/// Re-read one candidate and report its matching lines. Returns the number of
/// lines reported.
fn scan_candidate(
    path: &Path,
    shown: &str,
    matcher: &LineMatcher,
    sink: &mut dyn MatchSink,
) -> std::io::Result<usize> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    let mut line_number = 0;
    let mut matched = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        // A line ends at `\n`, `\r\n` or a lone `\r`
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        for segment in buf.split(|&b| b == b'\r') {
            line_number += 1;
            let line = String::from_utf8_lossy(segment);
            if matcher.is_match(&line) {
                sink.matched(&LineMatch {
                    path: shown.to_string(),
                    line_number,
                    line: matcher.truncate(&line).to_string(),
                });
                matched += 1;
            }
        }
    }

    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Indexer;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        root: PathBuf,
        config: LightgrokConfig,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let root = temp_dir.path().join("src");
            fs::create_dir_all(&root).unwrap();
            for (relative, content) in files {
                let path = root.join(relative);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }

            let mut config = LightgrokConfig::default();
            config.index.root = temp_dir.path().join("index");
            Self {
                root: canonical_root(&root).unwrap(),
                _temp_dir: temp_dir,
                config,
            }
        }

        fn indexed(self) -> Self {
            Indexer::new(&self.config).rebuild(&self.root).unwrap();
            self
        }

        fn path(&self, relative: &str) -> String {
            self.root.join(relative).to_string_lossy().into_owned()
        }

        fn search(&self, query: &str) -> SearchOutcome {
            Searcher::from_config(&self.config).search(&self.root, query).unwrap()
        }
    }

    #[test]
    fn test_case_insensitive_line_matches() {
        let fixture = Fixture::new(&[
            ("a.txt", "hello world\nsecond line\nHello again\n"),
            ("b.txt", "nothing to see\n"),
        ])
        .indexed();

        for query in ["hello", "HELLO", "hElLo"] {
            let outcome = fixture.search(query);
            let lines: Vec<(String, usize)> = outcome
                .matches
                .iter()
                .map(|m| (m.path.clone(), m.line_number))
                .collect();
            assert_eq!(lines, vec![(fixture.path("a.txt"), 1), (fixture.path("a.txt"), 3)]);
        }
    }

    #[test]
    fn test_world_example_format() {
        let fixture = Fixture::new(&[("a.txt", "hello world")]).indexed();
        let outcome = fixture.search("WORLD");
        assert_eq!(outcome.total_candidates, 1);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(
            outcome.matches[0].to_string(),
            format!("{}:1:\thello world", fixture.path("a.txt"))
        );
    }

    #[test]
    fn test_substring_inside_and_across_tokens() {
        let fixture = Fixture::new(&[
            ("a.txt", "fn parse_arguments(argv: &[String])\n"),
            ("b.txt", "unrelated\n"),
        ])
        .indexed();

        assert_eq!(fixture.search("rse_argu").matches.len(), 1);
        assert_eq!(fixture.search("ARGUMENTS(ARGV").matches.len(), 1);
        assert_eq!(fixture.search("ments(argv: &[Str").matches.len(), 1);
        assert!(fixture.search("arguments argv").matches.is_empty());
    }

    #[test]
    fn test_never_reports_non_matching_lines() {
        let fixture = Fixture::new(&[
            ("a.txt", "alpha beta\nbeta gamma\nalphabet soup\n"),
            ("b.txt", "ALPHA\nomega\n"),
        ])
        .indexed();

        let outcome = fixture.search("alpha");
        assert_eq!(outcome.matches.len(), 3);
        for found in &outcome.matches {
            assert!(found.line.to_lowercase().contains("alpha"));
        }
    }

    #[test]
    fn test_punctuation_only_query_recalls_everything() {
        let fixture = Fixture::new(&[("a.txt", "std::fs\n"), ("b.txt", "plain\n")]).indexed();
        let outcome = fixture.search("::");
        assert_eq!(outcome.total_candidates, 2);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].line, "std::fs");
    }

    #[test]
    fn test_long_lines_are_truncated_to_prefix() {
        let long_ascii = format!("needle{}", "x".repeat(400));
        let long_wide = format!("needle{}", "é".repeat(400));
        let content = format!("{}\n{}\n", long_ascii, long_wide);
        let fixture = Fixture::new(&[("a.txt", content.as_str())]).indexed();

        let outcome = fixture.search("needle");
        assert_eq!(outcome.matches.len(), 2);
        for (found, full) in outcome.matches.iter().zip([&long_ascii, &long_wide]) {
            assert_eq!(found.line.chars().count(), 200);
            assert!(full.starts_with(&found.line));
        }
    }

    #[test]
    fn test_strip_root_prefix() {
        let mut fixture = Fixture::new(&[("sub/file.txt", "marker\n")]).indexed();
        fixture.config.search.strip_root_prefix = true;
        let outcome = fixture.search("marker");
        assert_eq!(outcome.matches[0].path, "./sub/file.txt");
    }

    #[test]
    fn test_candidate_cap() {
        let files: Vec<(String, &str)> = (0..6).map(|i| (format!("f{}.txt", i), "common\n")).collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), *c)).collect();
        let mut fixture = Fixture::new(&refs).indexed();
        fixture.config.search.candidate_limit = 4;

        let outcome = fixture.search("common");
        assert_eq!(outcome.total_candidates, 6);
        assert_eq!(outcome.examined, 4);
        assert_eq!(outcome.matches.len(), 4);
    }

    #[test]
    fn test_deleted_candidate_is_skipped() {
        let fixture = Fixture::new(&[("a.txt", "keep me\n"), ("gone.txt", "keep me too\n")]).indexed();
        fs::remove_file(fixture.root.join("gone.txt")).unwrap();

        let outcome = fixture.search("keep");
        assert_eq!(outcome.total_candidates, 2);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].path, fixture.root.join("gone.txt"));
        assert!(matches!(outcome.skipped[0].reason, SkipReason::Unreadable(_)));
    }

    #[test]
    fn test_stale_index_is_verified_against_disk() {
        let fixture = Fixture::new(&[("a.txt", "original text\n")]).indexed();
        fs::write(fixture.root.join("a.txt"), "rewritten\n").unwrap();

        let outcome = fixture.search("original");
        assert_eq!(outcome.total_candidates, 1);
        assert!(outcome.matches.is_empty());
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let fixture = Fixture::new(&[("a.txt", "one\r\ntwo target\r\nthree target")]).indexed();
        let outcome = fixture.search("target");
        let found: Vec<(usize, &str)> = outcome
            .matches
            .iter()
            .map(|m| (m.line_number, m.line.as_str()))
            .collect();
        assert_eq!(found, vec![(2, "two target"), (3, "three target")]);
    }

    #[test]
    fn test_search_without_index() {
        let fixture = Fixture::new(&[("a.txt", "text\n")]);
        let result = Searcher::from_config(&fixture.config).search(&fixture.root, "text");
        assert!(matches!(result, Err(LightgrokError::IndexNotFound { .. })));
    }

    #[test]
    fn test_empty_query_rejected() {
        let fixture = Fixture::new(&[("a.txt", "text\n")]).indexed();
        let result = Searcher::from_config(&fixture.config).search(&fixture.root, "   ");
        assert!(matches!(result, Err(LightgrokError::InvalidQuery { .. })));
    }

    #[test]
    fn test_streaming_sink_sees_count_first() {
        #[derive(Default)]
        struct Recorder {
            events: Vec<String>,
        }
        impl MatchSink for Recorder {
            fn candidates(&mut self, total: usize, _examined: usize) {
                self.events.push(format!("{} total matching documents", total));
            }
            fn matched(&mut self, line: &LineMatch) {
                self.events.push(line.to_string());
            }
        }

        let fixture = Fixture::new(&[("a.txt", "hello world")]).indexed();
        let mut recorder = Recorder::default();
        let summary = Searcher::from_config(&fixture.config)
            .search_into(&fixture.root, "world", &mut recorder)
            .unwrap();

        assert_eq!(summary.matched_lines, 1);
        assert_eq!(recorder.events[0], "1 total matching documents");
        assert_eq!(recorder.events.len(), 2);
    }

    #[test]
    fn test_line_matcher() {
        let matcher = LineMatcher::new("WoRlD", 5);
        assert!(matcher.is_match("hello world"));
        assert!(!matcher.is_match("hello word"));
        assert_eq!(matcher.truncate("hello world"), "hello");
        assert_eq!(matcher.truncate("héllo"), "héllo");
        assert_eq!(matcher.truncate("hé"), "hé");
    }

    #[test]
    fn test_very_long_token_query() {
        let run = "a".repeat(600);
        let content = format!("x{}y\nshort a\n", run);
        let fixture = Fixture::new(&[("a.txt", content.as_str()), ("b.txt", "aaa\n")]).indexed();

        let outcome = fixture.search(&run);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].line_number, 1);

        let upper = format!("X{}Y", "A".repeat(600));
        assert_eq!(fixture.search(&upper).matches.len(), 1);
    }

    #[test]
    fn test_final_sigma_inside_longer_word() {
        let fixture = Fixture::new(&[("greek.txt", "ΟΔΟΣΧ\nοδός\n")]).indexed();

        let outcome = fixture.search("ΟΔΟΣ");
        assert_eq!(outcome.total_candidates, 1);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].line, "ΟΔΟΣΧ");
    }

    #[test]
    fn test_lone_carriage_return_ends_line() {
        let fixture = Fixture::new(&[
            ("mac.txt", "one\rtwo target\rthree"),
            ("mixed.txt", "a\r\rb target\r\nc\n"),
        ])
        .indexed();

        let mut found: Vec<(String, usize, String)> = fixture
            .search("target")
            .matches
            .into_iter()
            .map(|m| (m.path, m.line_number, m.line))
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                (fixture.path("mac.txt"), 2, "two target".to_string()),
                (fixture.path("mixed.txt"), 3, "b target".to_string()),
            ]
        );
    }

    #[test]
    fn test_line_matcher_folds_per_character() {
        let matcher = LineMatcher::new("ΟΔΟΣ", 200);
        assert!(matcher.is_match("ΟΔΟΣΧ"));
        assert!(matcher.is_match("xx οδοσ yy"));
        assert!(!matcher.is_match("ΟΔΟ"));
    }

    proptest! {
        #[test]
        fn prop_truncate_is_bounded_prefix(line in ".{0,300}", max in 1usize..250) {
            let matcher = LineMatcher::new("x", max);
            let cut = matcher.truncate(&line);
            prop_assert!(cut.chars().count() <= max);
            prop_assert!(line.starts_with(cut));
        }
    }
}
