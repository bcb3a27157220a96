use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing::info;

use crate::{
    cli_types::{IndexArgs, LocateArgs, SearchArgs},
    config::LightgrokConfig,
    crawler::SkippedFile,
    indexer::{IndexReport, Indexer},
    searcher::{LineMatch, MatchSink, Searcher},
    storage::WriteMode,
};

pub struct CliApp {
    config: LightgrokConfig,
    verbose: bool,
}

impl CliApp {
    pub fn new(config: LightgrokConfig, verbose: bool) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        info!("Index root: {}", config.index.root.display());
        Ok(Self { config, verbose })
    }

    pub fn config(&self) -> &LightgrokConfig {
        &self.config
    }

    pub fn index(&self, args: IndexArgs) -> Result<()> {
        let mode = if args.update { WriteMode::Update } else { WriteMode::Create };
        let indexer = Indexer::new(&self.config);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed}] {pos} files {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = indexer.run(&args.root, mode, |path| {
            spinner.inc(1);
            spinner.set_message(path.display().to_string());
        });
        spinner.finish_and_clear();

        let report = result.with_context(|| format!("Failed to index {}", args.root.display()))?;
        self.print_index_report(&report);
        Ok(())
    }

    pub fn search(&self, args: SearchArgs) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.search_to(&args, &mut out)
    }

    /// Run a search and write its report to `out`.
    pub fn search_to(&self, args: &SearchArgs, out: &mut dyn Write) -> Result<()> {
        let mut search_config = self.config.search.clone();
        if args.strip_root {
            search_config.strip_root_prefix = true;
        }
        if let Some(limit) = args.limit {
            anyhow::ensure!(limit > 0, "--limit must be at least 1");
            search_config.candidate_limit = limit;
        }
        let searcher = Searcher::new(self.config.index.root.clone(), search_config);

        let mut sink = PrintSink::new(out, args.json);
        let summary = searcher
            .search_into(&args.root, &args.query, &mut sink)
            .with_context(|| format!("Search in {} failed", args.root.display()))?;
        sink.finish()?;

        if self.verbose {
            self.print_info(&format!(
                "{} lines in {} of {} candidates ({} unreadable)",
                summary.matched_lines, summary.examined, summary.total_candidates, summary.skipped
            ));
        }
        Ok(())
    }

    pub fn locate(&self, args: LocateArgs) -> Result<()> {
        let location = Indexer::new(&self.config)
            .index_location(&args.root)
            .with_context(|| format!("Cannot resolve root {}", args.root.display()))?;
        println!("{}", location.display());
        Ok(())
    }

    pub fn show_config(&self) -> Result<()> {
        let toml = self.config.to_toml().context("Failed to serialize configuration")?;
        print!("{}", toml);
        Ok(())
    }

    fn print_index_report(&self, report: &IndexReport) {
        self.print_success(&format!(
            "Indexed {} files from {} in {:.2?}",
            report.indexed,
            report.root.display(),
            report.duration
        ));
        self.print_info(&format!("Store: {}", report.location.display()));
        if !report.skipped.is_empty() {
            self.print_info(&format!("Skipped {} entries", report.skipped_count()));
        }
        if self.verbose {
            for skipped in &report.skipped {
                self.print_skipped(skipped);
            }
        }
    }

    fn print_skipped(&self, skipped: &SkippedFile) {
        eprintln!("  {} {} ({})", "-".dimmed(), skipped.path.display(), skipped.reason);
    }

    fn print_success(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message);
    }

    fn print_info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".blue(), message);
    }
}

/// Writes search results as grep-style lines or JSON objects.
///
/// The first write error is kept and reported by [`PrintSink::finish`];
/// nothing is written after it.
struct PrintSink<'a> {
    out: &'a mut dyn Write,
    json: bool,
    error: Option<io::Error>,
}

impl<'a> PrintSink<'a> {
    fn new(out: &'a mut dyn Write, json: bool) -> Self {
        Self {
            out,
            json,
            error: None,
        }
    }

    fn record(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            self.error = Some(e);
        }
    }

    fn finish(mut self) -> Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e).context("Failed to write search results");
        }
        self.out.flush().context("Failed to write search results")
    }
}

impl MatchSink for PrintSink<'_> {
    fn candidates(&mut self, total: usize, _examined: usize) {
        if self.json {
            eprintln!("{} total matching documents", total);
        } else if self.error.is_none() {
            let result = writeln!(self.out, "{} total matching documents", total);
            self.record(result);
        }
    }

    fn matched(&mut self, line: &LineMatch) {
        if self.error.is_some() {
            return;
        }
        let result = if self.json {
            serde_json::to_writer(&mut *self.out, line)
                .map_err(io::Error::from)
                .and_then(|_| writeln!(self.out))
        } else {
            writeln!(self.out, "{}", line)
        };
        self.record(result);
    }

    fn skipped(&mut self, file: &SkippedFile) {
        eprintln!("{} {}: {}", "warning:".yellow(), file.path.display(), file.reason);
    }
}
