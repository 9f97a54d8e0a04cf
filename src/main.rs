use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

mod analyzer;
mod config;
mod errors;
mod limiter;
mod parallel;
mod parser;
mod speech;
mod wordlist;

use analyzer::CommandAnalyzer;
use config::{Overrides, RootsConfig};
use errors::{LookupError, RunError};
use parallel::{dispatch, ParallelConfig, WordOutcome};

/// Output format for resolved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One root form per line
    Text,
    /// One JSON object per word
    Jsonl,
}

#[derive(Parser)]
#[command(name = "latin-roots")]
#[command(about = "Resolve inflected Latin word-forms to dictionary roots with an external analyzer")]
struct Args {
    /// Word list, one word per line (.txt or .txt.bz2)
    wordlist: PathBuf,

    /// Path to config YAML file (default: config/latin-roots.yaml or latin-roots.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analyzer executable
    #[arg(long)]
    analyzer: Option<PathBuf>,

    /// Working directory for the analyzer
    #[arg(long)]
    analyzer_dir: Option<PathBuf>,

    /// Maximum number of concurrent analyzer processes
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Also print sub-words the analyzer did not recognize
    #[arg(short, long)]
    unknown: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop invoking the analyzer after the first failed word
    #[arg(long)]
    fail_fast: bool,

    /// Quiet mode - no progress bar or summary
    #[arg(short, long)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Default)]
pub struct Stats {
    pub words_dispatched: usize,
    pub words_resolved: usize,
    pub entries_written: usize,
    pub unknown_tokens: usize,
    pub failures: usize,
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl Stats {
    fn record(&mut self, outcome: &WordOutcome) {
        match &outcome.result {
            Ok(result) => {
                self.words_resolved += 1;
                self.entries_written += result.entries.len();
                self.unknown_tokens += result.unknown.len();
            }
            Err(LookupError::Cancelled) => self.cancelled += 1,
            Err(_) => self.failures += 1,
        }
    }
}

fn write_outcome<W: Write>(
    writer: &mut W,
    outcome: &WordOutcome,
    format: OutputFormat,
    print_unknown: bool,
) -> std::io::Result<()> {
    match (format, &outcome.result) {
        (OutputFormat::Text, Ok(result)) => {
            for entry in &result.entries {
                writeln!(writer, "{}", entry.inflection)?;
            }
            if print_unknown {
                for token in &result.unknown {
                    writeln!(writer, "{}", token)?;
                }
            }
        }
        (OutputFormat::Text, Err(_)) => {}
        (OutputFormat::Jsonl, Ok(result)) => {
            let line = if print_unknown {
                serde_json::to_string(result)?
            } else {
                serde_json::to_string(&json!({
                    "word": result.word,
                    "entries": result.entries,
                }))?
            };
            writeln!(writer, "{}", line)?;
        }
        (OutputFormat::Jsonl, Err(e)) => {
            let line = json!({ "word": outcome.word, "error": e.to_string() });
            writeln!(writer, "{}", line)?;
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<Stats, RunError> {
    let config = RootsConfig::discover(args.config.as_deref())?.apply(Overrides {
        analyzer: args.analyzer.clone(),
        analyzer_dir: args.analyzer_dir.clone(),
        concurrency: args.concurrency,
        print_unknown: args.unknown,
    })
    .validate(&args.wordlist)?;

    let words = wordlist::read_word_list(&args.wordlist)?;

    if !args.quiet {
        eprintln!("Word list: {}", args.wordlist.display());
        eprintln!("Analyzer: {}", config.analyzer_path().display());
        eprintln!("Concurrency: {}", config.concurrency);
        eprintln!("Words: {}", words.len());
        eprintln!();
    }

    let mut analyzer = CommandAnalyzer::new(config.analyzer_path());
    if let Some(dir) = &config.analyzer_dir {
        analyzer = analyzer.with_workdir(dir);
    }
    info!(program = %analyzer.program().display(), "analyzer configured");

    let parallel = ParallelConfig {
        concurrency: config.concurrency,
        fail_fast: args.fail_fast,
        ..ParallelConfig::default()
    };

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = BufWriter::with_capacity(64 * 1024, output);

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(words.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    };

    let start_time = Instant::now();
    let mut stats = Stats {
        words_dispatched: words.len(),
        ..Stats::default()
    };

    let mut batch = dispatch(words, Arc::new(analyzer), &parallel)?;
    while let Some(outcome) = batch.next() {
        stats.record(&outcome);
        let written = write_outcome(&mut writer, &outcome, args.format, config.print_unknown)
            .and_then(|_| writer.flush());
        if let Err(e) = written {
            // nobody is reading the results any more
            batch.cancel();
            pb.abandon();
            return Err(e.into());
        }
        pb.inc(1);
        if stats.failures > 0 {
            pb.set_message(format!("{} failed", stats.failures));
        }
    }
    if batch.is_cancelled() {
        info!(cancelled = stats.cancelled, "batch stopped after first failure");
    }

    pb.finish_and_clear();
    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn print_stats(stats: &Stats) {
    eprintln!();
    eprintln!("============================================================");
    eprintln!("Words dispatched: {}", stats.words_dispatched);
    eprintln!("Words resolved: {}", stats.words_resolved);
    eprintln!("Entries written: {}", stats.entries_written);
    eprintln!("Unknown sub-words: {}", stats.unknown_tokens);
    eprintln!("Failed: {}", stats.failures);
    if stats.cancelled > 0 {
        eprintln!("Cancelled: {}", stats.cancelled);
    }
    eprintln!("Time: {}m {}s", stats.elapsed.as_secs() / 60, stats.elapsed.as_secs() % 60);
    eprintln!(
        "Rate: {:.0} words/sec",
        stats.words_dispatched as f64 / stats.elapsed.as_secs_f64().max(f64::EPSILON)
    );
    eprintln!("============================================================");
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(stats) => {
            if !args.quiet {
                print_stats(&stats);
            }
            if stats.failures > 0 || stats.cancelled > 0 {
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
