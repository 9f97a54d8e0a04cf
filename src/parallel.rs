//! Fan-out of analyzer invocations and fan-in of their parsed results.
//!
//! A fixed pool of at most K worker threads pulls words from a shared job
//! queue. Each worker takes a slot from the [`Limiter`] only for the
//! duration of the external process, parses the captured text outside the
//! slot, and sends the outcome down a single results channel. A supervisor
//! thread feeds the queue and joins the pool; once it drops the last sender
//! the consumer's iterator ends.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};

use crate::analyzer::Analyzer;
use crate::config::DEFAULT_CONCURRENCY;
use crate::errors::LookupError;
use crate::limiter::Limiter;
use crate::parser::{parse_output, QueryResult};

/// Configuration for parallel dispatch
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Worker threads in the pool, and the ceiling on analyzer processes
    pub concurrency: usize,
    /// Results buffered before workers block on send
    pub channel_buffer: usize,
    /// Stop invoking the analyzer after the first failed word
    pub fail_fast: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            channel_buffer: 10000,
            fail_fast: false,
        }
    }
}

/// Result of looking up one input word
#[derive(Debug)]
pub struct WordOutcome {
    pub word: String,
    pub result: Result<QueryResult, LookupError>,
}

/// A running batch. Iterating yields outcomes in completion order.
pub struct Dispatch {
    results: Receiver<WordOutcome>,
    cancelled: Arc<AtomicBool>,
    supervisor: Option<JoinHandle<()>>,
}

impl Dispatch {
    /// Stop starting new analyzer processes. Invocations already running
    /// finish; every remaining word reports [`LookupError::Cancelled`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Iterator for Dispatch {
    type Item = WordOutcome;

    fn next(&mut self) -> Option<WordOutcome> {
        match self.results.recv() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                if let Some(handle) = self.supervisor.take() {
                    handle.join().ok();
                }
                None
            }
        }
    }
}

/// Start looking up `words`. Returns once the supervisor thread is running;
/// results arrive through the returned [`Dispatch`].
pub fn dispatch(
    words: Vec<String>,
    analyzer: Arc<dyn Analyzer>,
    config: &ParallelConfig,
) -> std::io::Result<Dispatch> {
    let (tx, rx): (SyncSender<WordOutcome>, Receiver<WordOutcome>) =
        sync_channel(config.channel_buffer.max(1));
    let cancelled = Arc::new(AtomicBool::new(false));
    let limiter = Arc::new(Limiter::new(config.concurrency));

    info!(
        words = words.len(),
        concurrency = limiter.capacity(),
        "dispatching analyzer batch"
    );

    let supervisor_cancel = Arc::clone(&cancelled);
    let fail_fast = config.fail_fast;
    let supervisor = thread::Builder::new()
        .name("dispatch-supervisor".to_string())
        .spawn(move || supervise(words, analyzer, limiter, tx, supervisor_cancel, fail_fast))?;

    Ok(Dispatch {
        results: rx,
        cancelled,
        supervisor: Some(supervisor),
    })
}

fn supervise(
    words: Vec<String>,
    analyzer: Arc<dyn Analyzer>,
    limiter: Arc<Limiter>,
    tx: SyncSender<WordOutcome>,
    cancelled: Arc<AtomicBool>,
    fail_fast: bool,
) {
    let num_workers = limiter.capacity().min(words.len());
    let (job_tx, job_rx): (SyncSender<String>, Receiver<String>) =
        sync_channel(limiter.capacity());
    let job_rx = Arc::new(Mutex::new(job_rx));

    let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(num_workers);
    let mut spawn_error = None;
    for index in 0..num_workers {
        let rx = Arc::clone(&job_rx);
        let worker_tx = tx.clone();
        let analyzer = Arc::clone(&analyzer);
        let limiter = Arc::clone(&limiter);
        let cancelled = Arc::clone(&cancelled);

        let spawned = thread::Builder::new()
            .name(format!("analyze-{}", index))
            .spawn(move || {
                analyze_words_worker(
                    rx,
                    worker_tx,
                    analyzer.as_ref(),
                    &limiter,
                    &cancelled,
                    fail_fast,
                )
            });
        match spawned {
            Ok(handle) => workers.push(handle),
            Err(e) => {
                warn!(worker = index, error = %e, "failed to spawn worker");
                spawn_error = Some(e);
                break;
            }
        }
    }
    drop(job_rx);
    debug!(workers = workers.len(), "worker pool started");

    for word in words {
        if workers.is_empty() {
            // no pool to hand the word to
            let source = match &spawn_error {
                Some(e) => std::io::Error::new(e.kind(), e.to_string()),
                None => std::io::Error::new(std::io::ErrorKind::Other, "no worker threads"),
            };
            tx.send(WordOutcome {
                word,
                result: Err(LookupError::WorkerSpawn(source)),
            })
            .ok();
            continue;
        }
        if let Err(returned) = job_tx.send(word) {
            // every worker has exited
            tx.send(WordOutcome {
                word: returned.0,
                result: Err(LookupError::WorkerPanicked),
            })
            .ok();
        }
    }
    drop(job_tx);

    for handle in workers {
        handle.join().ok();
    }
    debug!("all workers finished");
}

/// Pull words from the shared queue until it is closed and drained.
fn analyze_words_worker(
    rx: Arc<Mutex<Receiver<String>>>,
    tx: SyncSender<WordOutcome>,
    analyzer: &dyn Analyzer,
    limiter: &Limiter,
    cancelled: &AtomicBool,
    fail_fast: bool,
) {
    loop {
        let item = {
            let lock = rx.lock().ok();
            lock.and_then(|guard| guard.recv().ok())
        };
        let word = match item {
            Some(word) => word,
            None => break,
        };

        let looked_up = panic::catch_unwind(AssertUnwindSafe(|| {
            lookup_word(word.clone(), analyzer, limiter, cancelled, fail_fast)
        }));
        let outcome = looked_up.unwrap_or_else(|_| {
            warn!(word = %word, "analyzer panicked");
            WordOutcome {
                word,
                result: Err(LookupError::WorkerPanicked),
            }
        });
        if tx.send(outcome).is_err() {
            break;
        }
    }
}

/// Invoke the analyzer for one word under a limiter slot and parse its output.
fn lookup_word(
    word: String,
    analyzer: &dyn Analyzer,
    limiter: &Limiter,
    cancelled: &AtomicBool,
    fail_fast: bool,
) -> WordOutcome {
    let raw = {
        let _permit = limiter.acquire();
        trace!(word = %word, in_use = limiter.in_use(), "acquired analyzer slot");
        if cancelled.load(Ordering::SeqCst) {
            return WordOutcome {
                word,
                result: Err(LookupError::Cancelled),
            };
        }
        let raw = analyzer.analyze(&word);
        if raw.is_err() && fail_fast {
            cancelled.store(true, Ordering::SeqCst);
        }
        raw
    };

    let result = raw
        .map_err(LookupError::from)
        .and_then(|text| parse_output(&word, &text).map_err(LookupError::from));

    match &result {
        Ok(found) => {
            debug!(
                word = %word,
                entries = found.entries.len(),
                unknown = found.unknown.len(),
                "parsed analyzer output"
            );
            for entry in &found.entries {
                trace!(word = %word, %entry);
            }
        }
        Err(e) => {
            if fail_fast {
                cancelled.store(true, Ordering::SeqCst);
            }
            warn!(word = %word, error = %e, "lookup failed");
        }
    }

    WordOutcome { word, result }
}
