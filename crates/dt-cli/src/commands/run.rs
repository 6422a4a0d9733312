//! Run command: track the browser event feed until it ends.
//!
//! A reader task parses feed lines from stdin and pushes them into a bounded
//! channel. A single consumer owns the accountant and applies messages one at a
//! time, in arrival order, so no two switches ever interleave.

use std::fs::File;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use dt_core::{
    Accountant, BrowserEvent, Clock, ManualClock, SystemClock, TotalsStore, dispatch,
};
use dt_db::Database;
use fs2::FileExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::Config;
use crate::feed::{FeedMessage, SnapshotBrowser, parse_line};

/// How long runtime shutdown waits for the stdin reader to notice.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(200);

/// Counts reported when the feed ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Feed messages dispatched to the accountant.
    pub events: usize,
    /// Lines that could not be parsed.
    pub skipped: usize,
    /// Dispatches whose flush failed.
    pub failures: usize,
}

/// A line as it comes off the feed.
#[derive(Debug)]
enum FeedLine {
    Message(Box<FeedMessage>),
    Malformed { line: usize, error: String },
}

/// Runs the tracker against stdin until EOF or Ctrl-C.
pub fn run(config: &Config) -> Result<RunSummary> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let _lock = acquire_lock(&config.lock_path())?;
    let db = Database::open(&config.database_path).context("failed to open database")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let stdin = BufReader::new(tokio::io::stdin());
    let result = runtime.block_on(track(
        stdin,
        db,
        SystemClock,
        config.channel_capacity,
        shutdown,
    ));

    // stdin reads block a runtime thread until the next line arrives.
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result.map(|(summary, _db)| summary)
}

/// Takes the single-writer lock next to the database.
fn acquire_lock(path: &Path) -> Result<File> {
    let file = File::create(path).context("failed to create lock file")?;
    file.try_lock_exclusive()
        .with_context(|| format!("another tracker holds {}", path.display()))?;
    Ok(file)
}

/// Applies the feed from `reader` to a fresh accountant writing to `store`.
///
/// Messages carrying a timestamp are accounted at that instant; the rest at
/// `wall` time. Returns when the feed ends or `shutdown` resolves. The active
/// session and any carried-over time are flushed before returning, and the
/// store is handed back.
pub async fn track<R, S, W, F>(
    reader: R,
    store: S,
    wall: W,
    capacity: usize,
    shutdown: F,
) -> Result<(RunSummary, S)>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    S: TotalsStore,
    W: Clock,
    F: Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::channel(capacity.max(1));
    let reader_task = tokio::spawn(read_feed(reader, tx));

    let clock = ManualClock::new(wall.now());
    let mut accountant = Accountant::new(store, clock.clone());
    let mut browser = SnapshotBrowser::new();
    let mut summary = RunSummary::default();
    let mut replaying = false;

    // Process start: recover from whatever the browser has reported so far.
    if let Err(e) = dispatch(&mut accountant, &BrowserEvent::Startup, &browser) {
        tracing::warn!(error = %e, "initial recovery failed");
        summary.failures += 1;
    }

    tokio::pin!(shutdown);
    loop {
        let line = tokio::select! {
            line = rx.recv() => line,
            () = &mut shutdown => {
                tracing::info!("shutdown requested");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let message = match line {
            FeedLine::Message(message) => message,
            FeedLine::Malformed { line, error } => {
                tracing::warn!(line, %error, "skipping malformed feed line");
                summary.skipped += 1;
                continue;
            }
        };

        let FeedMessage {
            timestamp,
            event,
            windows,
        } = *message;
        if let Some(at) = timestamp {
            replaying = true;
            clock.set(at);
        } else {
            clock.set(wall.now());
        }

        match windows {
            Some(windows) => browser.replace(windows),
            None => browser.observe(&event),
        }

        summary.events += 1;
        if let Err(e) = dispatch(&mut accountant, &event, &browser) {
            tracing::warn!(event = %event, error = %e, "failed to account event");
            summary.failures += 1;
        }
    }

    // A replayed feed ends at its last timestamp; a live one ends now.
    if !replaying {
        clock.set(wall.now());
    }
    if let Err(e) = accountant.switch_to(None) {
        tracing::warn!(error = %e, "final flush failed");
        summary.failures += 1;
    }
    if !accountant.carry_over().is_empty() {
        tracing::error!(
            seconds = accountant.carry_over().total_seconds(),
            "exiting with unwritten time"
        );
    }

    reader_task.abort();
    if let Ok(Err(e)) = reader_task.await {
        tracing::warn!(error = %e, "feed reader failed");
    }

    tracing::info!(
        events = summary.events,
        skipped = summary.skipped,
        failures = summary.failures,
        "feed finished"
    );
    Ok((summary, accountant.into_store()))
}

/// Parses feed lines and forwards them until EOF or the consumer goes away.
async fn read_feed<R>(reader: R, tx: mpsc::Sender<FeedLine>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_number = 0;

    while let Some(raw) = lines.next_line().await.context("failed to read feed")? {
        line_number += 1;
        let item = match parse_line(&raw) {
            Ok(Some(message)) => FeedLine::Message(Box::new(message)),
            Ok(None) => continue,
            Err(e) => FeedLine::Malformed {
                line: line_number,
                error: e.to_string(),
            },
        };
        if tx.send(item).await.is_err() {
            break;
        }
    }

    tracing::debug!(lines = line_number, "feed reader reached end of input");
    Ok(())
}
