use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::pipeline::ItemProcessor;
use crate::report::CycleReporter;
use crate::scanner::Scanner;
use crate::state::{Ledger, StatePaths, load_sources};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Walking the sources
    Scanning,
    /// Waiting for the next tick
    Idle,
    /// Cancelled; no further cycles
    Stopped,
}

/// Tally of one pass over the sources
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub sources_total: usize,
    pub sources_scanned: usize,
    pub sources_skipped: usize,
    pub sources_failed: usize,
    pub items_processed: usize,
    pub items_skipped: usize,
    pub items_failed: usize,
    /// Stopped early by cancellation
    pub cancelled: bool,
}

impl CycleReport {
    fn start(sources_total: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            sources_total,
            sources_scanned: 0,
            sources_skipped: 0,
            sources_failed: 0,
            items_processed: 0,
            items_skipped: 0,
            items_failed: 0,
            cancelled: false,
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }
}

/// Scan-download-dedupe loop.
///
/// Sources and items are handled strictly one after another. The ledger is
/// reloaded at the start of every cycle and saved after every successful
/// item, so an interrupted cycle loses at most the item in flight.
pub struct CycleScheduler {
    paths: StatePaths,
    scanner: Arc<dyn Scanner>,
    processor: Arc<dyn ItemProcessor>,
    reporter: Arc<dyn CycleReporter>,
    interval: Duration,
    cancel: CancellationToken,
    state: watch::Sender<SchedulerState>,
}

impl CycleScheduler {
    pub fn new(
        paths: StatePaths,
        scanner: Arc<dyn Scanner>,
        processor: Arc<dyn ItemProcessor>,
        reporter: Arc<dyn CycleReporter>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Scanning);
        Self {
            paths,
            scanner,
            processor,
            reporter,
            interval,
            cancel,
            state,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Cycle until cancelled. Cycle-level errors are reported and retried on
    /// the next tick.
    pub async fn run(&self) {
        loop {
            self.state.send_replace(SchedulerState::Scanning);
            if let Err(e) = self.run_cycle().await {
                self.reporter.cycle_failed(&e);
            }

            self.state.send_replace(SchedulerState::Idle);
            debug!("Next scan cycle in {:?}", self.interval);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        self.reporter.stopped();
    }

    /// Single pass, then stop
    pub async fn run_once(&self) -> Result<CycleReport> {
        self.state.send_replace(SchedulerState::Scanning);
        let result = self.run_cycle().await;
        self.state.send_replace(SchedulerState::Stopped);
        self.reporter.stopped();
        result
    }

    /// One pass over every source. Fails only if the state files cannot be
    /// loaded; scan and item failures are reported and counted.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let sources = load_sources(&self.paths.sources).await?;
        let mut ledger = Ledger::load(&self.paths.ledger).await?;

        let mut report = CycleReport::start(sources.len());
        self.reporter.cycle_started(sources.len());

        'sources: for source in &sources {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if !source.has_locator() {
                self.reporter.source_skipped(source, "empty playlist URL");
                report.sources_skipped += 1;
                continue;
            }

            let items = match self.scanner.scan(&source.locator).await {
                Ok(items) => items,
                Err(e) => {
                    self.reporter.scan_failed(source, &e);
                    report.sources_failed += 1;
                    continue;
                }
            };
            report.sources_scanned += 1;

            for item in &items {
                if self.cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'sources;
                }

                if ledger.contains(&item.id) {
                    report.items_skipped += 1;
                    continue;
                }

                self.reporter.item_started(source, item);
                match self.processor.process(item, source.translate).await {
                    Ok(outcome) => {
                        report.items_processed += 1;
                        self.reporter.item_processed(item, &outcome);

                        ledger.insert(&item.id);
                        if let Err(e) = ledger.save().await {
                            self.reporter.ledger_save_failed(item, &e);
                        }
                    }
                    Err(e) => {
                        report.items_failed += 1;
                        self.reporter.item_failed(item, &e);
                    }
                }
            }
        }

        report.finished_at = Some(Utc::now());
        self.reporter.cycle_finished(&report);
        Ok(report)
    }
}
