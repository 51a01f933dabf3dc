use tracing::{error, info, warn};

use crate::error::{DubwatchError, PipelineError};
use crate::pipeline::PipelineOutcome;
use crate::scanner::Item;
use crate::scheduler::CycleReport;
use crate::state::Source;

/// Receives the scheduler's progress events.
///
/// Handed to the scheduler at construction; all methods default to no-ops.
pub trait CycleReporter: Send + Sync {
    fn cycle_started(&self, _sources: usize) {}

    fn source_skipped(&self, _source: &Source, _reason: &str) {}

    fn scan_failed(&self, _source: &Source, _error: &DubwatchError) {}

    fn item_started(&self, _source: &Source, _item: &Item) {}

    fn item_processed(&self, _item: &Item, _outcome: &PipelineOutcome) {}

    fn item_failed(&self, _item: &Item, _error: &PipelineError) {}

    fn ledger_save_failed(&self, _item: &Item, _error: &DubwatchError) {}

    fn cycle_finished(&self, _report: &CycleReport) {}

    fn cycle_failed(&self, _error: &DubwatchError) {}

    fn stopped(&self) {}
}

/// Reporter writing to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl CycleReporter for TracingReporter {
    fn cycle_started(&self, sources: usize) {
        info!("Starting scan cycle over {} playlist(s)", sources);
    }

    fn source_skipped(&self, source: &Source, reason: &str) {
        warn!("Skipping playlist '{}': {}", source.locator, reason);
    }

    fn scan_failed(&self, source: &Source, error: &DubwatchError) {
        error!("Error scanning playlist {}: {}", source.locator, error);
    }

    fn item_started(&self, source: &Source, item: &Item) {
        info!(
            title = %item.title,
            id = %item.id,
            translate = source.translate,
            "Processing new video"
        );
    }

    fn item_processed(&self, item: &Item, outcome: &PipelineOutcome) {
        match outcome {
            PipelineOutcome::Downloaded => info!("Downloaded {} ({})", item.title, item.id),
            PipelineOutcome::Translated { output } => {
                info!("Translated {} ({}) -> {}", item.title, item.id, output.display())
            }
        }
    }

    fn item_failed(&self, item: &Item, error: &PipelineError) {
        error!("Error processing video {}: {}", item.id, error);
    }

    fn ledger_save_failed(&self, item: &Item, error: &DubwatchError) {
        error!("Error saving downloaded list after {}: {}", item.id, error);
    }

    fn cycle_finished(&self, report: &CycleReport) {
        info!(
            processed = report.items_processed,
            failed = report.items_failed,
            skipped = report.items_skipped,
            scan_failures = report.sources_failed,
            "Scan cycle finished in {:.1}s",
            report.elapsed().num_milliseconds() as f64 / 1000.0
        );
    }

    fn cycle_failed(&self, error: &DubwatchError) {
        error!("Error in scan cycle: {}", error);
    }

    fn stopped(&self) {
        info!("Shutting down gracefully...");
    }
}
