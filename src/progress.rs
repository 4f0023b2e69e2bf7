//! Progress events emitted during a run.

use std::sync::mpsc::Sender;

use crate::core::{ArchiveDetail, ProgressSnapshot};

/// Everything a run reports while it works, in emission order:
/// one `RunStarted`, one `ArchiveCompleted` per archive, one `RunCompleted`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    RunStarted(ProgressSnapshot),
    /// Emitted for every archive, including ones that failed to extract.
    ArchiveCompleted {
        snapshot: ProgressSnapshot,
        detail: ArchiveDetail,
    },
    RunCompleted {
        snapshot: ProgressSnapshot,
        cancelled: bool,
    },
}

impl ProgressEvent {
    pub fn snapshot(&self) -> &ProgressSnapshot {
        match self {
            ProgressEvent::RunStarted(snapshot)
            | ProgressEvent::ArchiveCompleted { snapshot, .. }
            | ProgressEvent::RunCompleted { snapshot, .. } => snapshot,
        }
    }

    /// One-line status text suitable for a status bar.
    pub fn message(&self) -> String {
        match self {
            ProgressEvent::RunStarted(s) => {
                format!("Processing started: {} archives found", s.total_archives)
            }
            ProgressEvent::ArchiveCompleted { snapshot, detail } => format!(
                "{}/{} {}: {} invoices",
                snapshot.processed_archives,
                snapshot.total_archives,
                detail.filename,
                detail.invoice_count
            ),
            ProgressEvent::RunCompleted { snapshot, cancelled } => {
                let verb = if *cancelled { "cancelled" } else { "completed" };
                match snapshot.year_distribution.as_deref() {
                    Some(years) if !years.is_empty() => format!(
                        "Processing {verb}: {} invoices ({years})",
                        snapshot.invoices_found
                    ),
                    _ => format!("Processing {verb}: {} invoices", snapshot.invoices_found),
                }
            }
        }
    }
}

/// Receiver of progress events.
///
/// Called synchronously from the processing thread; implementations that
/// drive a UI should hand the event off rather than block.
pub trait ProgressListener: Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(&ProgressEvent) + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ProgressListener for NoopListener {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Forwards events over a channel. A dropped receiver is ignored.
impl ProgressListener for Sender<ProgressEvent> {
    fn on_event(&self, event: &ProgressEvent) {
        let _ = self.send(event.clone());
    }
}
