use crate::vault::ingest::{IngestEvent, run_pass};
use crate::vault::paths::{CompanionPaths, VaultPaths};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// Run an ingestion pass off the caller's thread.
///
/// Results and progress arrive only over the returned channel; the worker
/// owns its pass end to end and there is no mid-pass cancellation. The
/// channel closes after `PassFinished` or `PassFailed`.
pub fn spawn_ingest(
    paths: VaultPaths,
    companion: CompanionPaths,
) -> (JoinHandle<()>, Receiver<IngestEvent>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let event = match run_pass(&paths, &companion, Some(&tx)) {
            Ok(outcome) => IngestEvent::PassFinished { outcome },
            Err(err) => IngestEvent::PassFailed {
                error: format!("{err:#}"),
            },
        };
        let _ = tx.send(event);
    });
    (handle, rx)
}
