//! Async driver for per-file upload pipelines.
//!
//! Each upload's reads, debounce timers and submissions run as tokio tasks.
//! Their results come back as events over one channel and are applied by the
//! manager, which is the only writer of the [`UploadList`]. Removing an upload
//! aborts its tasks, and any event already queued for it is dropped. A task that
//! panics fails its upload instead of leaving it in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use spendscore_core::analysis::GENERIC_UPLOAD_FAILURE;
use spendscore_core::{
    Action, ApplyError, ColumnMapping, FileHandle, PipelineError, UploadEvent, UploadId, UploadList,
    UploadedFile,
};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::api::Submitter;
use crate::source::read_file;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause between auto-detection and submission.
    pub auto_submit_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_submit_delay: Duration::from_millis(1500),
        }
    }
}

#[derive(Debug)]
struct Completion {
    id: UploadId,
    event: UploadEvent,
}

pub struct UploadManager<S> {
    submitter: Arc<S>,
    config: PipelineConfig,
    uploads: UploadList,
    tasks: HashMap<UploadId, Vec<AbortHandle>>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl<S: Submitter> UploadManager<S> {
    pub fn new(submitter: S, config: PipelineConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            submitter: Arc::new(submitter),
            config,
            uploads: UploadList::new(),
            tasks: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn uploads(&self) -> &UploadList {
        &self.uploads
    }

    pub fn get(&self, id: UploadId) -> Option<&UploadedFile> {
        self.uploads.get(id)
    }

    /// Add a file and start reading it. Must be called inside a tokio runtime.
    pub fn add_file(&mut self, file: FileHandle) -> UploadId {
        let id = self.uploads.insert(UploadedFile::new(file));
        info!(%id, "upload added");
        self.spawn(id, Action::ReadFile);
        id
    }

    /// Submit with a mapping chosen by hand.
    ///
    /// An invalid mapping is rejected with `MappingInvalid` before anything is sent
    /// and the upload keeps its current state.
    pub fn confirm_mapping(&mut self, id: UploadId, mapping: ColumnMapping) -> Result<(), ApplyError> {
        self.dispatch(id, UploadEvent::ManualConfirmed(mapping))
    }

    /// Start a failed upload over from the read step.
    pub fn retry(&mut self, id: UploadId) -> Result<(), ApplyError> {
        self.dispatch(id, UploadEvent::Retry)
    }

    /// Drop an upload in any state and abort whatever it still has running.
    pub fn remove(&mut self, id: UploadId) -> Option<UploadedFile> {
        self.abort_tasks(id);
        let removed = self.uploads.remove(id);
        if removed.is_some() {
            info!(%id, "upload removed");
        }
        removed
    }

    /// Wait for the next task result and apply it. Returns the upload it was for,
    /// or `None` when the event was dropped.
    pub async fn process_next(&mut self) -> Option<UploadId> {
        let Completion { id, event } = self.rx.recv().await?;
        let event_name = event.name();
        match self.uploads.apply(id, event) {
            Ok(action) => {
                if let Some(upload) = self.uploads.get(id) {
                    let status = upload.status();
                    match upload.message() {
                        Some(message) if status.is_terminal() => warn!(%id, %status, %message, "upload failed"),
                        _ => info!(%id, %status, progress = upload.progress, "upload advanced"),
                    }
                }
                if let Some(action) = action {
                    self.spawn(id, action);
                }
                Some(id)
            }
            Err(ApplyError::UnknownUpload(_)) => {
                debug!(%id, event = event_name, "dropping event for removed upload");
                None
            }
            Err(ApplyError::Transition(e)) => {
                debug!(%id, error = %e, "ignoring stale event");
                None
            }
        }
    }

    /// Apply task results until no upload is reading, waiting or submitting.
    pub async fn run_until_settled(&mut self) {
        while self.uploads.has_in_flight() {
            self.process_next().await;
        }
    }

    fn dispatch(&mut self, id: UploadId, event: UploadEvent) -> Result<(), ApplyError> {
        let action = self.uploads.apply(id, event)?;
        // A pending debounce must not submit after a manual confirm.
        self.abort_tasks(id);
        if let Some(action) = action {
            self.spawn(id, action);
        }
        Ok(())
    }

    fn spawn(&mut self, id: UploadId, action: Action) {
        let Some(upload) = self.uploads.get(id) else {
            return;
        };
        let file = upload.file.clone();

        let work: JoinHandle<UploadEvent> = match action {
            Action::ReadFile => tokio::spawn(async move { UploadEvent::FileRead(read_file(&file).await) }),
            Action::ScheduleSubmit(_) => {
                let delay = self.config.auto_submit_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    UploadEvent::DebounceElapsed
                })
            }
            Action::Submit(mapping) => {
                let submitter = Arc::clone(&self.submitter);
                tokio::spawn(async move { UploadEvent::SubmitFinished(submitter.submit(file, mapping).await) })
            }
        };

        // A panicked task is reported as a failed upload.
        let work_abort = work.abort_handle();
        let tx = self.tx.clone();
        let watcher = tokio::spawn(async move {
            let event = match work.await {
                Ok(event) => event,
                Err(e) if e.is_panic() => {
                    warn!(%id, "upload task panicked");
                    UploadEvent::Fail(PipelineError::transport(GENERIC_UPLOAD_FAILURE))
                }
                Err(_) => return,
            };
            let _ = tx.send(Completion { id, event });
        });

        let tasks = self.tasks.entry(id).or_default();
        tasks.retain(|h| !h.is_finished());
        tasks.push(work_abort);
        tasks.push(watcher.abort_handle());
    }

    fn abort_tasks(&mut self, id: UploadId) {
        if let Some(tasks) = self.tasks.remove(&id) {
            for h in tasks {
                h.abort();
            }
        }
    }
}
