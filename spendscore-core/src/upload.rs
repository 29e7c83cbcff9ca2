//! Upload records and the ordered list that owns them.
//!
//! Records are addressed by a generated [`UploadId`]. Every change replaces the
//! whole record in place. An event for an id that is no longer in the list
//! (the file was removed while its request was in flight) changes nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::{ReportDraft, UploadSummary};
use crate::error::PipelineError;
use crate::mapping::{self, ColumnMapping};
use crate::pipeline::{
    Action, TransitionError, UPLOADING_PROGRESS, UploadEvent, UploadState, UploadStatus, transition,
};
use crate::sample::{CsvSample, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload_{}", self.0.simple())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// The selected file. Content is re-read on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub source: FileSource,
}

impl FileHandle {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    pub fn in_memory(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Memory(bytes.into()),
        }
    }

    pub fn is_csv(&self) -> bool {
        self.name.to_lowercase().ends_with(".csv")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub id: UploadId,
    pub file: FileHandle,
    /// 0-100.
    pub progress: u8,
    pub state: UploadState,
    /// Headers and preview rows from the latest successful read.
    pub sample: Option<CsvSample>,
    /// Mapping produced by detection on the latest read.
    pub auto_mapping: Option<ColumnMapping>,
}

impl UploadedFile {
    pub fn new(file: FileHandle) -> Self {
        Self {
            id: UploadId::new(),
            file,
            progress: UPLOADING_PROGRESS,
            state: UploadState::Uploading,
            sample: None,
            auto_mapping: None,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.state.status()
    }

    /// Error text for failed uploads, or the reason manual mapping is needed.
    pub fn message(&self) -> Option<String> {
        match &self.state {
            UploadState::Error { error } => Some(error.to_string()),
            UploadState::Mapping { reason, .. } => Some(reason.clone()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match &self.state {
            UploadState::Error { error } => Some(error),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&UploadSummary> {
        match &self.state {
            UploadState::Completed { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Mapping currently in use or awaiting confirmation.
    pub fn mapping(&self) -> Option<&ColumnMapping> {
        match &self.state {
            UploadState::AutoMapping { mapping }
            | UploadState::Processing { mapping }
            | UploadState::Completed { mapping, .. } => Some(mapping),
            UploadState::Mapping { detected, .. } => Some(detected),
            UploadState::Uploading | UploadState::Error { .. } => self.auto_mapping.as_ref(),
        }
    }

    pub fn headers(&self) -> &[String] {
        self.sample.as_ref().map(|s| s.headers.as_slice()).unwrap_or(&[])
    }

    pub fn preview(&self) -> &[RawRow] {
        self.sample
            .as_ref()
            .map(|s| mapping::preview(&s.rows))
            .unwrap_or(&[])
    }

    pub fn report_draft(&self, uploaded_at: chrono::DateTime<chrono::Utc>) -> Option<ReportDraft> {
        match &self.state {
            UploadState::Completed { mapping, summary } => Some(ReportDraft::from_upload(
                &self.file.name,
                summary,
                mapping,
                uploaded_at,
            )),
            _ => None,
        }
    }

    /// Run one event through the state machine and build the replacement record.
    pub fn apply(&self, event: UploadEvent) -> Result<(UploadedFile, Option<Action>), TransitionError> {
        if matches!(event, UploadEvent::ManualConfirmed(_)) && self.sample.is_none() {
            return Err(TransitionError::NotAccepted {
                status: self.status(),
                event: event.name(),
            });
        }

        let mut next = self.clone();
        match &event {
            UploadEvent::FileRead(Ok(sample)) => next.sample = Some(sample.clone()),
            UploadEvent::Retry => {
                next.sample = None;
                next.auto_mapping = None;
            }
            _ => {}
        }

        let t = transition(&self.state, event)?;
        match &t.state {
            UploadState::AutoMapping { mapping } => next.auto_mapping = Some(mapping.clone()),
            UploadState::Mapping { detected, .. } => next.auto_mapping = Some(detected.clone()),
            _ => {}
        }
        if let Some(progress) = t.state.progress() {
            next.progress = progress;
        }
        next.state = t.state;
        Ok((next, t.action))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("no upload with id {0}")]
    UnknownUpload(UploadId),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Ordered collection of uploads in the current session.
#[derive(Debug, Clone, Default)]
pub struct UploadList {
    entries: Vec<UploadedFile>,
}

impl UploadList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadedFile> {
        self.entries.iter()
    }

    pub fn get(&self, id: UploadId) -> Option<&UploadedFile> {
        self.entries.iter().find(|u| u.id == id)
    }

    pub fn insert(&mut self, upload: UploadedFile) -> UploadId {
        let id = upload.id;
        self.entries.push(upload);
        id
    }

    /// Drop a record regardless of its state.
    pub fn remove(&mut self, id: UploadId) -> Option<UploadedFile> {
        let idx = self.entries.iter().position(|u| u.id == id)?;
        Some(self.entries.remove(idx))
    }

    pub fn apply(&mut self, id: UploadId, event: UploadEvent) -> Result<Option<Action>, ApplyError> {
        let idx = self
            .entries
            .iter()
            .position(|u| u.id == id)
            .ok_or(ApplyError::UnknownUpload(id))?;
        let (next, action) = self.entries[idx].apply(event)?;
        self.entries[idx] = next;
        Ok(action)
    }

    /// True while any upload will still move on by itself.
    pub fn has_in_flight(&self) -> bool {
        self.entries.iter().any(|u| u.status().is_in_flight())
    }
}
