//! Per-file upload state machine.
//!
//! ```text
//! uploading ──read ok──▶ auto-mapping ──debounce──▶ processing ──▶ completed
//!     │          └─amount missing─▶ mapping ──confirm──┘     └──▶ error
//!     └──read failed──▶ error ──retry──▶ uploading
//! ```
//!
//! `transition` is pure. The caller performs the returned [`Action`] and feeds
//! the outcome back in as the next event.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::analysis::UploadSummary;
use crate::error::{MappingIssue, PipelineError};
use crate::mapping::{self, ColumnMapping};
use crate::sample::CsvSample;

pub const UPLOADING_PROGRESS: u8 = 20;
pub const MAPPING_PROGRESS: u8 = 50;
pub const PROCESSING_PROGRESS: u8 = 70;
pub const COMPLETED_PROGRESS: u8 = 100;

/// Flat status tag, handy for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadStatus {
    Uploading,
    AutoMapping,
    Mapping,
    Processing,
    Completed,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::AutoMapping => "auto-mapping",
            UploadStatus::Mapping => "mapping",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Error => "error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "Reading file...",
            UploadStatus::AutoMapping => "Auto-detecting columns...",
            UploadStatus::Mapping => "Manual column mapping required",
            UploadStatus::Processing => "Processing data...",
            UploadStatus::Completed => "Analysis complete!",
            UploadStatus::Error => "An error occurred",
        }
    }

    /// Completed and error end a submission attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Error)
    }

    /// States that will move on without anyone stepping in.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            UploadStatus::Uploading | UploadStatus::AutoMapping | UploadStatus::Processing
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    /// File content is being read.
    Uploading,
    /// Detection found an amount column; submission follows after a short debounce.
    AutoMapping { mapping: ColumnMapping },
    /// Waiting for a person to supply a mapping.
    Mapping { detected: ColumnMapping, reason: String },
    /// Submitted, waiting for the server.
    Processing { mapping: ColumnMapping },
    Completed {
        mapping: ColumnMapping,
        summary: UploadSummary,
    },
    Error { error: PipelineError },
}

impl UploadState {
    pub fn status(&self) -> UploadStatus {
        match self {
            UploadState::Uploading => UploadStatus::Uploading,
            UploadState::AutoMapping { .. } => UploadStatus::AutoMapping,
            UploadState::Mapping { .. } => UploadStatus::Mapping,
            UploadState::Processing { .. } => UploadStatus::Processing,
            UploadState::Completed { .. } => UploadStatus::Completed,
            UploadState::Error { .. } => UploadStatus::Error,
        }
    }

    /// Progress for this state. `None` for error, which keeps whatever came before.
    pub fn progress(&self) -> Option<u8> {
        match self {
            UploadState::Uploading => Some(UPLOADING_PROGRESS),
            UploadState::AutoMapping { .. } | UploadState::Mapping { .. } => {
                Some(MAPPING_PROGRESS)
            }
            UploadState::Processing { .. } => Some(PROCESSING_PROGRESS),
            UploadState::Completed { .. } => Some(COMPLETED_PROGRESS),
            UploadState::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    FileRead(Result<CsvSample, PipelineError>),
    DebounceElapsed,
    ManualConfirmed(ColumnMapping),
    SubmitFinished(Result<Value, PipelineError>),
    Retry,
    Fail(PipelineError),
}

impl UploadEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UploadEvent::FileRead(_) => "file-read",
            UploadEvent::DebounceElapsed => "debounce-elapsed",
            UploadEvent::ManualConfirmed(_) => "manual-confirmed",
            UploadEvent::SubmitFinished(_) => "submit-finished",
            UploadEvent::Retry => "retry",
            UploadEvent::Fail(_) => "fail",
        }
    }
}

/// Side effect the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ReadFile,
    /// Wait out the debounce, then send [`UploadEvent::DebounceElapsed`].
    ScheduleSubmit(ColumnMapping),
    Submit(ColumnMapping),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: UploadState,
    pub action: Option<Action>,
}

impl Transition {
    fn to(state: UploadState) -> Self {
        Self {
            state,
            action: None,
        }
    }

    fn then(state: UploadState, action: Action) -> Self {
        Self {
            state,
            action: Some(action),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("event '{event}' is not accepted while {status}")]
    NotAccepted {
        status: UploadStatus,
        event: &'static str,
    },

    #[error(transparent)]
    Rejected(#[from] PipelineError),
}

pub fn transition(state: &UploadState, event: UploadEvent) -> Result<Transition, TransitionError> {
    let from = state.status();
    let event_name = event.name();

    let next = match (state, event) {
        (UploadState::Uploading, UploadEvent::FileRead(Ok(sample))) => {
            let detected = mapping::detect(&sample.headers);
            if mapping::validate(&detected).contains(&MappingIssue::AmountRequired) {
                Transition::to(UploadState::Mapping {
                    detected,
                    reason: PipelineError::MappingIncomplete.to_string(),
                })
            } else {
                Transition::then(
                    UploadState::AutoMapping {
                        mapping: detected.clone(),
                    },
                    Action::ScheduleSubmit(detected),
                )
            }
        }
        (UploadState::Uploading, UploadEvent::FileRead(Err(error))) => {
            Transition::to(UploadState::Error { error })
        }
        (UploadState::AutoMapping { mapping }, UploadEvent::DebounceElapsed) => processing(mapping.clone()),
        (
            UploadState::AutoMapping { .. } | UploadState::Mapping { .. } | UploadState::Error { .. },
            UploadEvent::ManualConfirmed(mapping),
        ) => {
            let issues = mapping::validate(&mapping);
            if !issues.is_empty() {
                return Err(PipelineError::MappingInvalid(issues).into());
            }
            processing(mapping)
        }
        (UploadState::Processing { mapping }, UploadEvent::SubmitFinished(Ok(body))) => {
            match UploadSummary::from_response(body) {
                Ok(summary) => Transition::to(UploadState::Completed {
                    mapping: mapping.clone(),
                    summary,
                }),
                Err(error) => Transition::to(UploadState::Error { error }),
            }
        }
        (UploadState::Processing { .. }, UploadEvent::SubmitFinished(Err(error))) => {
            Transition::to(UploadState::Error { error })
        }
        (UploadState::Error { .. }, UploadEvent::Retry) => {
            Transition::then(UploadState::Uploading, Action::ReadFile)
        }
        (current, UploadEvent::Fail(error)) if !current.status().is_terminal() => {
            Transition::to(UploadState::Error { error })
        }
        _ => {
            return Err(TransitionError::NotAccepted {
                status: from,
                event: event_name,
            });
        }
    };

    debug!(from = %from, to = %next.state.status(), event = event_name, "upload transition");
    Ok(next)
}

fn processing(mapping: ColumnMapping) -> Transition {
    Transition::then(
        UploadState::Processing {
            mapping: mapping.clone(),
        },
        Action::Submit(mapping),
    )
}
