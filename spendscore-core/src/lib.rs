//! spendscore-core: column mapping, upload pipeline state machine and analysis types
//!
//! Everything in here is synchronous and side-effect free. Reading files and
//! talking to the API live in `spendscore-ingest` and `spendscore-client`.

pub mod analysis;
pub mod draft;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod sample;
pub mod upload;

pub use analysis::{Insights, ReportData, ReportDraft, UploadSummary, failure_message};
pub use draft::MappingDraft;
pub use error::{MappingError, MappingIssue, PipelineError};
pub use mapping::{ColumnMapping, Field, detect, preview, validate};
pub use pipeline::{Action, Transition, TransitionError, UploadEvent, UploadState, UploadStatus, transition};
pub use sample::{CsvSample, RawRow};
pub use upload::{ApplyError, FileHandle, FileSource, UploadId, UploadList, UploadedFile};
