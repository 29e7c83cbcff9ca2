//! spendscore-client: the `/upload` and `/reports` HTTP client and the async
//! manager that drives every selected file through its pipeline.

pub mod api;
pub mod manager;
pub mod source;

pub use api::{ApiClient, ApiConfig, Submitter};
pub use manager::{PipelineConfig, UploadManager};
pub use source::{load_bytes, read_file};
