//! HTTP client for the analysis backend.
//!
//! `POST {base}/upload` takes a multipart form with the CSV bytes (`file`), the
//! JSON-encoded mapping (`mapping`) and a free-text context label (`company_name`).
//! `POST {base}/reports` takes a [`ReportDraft`] as JSON.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use spendscore_core::analysis::GENERIC_UPLOAD_FAILURE;
use spendscore_core::{ColumnMapping, FileHandle, PipelineError, ReportDraft, failure_message};
use tracing::{debug, info, warn};

use crate::source::load_bytes;

/// Sends a file and its confirmed mapping for analysis and returns the response body.
pub trait Submitter: Send + Sync + 'static {
    fn submit(
        &self,
        file: FileHandle,
        mapping: ColumnMapping,
    ) -> impl Future<Output = Result<Value, PipelineError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub context_label: String,
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout: Duration::from_secs(10),
            context_label: "FinDash Demo Company".to_string(),
            auth_token: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers(config.auth_token.as_deref()))
            .build()
            .map_err(transport_error)?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn upload(&self, file: &FileHandle, mapping: &ColumnMapping) -> Result<Value, PipelineError> {
        let bytes = load_bytes(file).await?;
        let mapping_json = serde_json::to_string(mapping)
            .map_err(|e| PipelineError::malformed(format!("could not encode mapping: {e}")))?;
        let part = Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str("text/csv")
            .map_err(transport_error)?;
        let form = Form::new()
            .part("file", part)
            .text("mapping", mapping_json)
            .text("company_name", self.config.context_label.clone());

        info!(file = %file.name, "submitting upload");
        let resp = self
            .http
            .post(self.url("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(resp).await
    }

    /// Persist a completed upload as a report.
    pub async fn create_report(&self, draft: &ReportDraft) -> Result<Value, PipelineError> {
        debug!(title = %draft.title, "creating report");
        let resp = self
            .http
            .post(self.url("reports"))
            .json(draft)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(resp).await
    }
}

impl Submitter for ApiClient {
    async fn submit(&self, file: FileHandle, mapping: ColumnMapping) -> Result<Value, PipelineError> {
        self.upload(&file, &mapping).await
    }
}

fn default_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(v) => {
                headers.insert(AUTHORIZATION, v);
            }
            Err(_) => warn!("auth token contains invalid header characters; sending without it"),
        }
    }
    headers
}

async fn read_json(resp: reqwest::Response) -> Result<Value, PipelineError> {
    let status = resp.status();
    let body = resp.text().await.map_err(transport_error)?;
    if !status.is_success() {
        let message = failure_message(&status.to_string(), &body);
        warn!(%status, %message, "request rejected");
        return Err(PipelineError::transport(message));
    }
    serde_json::from_str(&body)
        .map_err(|e| PipelineError::InvalidResponse(format!("response is not valid JSON: {e}")))
}

fn transport_error(e: reqwest::Error) -> PipelineError {
    let message = if e.is_timeout() {
        "Request timed out".to_string()
    } else {
        e.to_string()
    };
    if message.trim().is_empty() {
        PipelineError::transport(GENERIC_UPLOAD_FAILURE)
    } else {
        PipelineError::transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let client = ApiClient::new(ApiConfig {
            base_url: "http://localhost:5000/api/".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();
        assert_eq!(client.url("upload"), "http://localhost:5000/api/upload");
        assert_eq!(client.url("/reports"), "http://localhost:5000/api/reports");
    }

    #[test]
    fn test_default_headers() {
        let h = default_headers(None);
        assert_eq!(h[ACCEPT], "application/json");
        assert!(!h.contains_key(AUTHORIZATION));

        let h = default_headers(Some(" abc123 "));
        assert_eq!(h[AUTHORIZATION], "Bearer abc123");

        let h = default_headers(Some("bad\ntoken"));
        assert!(!h.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(ApiConfig {
            base_url: format!("http://{addr}/api"),
            timeout: Duration::from_secs(2),
            ..ApiConfig::default()
        })
        .unwrap();
        let file = FileHandle::in_memory("a.csv", b"Amount\n1\n".to_vec());
        let mapping = ColumnMapping::default().with(spendscore_core::Field::Amount, "Amount");
        let err = client.submit(file, mapping).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(ref m) if !m.is_empty()));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let client = ApiClient::new(ApiConfig {
            base_url: format!("http://{addr}/api"),
            timeout: Duration::from_millis(200),
            ..ApiConfig::default()
        })
        .unwrap();
        let file = FileHandle::in_memory("a.csv", b"Amount\n1\n".to_vec());
        let mapping = ColumnMapping::default().with(spendscore_core::Field::Amount, "Amount");
        let err = client.submit(file, mapping).await.unwrap_err();
        assert_eq!(err, PipelineError::transport("Request timed out"));

        server.abort();
    }

    #[test]
    fn test_default_timeout_is_ten_seconds() {
        assert_eq!(ApiConfig::default().timeout, Duration::from_secs(10));
    }
}
