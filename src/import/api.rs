//! HTTP endpoints of the import job service.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, header::ACCEPT, multipart};
use serde::Deserialize;
use std::time::Duration;

use super::{
    sse,
    types::{JobHandle, UploadRequest},
};
use crate::{
    config::{Config, ServerCfg},
    error::{ImportError, UPLOAD_FAILED},
};

/// Payloads of one progress channel, in server order.
///
/// `Err` means the transport failed mid-stream; end of stream means the
/// server closed the channel.
pub type EventStream = BoxStream<'static, Result<String, ImportError>>;

/// Server side of the import protocol.
#[async_trait]
pub trait ImportApi: Send + Sync {
    /// Send the file and return the job handle from a 2xx response.
    async fn upload(&self, req: UploadRequest) -> Result<JobHandle, ImportError>;

    /// Open the server-push channel for one job.
    async fn open_progress(&self, handle: &JobHandle) -> Result<EventStream, ImportError>;
}

/// Success body of the upload endpoint.
#[derive(Debug, Deserialize)]
struct UploadResp {
    task_id: Option<String>,
}

/// Error body of the upload endpoint. `detail` is not always a string.
#[derive(Debug, Deserialize)]
struct ErrorResp {
    detail: Option<serde_json::Value>,
}

/// `ImportApi` over reqwest.
#[derive(Clone)]
pub struct HttpImportApi {
    http: Client,
    server: ServerCfg,
    file_field: String,
}

impl HttpImportApi {
    pub fn new(http: Client, server: ServerCfg, file_field: impl Into<String>) -> Self {
        Self {
            http,
            server,
            file_field: file_field.into(),
        }
    }

    /// Build a client from config. No overall request timeout is set because
    /// the progress stream stays open for the whole job.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(cfg.server.connect_timeout_secs))
            .build()?;
        Ok(Self::new(
            http,
            cfg.server.clone(),
            cfg.import.file_field.clone(),
        ))
    }

    /// Underlying client, shared with the catalog listing.
    pub fn http(&self) -> &Client {
        &self.http
    }

    fn progress_url(&self, handle: &JobHandle) -> String {
        format!(
            "{}/{}",
            self.server.url(&self.server.progress_path),
            urlencoding::encode(handle.as_str())
        )
    }
}

#[async_trait]
impl ImportApi for HttpImportApi {
    async fn upload(&self, req: UploadRequest) -> Result<JobHandle, ImportError> {
        let part = multipart::Part::bytes(req.bytes)
            .file_name(req.filename)
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part(self.file_field.clone(), part);

        let resp = self
            .http
            .post(self.server.url(&self.server.upload_path))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("upload rejected: {status}");
            return Err(ImportError::Submission {
                status: Some(status.as_u16()),
                detail: detail_from_body(&body),
            });
        }

        let body = resp
            .json::<UploadResp>()
            .await
            .map_err(|e| ImportError::Submission {
                status: Some(status.as_u16()),
                detail: format!("invalid upload response: {e}"),
            })?;
        body.task_id
            .filter(|id| !id.is_empty())
            .map(JobHandle::new)
            .ok_or_else(|| ImportError::Submission {
                status: Some(status.as_u16()),
                detail: "upload response missing task_id".into(),
            })
    }

    async fn open_progress(&self, handle: &JobHandle) -> Result<EventStream, ImportError> {
        let resp = self
            .http
            .get(self.progress_url(handle))
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ImportError::Transport(format!(
                "progress stream returned {status}"
            )));
        }
        Ok(sse::data_frames(resp.bytes_stream()).boxed())
    }
}

/// Pick a human-readable `detail` out of an error body, else the generic text.
fn detail_from_body(body: &str) -> String {
    serde_json::from_str::<ErrorResp>(body)
        .ok()
        .and_then(|r| r.detail)
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UPLOAD_FAILED.to_string())
}
