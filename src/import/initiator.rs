//! Upload Initiator: local validation, then one POST that yields a job handle.

use std::{future::Future, path::Path, sync::Arc};

use super::{
    api::ImportApi,
    types::{JobHandle, UploadRequest, has_csv_extension},
};
use crate::error::ImportError;

/// Validates and submits files to the import endpoint.
#[derive(Clone)]
pub struct UploadInitiator {
    api: Arc<dyn ImportApi>,
}

impl UploadInitiator {
    pub fn new(api: Arc<dyn ImportApi>) -> Self {
        Self { api }
    }

    /// Submit an in-memory file.
    ///
    /// `announce` runs after validation and before the request is sent, so the
    /// caller can show its 0% panel. Nothing is reset here on failure.
    pub async fn submit<F, Fut>(
        &self,
        file: UploadRequest,
        announce: F,
    ) -> Result<JobHandle, ImportError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        validate(&file.filename)?;
        announce(file.filename.clone()).await;

        tracing::info!("uploading {} ({} bytes)", file.filename, file.bytes.len());
        let handle = self.api.upload(file).await?;
        tracing::info!("upload accepted: task_id={handle}");
        Ok(handle)
    }

    /// Read a file from disk and submit it. The name is checked before reading.
    pub async fn submit_path<F, Fut>(
        &self,
        path: &Path,
        announce: F,
    ) -> Result<JobHandle, ImportError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        validate(&filename)?;

        let bytes = tokio::fs::read(path).await.map_err(|source| ImportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.submit(UploadRequest::new(filename, bytes), announce)
            .await
    }
}

fn validate(filename: &str) -> Result<(), ImportError> {
    if has_csv_extension(filename) {
        Ok(())
    } else {
        tracing::warn!("rejected non-csv file: {filename}");
        Err(ImportError::Validation {
            filename: filename.to_string(),
        })
    }
}
