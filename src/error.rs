//! Error taxonomy for the bulk-import subsystem.

use thiserror::Error;

/// Generic message used when the server gives no usable `detail`.
pub const UPLOAD_FAILED: &str = "Upload failed";

/// Failures that end an import attempt before or during submission.
///
/// A job that reports `failed` and a lost progress stream are not errors:
/// they are outcomes of a running session (see `import::monitor::SessionOutcome`).
#[derive(Debug, Error)]
pub enum ImportError {
    /// The selected file was rejected locally; no request was sent.
    #[error("Please upload a CSV file")]
    Validation { filename: String },
    /// The server answered the upload with a non-2xx status.
    #[error("{detail}")]
    Submission { status: Option<u16>, detail: String },
    /// No response at all (connect/read failure).
    #[error("Could not reach server: {0}")]
    Transport(String),
    /// The local file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// An import session is already running.
    #[error("An import is already in progress")]
    Busy,
}

impl ImportError {
    /// Title used for the toast shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            ImportError::Validation { .. } | ImportError::Busy => "Error",
            ImportError::Submission { .. } | ImportError::Transport(_) | ImportError::Io { .. } => {
                "Upload Error"
            }
        }
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(e: reqwest::Error) -> Self {
        ImportError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        let v = ImportError::Validation {
            filename: "a.txt".into(),
        };
        assert_eq!(v.to_string(), "Please upload a CSV file");
        assert_eq!(v.title(), "Error");

        let s = ImportError::Submission {
            status: Some(400),
            detail: "File must be a CSV".into(),
        };
        assert_eq!(s.to_string(), "File must be a CSV");
        assert_eq!(s.title(), "Upload Error");
    }

    #[test]
    fn test_transport_is_distinct_from_submission() {
        let t = ImportError::Transport("connection refused".into());
        assert!(t.to_string().starts_with("Could not reach server"));
        assert_ne!(t.to_string(), UPLOAD_FAILED);
    }
}
