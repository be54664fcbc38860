use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the document pipeline.
///
/// Field lookups that fail and missing templates are not represented here:
/// both are recovered where they happen (placeholder value, default builder).
#[derive(Error, Debug)]
pub enum DocketError {
    /// The renderer executable could not be started at all.
    #[error("Renderer unavailable: failed to start {program}: {source}")]
    RendererUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The renderer ran but exited with a non-zero status.
    #[error("Renderer failed with exit code {exit_code}: {stderr}")]
    RendererFailure { exit_code: i32, stderr: String },

    #[error("Renderer timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Rendering was cancelled")]
    Cancelled,

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Invalid folder name: {0}")]
    InvalidFolderName(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad classification of a [`DocketError`] for display and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Bad caller input (unknown folder, unsupported request).
    Input,
    /// The external renderer failed, hung, or is missing.
    Renderer,
    /// Disk or archive I/O.
    FileSystem,
    /// Everything else.
    Internal,
}

impl DocketError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DirectoryNotFound(_)
            | Self::InvalidFolderName(_)
            | Self::UnsupportedOperation(_) => ErrorCategory::Input,
            Self::RendererUnavailable { .. }
            | Self::RendererFailure { .. }
            | Self::TimedOut(_)
            | Self::Cancelled => ErrorCategory::Renderer,
            Self::Archive(_) | Self::Io(_) => ErrorCategory::FileSystem,
            Self::Workbook(_) | Self::Serialization(_) | Self::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Returns a short message suitable for end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::RendererUnavailable { program, .. } => {
                format!("PDF renderer '{program}' is not installed or could not be started.")
            }
            Self::RendererFailure { stderr, .. } => {
                let detail = stderr.trim();
                if detail.is_empty() {
                    "PDF rendering failed.".into()
                } else {
                    format!("PDF rendering failed: {detail}")
                }
            }
            Self::TimedOut(after) => {
                format!("PDF rendering took longer than {}s.", after.as_secs())
            }
            Self::Cancelled => "PDF rendering was cancelled.".into(),
            Self::DirectoryNotFound(path) => format!("Folder not found: {}", path.display()),
            Self::InvalidFolderName(name) => format!("Invalid folder name: {name}"),
            Self::UnsupportedOperation(what) => format!("Not supported: {what}"),
            Self::Io(_) | Self::Archive(_) => {
                "File error. Check disk space and permissions.".into()
            }
            Self::Workbook(_) | Self::Serialization(_) | Self::Internal(_) => {
                "An unexpected error occurred.".into()
            }
        }
    }
}

pub type Result<T, E = DocketError> = std::result::Result<T, E>;
