//! Common types used across the frontend application.
//!
//! This module centralizes type definitions to avoid duplication
//! and ensure consistency across components.
//!
//! # Categories
//!
//! - **File Types** - Selected files and their upload state
//! - **Bundle Types** - Groups of files sharing a custodian
//! - **Upload Events** - What an upload task reports back
//! - **Error Types** - Frontend error handling

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DEFAULT_CUSTODIAN;

// =============================================================================
// File Types
// =============================================================================

/// Description of a file picked or dropped by the user.
///
/// The blob itself is handed to the upload task; only its
/// description is kept in the UI state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// File name, without path
    pub name: String,
    /// MIME type reported by the browser (may be empty)
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
}

impl From<&web_sys::File> for FileMeta {
    fn from(file: &web_sys::File) -> Self {
        Self {
            name: file.name(),
            mime_type: file.type_(),
            size: file.size() as u64,
        }
    }
}

/// Upload state of a single file slot.
///
/// `complete` and `error` are never both set, and `url` is only
/// present once `complete` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadableFile {
    /// Selected file, `None` if it could not be read
    pub file: Option<FileMeta>,
    /// Percentage in [0, 100]
    pub progress: f64,
    /// Upload finished successfully
    pub complete: bool,
    /// Upload failed or the file was unreadable
    pub error: bool,
    /// Remote location of the finished upload
    pub url: Option<String>,
}

impl UploadableFile {
    /// Fresh slot for a readable file, upload not started yet.
    pub fn pending(meta: FileMeta) -> Self {
        Self {
            file: Some(meta),
            progress: 0.0,
            complete: false,
            error: false,
            url: None,
        }
    }

    /// Slot for an entry that could not be resolved to a file.
    pub fn unreadable() -> Self {
        Self {
            file: None,
            progress: 0.0,
            complete: false,
            error: true,
            url: None,
        }
    }

    /// True once no further upload event can change this slot.
    pub fn is_terminal(&self) -> bool {
        self.complete || self.error
    }

    /// Display name, empty for unreadable entries.
    pub fn name(&self) -> &str {
        self.file.as_ref().map(|f| f.name.as_str()).unwrap_or_default()
    }
}

// =============================================================================
// Bundle Types
// =============================================================================

/// Files added in one drop or picker interaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileBundle {
    /// Files, in the order they were selected
    pub files: Vec<UploadableFile>,
    /// Free-text label, editable at any time
    pub custodian: String,
}

impl FileBundle {
    /// New bundle with the default custodian.
    pub fn new(files: Vec<UploadableFile>) -> Self {
        Self {
            files,
            custodian: DEFAULT_CUSTODIAN.to_string(),
        }
    }
}

/// Position of a file slot in the bundle list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotRef {
    /// Bundle index
    pub bundle: usize,
    /// File index within the bundle
    pub file: usize,
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bundle, self.file)
    }
}

// =============================================================================
// Upload Events
// =============================================================================

/// Notification emitted by an upload task.
///
/// A task emits any number of `Progress` events followed by at most
/// one terminal event (`Failed` or `Succeeded`).
#[derive(Clone, Debug, PartialEq)]
pub enum UploadEvent {
    /// Bytes acknowledged by the server so far.
    Progress { bytes_uploaded: u64, bytes_total: u64 },
    /// The upload gave up.
    Failed(UploadError),
    /// The upload finished; `url` is the remote resource.
    Succeeded { url: String },
}

/// Percentage of `bytes_total` covered by `bytes_uploaded`.
///
/// An empty upload reports 0 until it succeeds.
pub fn progress_percent(bytes_uploaded: u64, bytes_total: u64) -> f64 {
    if bytes_total == 0 {
        return 0.0;
    }
    bytes_uploaded as f64 / bytes_total as f64 * 100.0
}

// =============================================================================
// Error Types
// =============================================================================

/// Upload errors.
///
/// They are logged and collapse into the per-file `error` flag;
/// the consumer never sees them.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadError {
    /// The selected entry could not be read as a file.
    Unreadable,
    /// Request could not be sent or no response was received.
    Network(String),
    /// Server answered with an unexpected status.
    Status { code: u16, body: String },
    /// Server answer is missing a required header or has a bad value.
    Protocol(String),
    /// Every retry failed; holds the last error.
    RetriesExhausted(Box<UploadError>),
}

impl UploadError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UploadError::Network(_) => true,
            UploadError::Status { code, .. } => crate::services::tus::is_retryable(*code),
            UploadError::Unreadable
            | UploadError::Protocol(_)
            | UploadError::RetriesExhausted(_) => false,
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Unreadable => write!(f, "File could not be read"),
            UploadError::Network(msg) => write!(f, "Network error: {}", msg),
            UploadError::Status { code, body } => write!(f, "Server error ({}): {}", code, body),
            UploadError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            UploadError::RetriesExhausted(last) => write!(f, "Giving up after retries: {}", last),
        }
    }
}

impl std::error::Error for UploadError {}

/// Result type alias for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            size: 12,
        }
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 200), 0.0);
        assert_eq!(progress_percent(50, 200), 25.0);
        assert_eq!(progress_percent(200, 200), 100.0);
        assert_eq!(progress_percent(0, 0), 0.0);
    }

    #[test]
    fn test_slot_constructors() {
        let pending = UploadableFile::pending(meta("a.txt"));
        assert!(!pending.is_terminal());
        assert_eq!(pending.name(), "a.txt");
        assert_eq!(pending.url, None);

        let unreadable = UploadableFile::unreadable();
        assert!(unreadable.error);
        assert!(!unreadable.complete);
        assert!(unreadable.file.is_none());
        assert_eq!(unreadable.name(), "");
    }

    #[test]
    fn test_new_bundle_is_anonymous() {
        let bundle = FileBundle::new(vec![UploadableFile::pending(meta("a.txt"))]);
        assert_eq!(bundle.custodian, "Anonymous");
        assert_eq!(bundle.files.len(), 1);
    }

    #[test]
    fn test_transient_errors() {
        assert!(UploadError::Network("offline".into()).is_transient());
        assert!(UploadError::Status { code: 503, body: String::new() }.is_transient());
        assert!(!UploadError::Status { code: 404, body: String::new() }.is_transient());
        assert!(!UploadError::Protocol("no Location".into()).is_transient());
    }

    #[test]
    fn test_bundle_serializes_for_consumer() {
        let bundle = FileBundle::new(vec![UploadableFile::pending(meta("a.txt"))]);
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["custodian"], "Anonymous");
        assert_eq!(json["files"][0]["file"]["mimeType"], "text/plain");
        assert_eq!(json["files"][0]["url"], serde_json::Value::Null);
    }
}
