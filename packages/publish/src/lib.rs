#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tileset publishing with asynchronous completion polling.
//!
//! The tile host ingests an uploaded `GeoJSON` file asynchronously: an
//! upload may be turned away with a "processing in progress" signal, and an
//! accepted upload must be polled until the host reports completion. Both
//! loops run at a fixed 5-second interval. Any signal other than
//! not-ready/in-progress is a hard failure and aborts the run immediately —
//! a half-published tileset must never be mistaken for success.
//!
//! The host sits behind the [`TileUploader`] trait so the polling logic is
//! testable without a network and the concrete client can be swapped.

pub mod mapbox;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Fixed interval between upload retries and status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Overall attempt ceiling across upload retries and status polls.
///
/// The observed host behavior suggests retrying indefinitely; a ceiling
/// (120 × 5s = 10 minutes) turns an endless not-ready loop into a clear
/// timeout instead of a hung batch job.
pub const MAX_PUBLISH_ATTEMPTS: u32 = 120;

/// Errors that can occur while publishing a tileset.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The host is still processing a previous upload; retry later.
    #[error("Tile host is not ready; retry later")]
    NotReady,

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to read the artifact file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The host rejected the upload with a non-retryable signal.
    #[error("Tile host rejected upload (HTTP {status}): {message}")]
    Rejected {
        /// Response status code.
        status: reqwest::StatusCode,
        /// Response body or error description.
        message: String,
    },

    /// The host reported a failed ingestion for an accepted upload.
    #[error("Tile host reported upload failure: {message}")]
    HostError {
        /// Error description from the host.
        message: String,
    },

    /// The attempt ceiling was reached before the host finished.
    #[error("Publish did not complete after {attempts} attempts")]
    Timeout {
        /// Attempts consumed before giving up.
        attempts: u32,
    },
}

/// Handle for an accepted upload, used to poll completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    /// Host-assigned upload id.
    pub id: String,
}

/// Ingestion state of an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// The tileset is live.
    Complete,
    /// The host is still ingesting the upload.
    InProgress,
}

/// External tile-hosting collaborator.
#[async_trait]
pub trait TileUploader: Send + Sync {
    /// Submits the artifact at `path` to replace `tileset`.
    ///
    /// # Errors
    ///
    /// [`PublishError::NotReady`] when the host asks to retry later; any
    /// other error is a hard failure.
    async fn upload(&self, path: &Path, tileset: &str) -> Result<UploadTicket, PublishError>;

    /// Reports the ingestion state of an accepted upload.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the host reports a failed ingestion or
    /// the status request itself fails.
    async fn status(&self, ticket: &UploadTicket) -> Result<UploadStatus, PublishError>;
}

/// Uploads an artifact and polls until the host reports completion.
///
/// `NotReady` upload responses are retried at [`POLL_INTERVAL`]; once a
/// ticket is issued, status is polled at the same interval. Every other
/// error aborts immediately.
///
/// # Errors
///
/// Returns the first hard failure, or [`PublishError::Timeout`] if the
/// host does not finish within [`MAX_PUBLISH_ATTEMPTS`].
pub async fn publish_with_retry(
    uploader: &dyn TileUploader,
    path: &Path,
    tileset: &str,
) -> Result<(), PublishError> {
    let mut attempts: u32 = 0;

    let ticket = loop {
        match uploader.upload(path, tileset).await {
            Ok(ticket) => break ticket,
            Err(PublishError::NotReady) => {
                attempts += 1;
                if attempts >= MAX_PUBLISH_ATTEMPTS {
                    return Err(PublishError::Timeout { attempts });
                }
                log::warn!("Tile host not ready for {tileset}, retrying in {POLL_INTERVAL:?}...");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(e) => return Err(e),
        }
    };

    log::info!("Upload accepted for {tileset} (id {})", ticket.id);

    loop {
        match uploader.status(&ticket).await? {
            UploadStatus::Complete => {
                log::info!("Tileset {tileset} update complete");
                return Ok(());
            }
            UploadStatus::InProgress => {
                attempts += 1;
                if attempts >= MAX_PUBLISH_ATTEMPTS {
                    return Err(PublishError::Timeout { attempts });
                }
                log::debug!("Tileset {tileset} still processing, polling again...");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Scripted uploader: pops one response per call.
    struct ScriptedUploader {
        uploads: Mutex<Vec<Result<UploadTicket, PublishError>>>,
        statuses: Mutex<Vec<Result<UploadStatus, PublishError>>>,
        upload_calls: Mutex<u32>,
    }

    impl ScriptedUploader {
        fn new(
            uploads: Vec<Result<UploadTicket, PublishError>>,
            statuses: Vec<Result<UploadStatus, PublishError>>,
        ) -> Self {
            Self {
                uploads: Mutex::new(uploads),
                statuses: Mutex::new(statuses),
                upload_calls: Mutex::new(0),
            }
        }

        fn upload_calls(&self) -> u32 {
            *self.upload_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TileUploader for ScriptedUploader {
        async fn upload(&self, _path: &Path, _tileset: &str) -> Result<UploadTicket, PublishError> {
            *self.upload_calls.lock().unwrap() += 1;
            let mut uploads = self.uploads.lock().unwrap();
            if uploads.is_empty() {
                Err(PublishError::NotReady)
            } else {
                uploads.remove(0)
            }
        }

        async fn status(&self, _ticket: &UploadTicket) -> Result<UploadStatus, PublishError> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.is_empty() {
                Ok(UploadStatus::Complete)
            } else {
                statuses.remove(0)
            }
        }
    }

    fn ticket() -> UploadTicket {
        UploadTicket {
            id: "upload-1".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_not_ready_then_polls_to_completion() {
        let uploader = ScriptedUploader::new(
            vec![
                Err(PublishError::NotReady),
                Err(PublishError::NotReady),
                Ok(ticket()),
            ],
            vec![Ok(UploadStatus::InProgress), Ok(UploadStatus::Complete)],
        );

        publish_with_retry(&uploader, Path::new("hexes.geojson"), "tileset.fr")
            .await
            .unwrap();
        assert_eq!(uploader.upload_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hard_failure_aborts_without_retry() {
        let uploader = ScriptedUploader::new(
            vec![Err(PublishError::Rejected {
                status: reqwest::StatusCode::UNAUTHORIZED,
                message: "bad token".to_string(),
            })],
            vec![],
        );

        let err = publish_with_retry(&uploader, Path::new("hexes.geojson"), "tileset.fr")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected { .. }));
        assert_eq!(uploader.upload_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn host_error_during_polling_aborts() {
        let uploader = ScriptedUploader::new(
            vec![Ok(ticket())],
            vec![
                Ok(UploadStatus::InProgress),
                Err(PublishError::HostError {
                    message: "ingest failed".to_string(),
                }),
            ],
        );

        let err = publish_with_retry(&uploader, Path::new("hexes.geojson"), "tileset.fr")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::HostError { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn endless_not_ready_hits_the_ceiling() {
        let uploader = ScriptedUploader::new(vec![], vec![]);

        let err = publish_with_retry(&uploader, Path::new("hexes.geojson"), "tileset.fr")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Timeout {
                attempts: MAX_PUBLISH_ATTEMPTS
            }
        ));
    }
}
