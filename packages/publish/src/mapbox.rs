//! Mapbox Uploads API client.
//!
//! Maps the host's signals onto the publishing contract: HTTP 422 means
//! "processing in progress, retry later", HTTP 201 means the upload was
//! accepted and can be polled, anything else is a hard failure.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{PublishError, TileUploader, UploadStatus, UploadTicket};

const API_BASE: &str = "https://api.mapbox.com/uploads/v1";

/// Response body for an accepted upload.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

/// Response body for a status poll.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    complete: bool,
    error: Option<String>,
}

/// Mapbox implementation of [`TileUploader`].
pub struct MapboxUploader {
    client: reqwest::Client,
    username: String,
    access_token: String,
}

impl MapboxUploader {
    /// Creates a client for the given account.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Http`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(username: &str, access_token: &str) -> Result<Self, PublishError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            username: username.to_string(),
            access_token: access_token.to_string(),
        })
    }
}

#[async_trait]
impl TileUploader for MapboxUploader {
    async fn upload(&self, path: &Path, tileset: &str) -> Result<UploadTicket, PublishError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload.geojson".to_string(), |n| n.to_string_lossy().into_owned());

        let form = reqwest::multipart::Form::new()
            .text("tileset", tileset.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let response = self
            .client
            .post(format!("{API_BASE}/{}", self.username))
            .query(&[("access_token", self.access_token.as_str())])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();

        // 422: the host is still processing a previous upload.
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            return Err(PublishError::NotReady);
        }

        if status == reqwest::StatusCode::CREATED || status.is_success() {
            let body: UploadResponse = response.json().await?;
            return Ok(UploadTicket { id: body.id });
        }

        let message = response.text().await.unwrap_or_default();
        Err(PublishError::Rejected { status, message })
    }

    async fn status(&self, ticket: &UploadTicket) -> Result<UploadStatus, PublishError> {
        let response = self
            .client
            .get(format!("{API_BASE}/{}/{}", self.username, ticket.id))
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected { status, message });
        }

        let body: StatusResponse = response.json().await?;
        if let Some(message) = body.error {
            return Err(PublishError::HostError { message });
        }

        Ok(if body.complete {
            UploadStatus::Complete
        } else {
            UploadStatus::InProgress
        })
    }
}
