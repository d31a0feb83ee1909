#![doc = "HTTP implementations of the core collaborator traits: the archive uploader and the file lookup client."]
//
//! Both clients share one `reqwest` configuration (user agent, connect and total
//! timeouts) and map every transport failure to
//! [`PflError::Transport`](pfl_core::PflError::Transport). Nothing is retried.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use pfl_core::config::Settings;
use pfl_core::contract::{FileQuery, QueryHit, UploadResponse, Uploader};
use pfl_core::query::parse_response;
use pfl_core::PflError;
use reqwest::multipart::{Form, Part};

/// Multipart field the upload endpoint reads the archive from.
pub const UPLOAD_FIELD: &str = "foo";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_client(settings: &Settings) -> Result<reqwest::Client, PflError> {
    reqwest::Client::builder()
        .user_agent(concat!("pfl/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(transport_error)
}

/// Classify a `reqwest` failure the way it is reported to the user.
pub fn transport_error(e: reqwest::Error) -> PflError {
    let kind = if e.is_timeout() {
        "Timeout"
    } else if e.is_connect() {
        "A connection error occurred"
    } else if e.is_status() {
        "An HTTP error occurred"
    } else {
        "Something went totally wrong with the request"
    };
    tracing::error!(error = %e, kind, "HTTP request failed");
    PflError::Transport(format!("{kind}: {e}"))
}

pub struct HttpUploader {
    client: reqwest::Client,
    url: String,
}

impl HttpUploader {
    pub fn new(settings: &Settings) -> Result<Self, PflError> {
        tracing::info!(url = %settings.upload_url, "Initialised HTTP uploader");
        Ok(Self {
            client: build_client(settings)?,
            url: settings.upload_url.clone(),
        })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, archive: &Path) -> Result<UploadResponse, PflError> {
        let bytes = tokio::fs::read(archive).await?;
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pfl.tar".to_string());
        tracing::info!(
            archive = %archive.display(),
            bytes = bytes.len(),
            url = %self.url,
            "Uploading archive"
        );

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/x-tar")
            .map_err(transport_error)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        tracing::info!(status = status.as_u16(), "HTTP Response Code");
        tracing::debug!(body = %body, "HTTP Response Body");
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "Upload rejected");
            return Err(PflError::Transport(format!(
                "An HTTP error occurred: {status}: {body}"
            )));
        }

        Ok(UploadResponse {
            status: status.as_u16(),
            body,
        })
    }
}

pub struct HttpFileQuery {
    client: reqwest::Client,
    url: String,
}

impl HttpFileQuery {
    pub fn new(settings: &Settings) -> Result<Self, PflError> {
        Ok(Self {
            client: build_client(settings)?,
            url: settings.query_url.clone(),
        })
    }
}

#[async_trait]
impl FileQuery for HttpFileQuery {
    async fn query(&self, pattern: &str) -> Result<Vec<QueryHit>, PflError> {
        tracing::info!(pattern, url = %self.url, "Querying file lookup service");
        let response = self
            .client
            .get(&self.url)
            .query(&[("file", pattern)])
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;
        let body = response.text().await.map_err(transport_error)?;
        parse_response(&body)
    }
}
