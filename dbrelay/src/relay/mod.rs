//! The upload pipeline: validate, acquire bytes, upload, report.
//!
//! [`UploadRelay::handle`] runs one request end to end and returns either the response body or an
//! [`Error`]. It knows nothing about HTTP methods or status codes; the axum handlers in
//! [`crate::api::handlers`] do that translation.

pub mod content;
pub mod dropbox;
pub mod path;
pub mod source;

use bytes::Bytes;
use tracing::info;

use crate::api::models::uploads::{FileSource, UploadRequest, UploadResponse};
use crate::config::{DropboxConfig, LimitsConfig};
use crate::errors::{Error, Result};
use dropbox::DropboxClient;

pub struct UploadRelay {
    client: reqwest::Client,
    dropbox: DropboxClient,
    access_token: Option<String>,
    default_folder: Option<String>,
    max_source_bytes: Option<u64>,
}

impl UploadRelay {
    pub fn new(client: reqwest::Client, dropbox: &DropboxConfig, limits: &LimitsConfig) -> Result<Self> {
        Ok(Self {
            dropbox: DropboxClient::new(client.clone(), &dropbox.content_url)?,
            client,
            access_token: dropbox.access_token().map(str::to_string),
            default_folder: dropbox.default_folder.clone(),
            max_source_bytes: limits.max_source_bytes,
        })
    }

    /// Runs the pipeline for one raw request body.
    #[tracing::instrument(skip_all)]
    pub async fn handle(&self, body: &[u8]) -> Result<UploadResponse> {
        let token = self.access_token.as_deref().ok_or_else(|| Error::ServerMisconfigured {
            message: "Missing DROPBOX_ACCESS_TOKEN env var".to_string(),
        })?;

        let request = UploadRequest::from_body(body)?;
        let (filename, source) = request.validate()?;

        let payload = self.acquire(source).await?;

        let folder = path::effective_folder(request.folder.as_deref(), self.default_folder.as_deref());
        let destination = path::destination_path(folder, filename);
        info!(path = %destination, bytes = payload.len(), "Relaying file to Dropbox");

        let file = self.dropbox.upload(token, &destination, payload).await?;
        Ok(UploadResponse::new(file))
    }

    async fn acquire(&self, source: FileSource<'_>) -> Result<Bytes> {
        match source {
            FileSource::Url(url) => source::fetch_source(&self.client, url, self.max_source_bytes).await,
            FileSource::Content(content) => Ok(Bytes::from(content::decode_content(content))),
        }
    }
}
