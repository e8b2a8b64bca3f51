//! Client for the Dropbox content API `files/upload` endpoint.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use tracing::{debug, info};
use url::Url;

use crate::errors::{Error, Result};

pub const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Write mode for a single upload. Name collisions are resolved by Dropbox renaming the new
/// file, so an existing file is never overwritten.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadArg<'a> {
    pub path: &'a str,
    pub mode: &'static str,
    pub autorename: bool,
    pub mute: bool,
    pub strict_conflict: bool,
}

impl<'a> UploadArg<'a> {
    pub fn add(path: &'a str) -> Self {
        Self {
            path,
            mode: "add",
            autorename: true,
            mute: false,
            strict_conflict: false,
        }
    }

    /// JSON for the `Dropbox-API-Arg` header, with DEL and every non-ASCII character written as
    /// a `\uXXXX` escape so the value is a valid header.
    pub fn header_value(&self) -> Result<HeaderValue> {
        let json = serde_json::to_string(self)?;
        let mut escaped = String::with_capacity(json.len());
        for c in json.chars() {
            if c.is_ascii() && c != '\x7f' {
                escaped.push(c);
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // Writing into a String cannot fail
                    let _ = write!(escaped, "\\u{unit:04x}");
                }
            }
        }
        HeaderValue::from_str(&escaped).map_err(|e| Error::BadRequest {
            message: format!("Destination path cannot be sent to Dropbox: {e}"),
        })
    }
}

#[derive(Clone)]
pub struct DropboxClient {
    client: reqwest::Client,
    upload_url: Url,
}

impl DropboxClient {
    pub fn new(client: reqwest::Client, content_url: &Url) -> Result<Self> {
        let upload_url = content_url
            .join("2/files/upload")
            .map_err(|e| anyhow::anyhow!("Invalid Dropbox content URL '{content_url}': {e}"))?;
        Ok(Self { client, upload_url })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    /// Uploads `body` to `path` and returns Dropbox's file metadata untouched.
    #[tracing::instrument(skip(self, token, body), fields(bytes = body.len()))]
    pub async fn upload(&self, token: &str, path: &str, body: Bytes) -> Result<Value> {
        let arg = UploadArg::add(path).header_value()?;

        debug!(url = %self.upload_url, "Uploading to Dropbox");

        let response = self
            .client
            .post(self.upload_url.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(API_ARG_HEADER, arg)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await?;
            return Err(Error::UploadFailed {
                message: "Dropbox upload failed".to_string(),
                details,
            });
        }

        let metadata: Value = response.json().await?;
        info!(status = status.as_u16(), "Dropbox upload completed");
        Ok(metadata)
    }
}
