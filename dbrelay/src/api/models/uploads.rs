use serde::{Deserialize, Serialize};
use serde_json::{Value, error::Category};
use utoipa::ToSchema;

use crate::errors::{Error, Result};

pub const MISSING_FIELDS_MESSAGE: &str = "Provide 'filename' and either 'url' (public file URL) or 'content' (base64).";

/// Upload request body
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UploadRequest {
    /// Name of the file in Dropbox
    #[schema(example = "report.pdf")]
    pub filename: Option<String>,
    /// Public URL to fetch the file from. Takes precedence over `content`.
    #[schema(example = "https://example.com/report.pdf")]
    pub url: Option<String>,
    /// Base64 file contents, optionally as a data URL (`data:...;base64,...`)
    pub content: Option<String>,
    /// Destination folder. Falls back to the configured default.
    #[schema(example = "/reports")]
    pub folder: Option<String>,
}

/// Where the file bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource<'a> {
    Url(&'a str),
    Content(&'a str),
}

impl UploadRequest {
    /// Parses a raw request body. An empty body is an empty request.
    ///
    /// Unparseable input is "Invalid JSON body"; valid JSON of the wrong shape is
    /// "Invalid request body".
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(error = %e, "Rejecting request body");
            let message = match e.classify() {
                Category::Data => "Invalid request body",
                Category::Io | Category::Syntax | Category::Eof => "Invalid JSON body",
            };
            Error::BadRequest {
                message: message.to_string(),
            }
        })
    }

    /// Checks the required fields, treating empty strings as absent.
    pub fn validate(&self) -> Result<(&str, FileSource<'_>)> {
        let filename = present(&self.filename);
        let source = present(&self.url)
            .map(FileSource::Url)
            .or_else(|| present(&self.content).map(FileSource::Content));

        match (filename, source) {
            (Some(filename), Some(source)) => Ok((filename, source)),
            _ => Err(Error::BadRequest {
                message: MISSING_FIELDS_MESSAGE.to_string(),
            }),
        }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Successful upload response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Always `true`
    pub ok: bool,
    /// File metadata exactly as returned by Dropbox
    #[schema(value_type = Object)]
    pub file: Value,
}

impl UploadResponse {
    pub fn new(file: Value) -> Self {
        Self { ok: true, file }
    }
}
