//! Fetching source files from public URLs.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::errors::{Error, Result};

/// Downloads `url` in full.
///
/// A non-success status or an unreachable source is the caller's problem (400). When
/// `max_bytes` is set, bodies larger than it are rejected while streaming.
#[tracing::instrument(skip(client))]
pub async fn fetch_source(client: &reqwest::Client, url: &str, max_bytes: Option<u64>) -> Result<Bytes> {
    let mut response = client.get(url).send().await.map_err(fetch_failed)?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::BadRequest {
            message: format!("Failed to fetch URL ({})", status.as_u16()),
        });
    }

    let Some(limit) = max_bytes else {
        let body = response.bytes().await.map_err(fetch_failed)?;
        debug!(bytes = body.len(), "Fetched source file");
        return Ok(body);
    };

    if let Some(length) = response.content_length()
        && length > limit
    {
        return Err(too_large(limit));
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(fetch_failed)? {
        if (body.len() + chunk.len()) as u64 > limit {
            return Err(too_large(limit));
        }
        body.extend_from_slice(&chunk);
    }

    debug!(bytes = body.len(), "Fetched source file");
    Ok(body.freeze())
}

fn fetch_failed(err: reqwest::Error) -> Error {
    debug!(error = %err, "Source fetch failed");
    Error::BadRequest {
        message: format!("Failed to fetch URL ({err})"),
    }
}

fn too_large(limit: u64) -> Error {
    Error::BadRequest {
        message: format!("Source file exceeds the {limit} byte limit"),
    }
}
