//! OpenAPI document for the upload API, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::api::models::uploads::{UploadRequest, UploadResponse};
use crate::errors::ErrorBody;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "dbrelay",
        description = "Relay files from a public URL or a base64 payload into Dropbox."
    ),
    paths(crate::api::handlers::uploads::upload_file),
    components(schemas(UploadRequest, UploadResponse, ErrorBody)),
    tags((name = "uploads", description = "File uploads"))
)]
pub struct ApiDoc;
