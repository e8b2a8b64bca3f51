use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::StatusCode,
};

use crate::AppState;
use crate::api::models::uploads::{UploadRequest, UploadResponse};
use crate::errors::{Error, ErrorBody, Result};

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "uploads",
    summary = "Upload a file to Dropbox",
    description = "Fetches the file from `url`, or decodes it from base64 `content`, and uploads it to Dropbox. \
                   Name collisions are resolved by Dropbox renaming the new file.",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Invalid request, unreachable source, or upload rejected by Dropbox", body = ErrorBody),
        (status = 413, description = "Request body exceeds the configured limit", body = ErrorBody),
        (status = 500, description = "Server misconfigured or unexpected failure", body = ErrorBody)
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<UploadResponse>> {
    let body = body?;
    let response = state.relay.handle(&body).await?;
    Ok(Json(response))
}

/// CORS pre-flight. The headers themselves are added to every response by the router.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_config, create_test_server};
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn dropbox_responding(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[test_log::test(tokio::test)]
    async fn test_successful_upload_passes_metadata_through() {
        let dropbox = dropbox_responding(200, r#"{"id":"123"}"#).await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "b.txt", "folder": "/a/", "content": "aGVsbG8=" }))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>(), json!({ "ok": true, "file": { "id": "123" } }));

        let requests = dropbox.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let upload = &requests[0];
        assert_eq!(upload.body, b"hello");
        assert_eq!(upload.headers.get("authorization").unwrap(), "Bearer test-token");
        assert_eq!(upload.headers.get("content-type").unwrap(), "application/octet-stream");
        let arg: Value = serde_json::from_str(upload.headers.get("dropbox-api-arg").unwrap().to_str().unwrap()).unwrap();
        assert_eq!(
            arg,
            json!({ "path": "/a/b.txt", "mode": "add", "autorename": true, "mute": false, "strict_conflict": false })
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_upstream_failure_returns_details() {
        let upstream_body = r#"{"error_summary": "path/insufficient_space/.."}"#;
        let dropbox = dropbox_responding(409, upstream_body).await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "x.png", "content": "aGk=" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "Dropbox upload failed");
        assert_eq!(body["details"], upstream_body);
    }

    #[test_log::test(tokio::test)]
    async fn test_source_fetch_failure_reports_status() {
        let dropbox = dropbox_responding(200, "{}").await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&dropbox)
            .await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "x.png", "url": format!("{}/missing.png", dropbox.uri()) }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("404"));
        // Nothing reached the upload endpoint
        let uploads = dropbox.received_requests().await.unwrap();
        assert!(uploads.iter().all(|r| r.url.path() != "/2/files/upload"));
    }

    #[test_log::test(tokio::test)]
    async fn test_unreachable_source_is_bad_request() {
        let dropbox = dropbox_responding(200, "{}").await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "x", "url": "http://127.0.0.1:9/nope" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("Failed to fetch URL ("));
        assert!(dropbox.received_requests().await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_fields_is_bad_request() {
        let dropbox = dropbox_responding(200, "{}").await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        for body in [json!({ "filename": "a.txt" }), json!({ "content": "aGk=" }), json!({})] {
            let response = server.post("/api/upload").json(&body).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert!(response.json::<Value>()["error"].as_str().unwrap().contains("'filename'"));
        }

        // Empty body is treated as an empty object
        let response = server.post("/api/upload").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["error"].as_str().unwrap().contains("'filename'"));
    }

    #[test_log::test(tokio::test)]
    async fn test_malformed_json_is_bad_request() {
        let dropbox = dropbox_responding(200, "{}").await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        let response = server.post("/api/upload").text("{not json").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>(), json!({ "error": "Invalid JSON body" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_mistyped_json_is_invalid_request_body() {
        let dropbox = dropbox_responding(200, "{}").await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        for body in [r#"{"filename":5,"content":"aGk="}"#, "null", "[1]"] {
            let response = server.post("/api/upload").text(body).await;

            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<Value>(), json!({ "error": "Invalid request body" }), "body: {body}");
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_token_is_server_error() {
        let dropbox = dropbox_responding(200, "{}").await;
        let mut config = create_test_config(&dropbox.uri());
        config.dropbox.access_token = None;
        let server = create_test_server(config);

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "x.png", "content": "aGk=" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>(), json!({ "error": "Missing DROPBOX_ACCESS_TOKEN env var" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_preflight_is_empty_no_content() {
        let dropbox = dropbox_responding(200, "{}").await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        let response = server
            .method(Method::OPTIONS, "/api/upload")
            .json(&json!({ "filename": "ignored" }))
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
        assert!(response.as_bytes().is_empty());
        assert_eq!(response.header("access-control-allow-origin"), "*");
        assert_eq!(response.header("access-control-allow-methods"), "POST, OPTIONS");
        assert_eq!(response.header("access-control-allow-headers"), "Content-Type, Authorization");
    }

    #[test_log::test(tokio::test)]
    async fn test_other_methods_are_rejected() {
        let dropbox = dropbox_responding(200, "{}").await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        for verb in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let response = server.method(verb.clone(), "/api/upload").await;
            response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.json::<Value>(), json!({ "error": "Method not allowed" }), "method: {verb}");
            assert_eq!(response.header("access-control-allow-origin"), "*");
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_method_is_checked_before_token() {
        let dropbox = dropbox_responding(200, "{}").await;
        let mut config = create_test_config(&dropbox.uri());
        config.dropbox.access_token = None;
        let server = create_test_server(config);

        server
            .method(Method::GET, "/api/upload")
            .await
            .assert_status(StatusCode::METHOD_NOT_ALLOWED);
        server
            .method(Method::OPTIONS, "/api/upload")
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[test_log::test(tokio::test)]
    async fn test_unparseable_upstream_success_is_unexpected() {
        let dropbox = dropbox_responding(200, "<html>maintenance</html>").await;
        let server = create_test_server(create_test_config(&dropbox.uri()));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "x.png", "content": "aGk=" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.json::<Value>()["error"].is_string());
    }
}
