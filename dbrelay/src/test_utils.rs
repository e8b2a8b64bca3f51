//! Shared builders for router-level tests.

use crate::config::Config;
use axum_test::TestServer;

/// Config pointing the Dropbox content API at `dropbox_url` (usually a wiremock server).
pub fn create_test_config(dropbox_url: &str) -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    config.dropbox.access_token = Some("test-token".to_string());
    config.dropbox.content_url = dropbox_url.parse().expect("Invalid test Dropbox URL");
    config
}

pub fn create_test_server(config: Config) -> TestServer {
    crate::Application::new(config)
        .expect("Failed to create application")
        .into_test_server()
}
