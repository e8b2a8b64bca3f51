//! Application configuration management.
//!
//! Configuration is loaded from an optional YAML file with environment variable overrides. The
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `DBRELAY_CONFIG`
//! environment variable. A missing file is not an error, so a serverless-style deployment can be
//! configured entirely from the environment.
//!
//! ## Loading Priority
//!
//! Sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `DBRELAY_` override YAML values
//! 3. **DROPBOX_ACCESS_TOKEN / DROPBOX_FOLDER** - Special cases: override `dropbox.access_token`
//!    and `dropbox.default_folder` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `DBRELAY_DROPBOX__CONTENT_URL=http://localhost:9000` sets the `dropbox.content_url` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! DBRELAY_PORT=8080
//!
//! # Upstream credentials (same names the hosted function used)
//! DROPBOX_ACCESS_TOKEN="sl.B..."
//! DROPBOX_FOLDER="/inbox"
//!
//! # Bound the size of fetched source files
//! DBRELAY_LIMITS__MAX_SOURCE_BYTES=52428800
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "DBRELAY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// Upstream Dropbox settings
    pub dropbox: DropboxConfig,
    /// Cross-origin headers attached to every response
    pub cors: CorsConfig,
    /// Optional payload size limits. Unlimited by default.
    pub limits: LimitsConfig,
}

/// Dropbox content API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DropboxConfig {
    /// Bearer token for the content API. Requests fail with a 500 while it is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Folder used when a request does not name one
    pub default_folder: Option<String>,
    /// Base URL of the content API
    pub content_url: Url,
}

// Keeps the token out of `Debug` output, which is logged at startup.
impl std::fmt::Debug for DropboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("default_folder", &self.default_folder)
            .field("content_url", &self.content_url.as_str())
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`
    pub allow_origin: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum inbound request body in bytes. `None` disables the limit.
    pub max_request_body: Option<usize>,
    /// Maximum size of a file fetched from `url`. `None` disables the limit.
    pub max_source_bytes: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_otel_export: false,
            dropbox: DropboxConfig::default(),
            cors: CorsConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            default_folder: None,
            content_url: Url::parse("https://content.dropboxapi.com").expect("static URL is valid"),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
        }
    }
}

impl DropboxConfig {
    /// The access token, treating an empty value as unset
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        if self.cors.allow_origin.trim().is_empty() {
            return Err(Error::ServerMisconfigured {
                message: "Config validation: cors.allow_origin cannot be empty. Use '*' to allow any origin.".to_string(),
            });
        }

        if self.dropbox.content_url.cannot_be_a_base() {
            return Err(Error::ServerMisconfigured {
                message: format!(
                    "Config validation: dropbox.content_url '{}' is not a usable base URL",
                    self.dropbox.content_url
                ),
            });
        }

        if self.limits.max_request_body == Some(0) || self.limits.max_source_bytes == Some(0) {
            return Err(Error::ServerMisconfigured {
                message: "Config validation: limits must be greater than zero. Remove the field to disable a limit.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables override specific values. DBRELAY_CONFIG is the file path.
            .merge(Env::prefixed("DBRELAY_").ignore(&["config"]).split("__"))
            // Variable names carried over from the hosted function
            .merge(
                Env::raw()
                    .only(&["DROPBOX_ACCESS_TOKEN"])
                    .map(|_| "dropbox.access_token".into()),
            )
            .merge(
                Env::raw()
                    .only(&["DROPBOX_FOLDER"])
                    .map(|_| "dropbox.default_folder".into()),
            )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
