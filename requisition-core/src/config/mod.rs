use crate::error::AppError;
use secrecy::Secret;
use serde::Deserialize;

/// Runtime settings for the dashboard crates.
///
/// Loaded from an optional `configuration.yaml` in the working directory,
/// overridden by `APP_`-prefixed environment variables
/// (e.g. `APP_BACKEND__URL=https://api.example.com`).
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    /// Base URL of the requisition/report REST API.
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Browser-accessible URL for links shown to users (may differ from the
    /// internal `url` behind a gateway).
    #[serde(default = "default_backend_url")]
    pub public_url: String,
    /// Per-request timeout applied to the HTTP client.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Optional machine token for non-interactive calls. Interactive flows
    /// pass the authenticated user's bearer token per call instead.
    #[serde(default)]
    pub service_token: Option<Secret<String>>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            public_url: default_backend_url(),
            timeout_seconds: default_timeout_seconds(),
            service_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    dotenvy::dotenv().ok();

    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<Settings>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.backend.url, "http://localhost:8080");
        assert_eq!(settings.backend.timeout_seconds, 30);
        assert!(settings.backend.service_token.is_none());
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn backend_url_is_overridable() {
        let settings: Settings =
            serde_json::from_str(r#"{"backend":{"url":"https://api.internal"}}"#).unwrap();
        assert_eq!(settings.backend.url, "https://api.internal");
        // public_url keeps its own default when not set
        assert_eq!(settings.backend.public_url, "http://localhost:8080");
    }
}
