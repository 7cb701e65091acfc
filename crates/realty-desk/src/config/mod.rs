use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let base_url = ApiConfig::normalize_base_url(
            &env::var("REALTY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        )?;

        let connect_timeout = env::var("REALTY_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let session_path = env::var("REALTY_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_PATH));

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            api: ApiConfig {
                base_url,
                connect_timeout: (connect_timeout > 0).then(|| Duration::from_secs(connect_timeout)),
            },
            session: SessionConfig { path: session_path },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1";
const DEFAULT_SESSION_PATH: &str = ".realty-session.json";

/// Backend location and transport settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout: Option<Duration>,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Self::normalize_base_url(base_url)?,
            connect_timeout: None,
        })
    }

    /// Strips trailing slashes so paths can be appended verbatim.
    pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl {
                value: raw.to_string(),
            });
        }
        Ok(trimmed.to_string())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Where the persisted session lives between runs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub path: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout,
    InvalidBaseUrl { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout => {
                write!(f, "REALTY_CONNECT_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidBaseUrl { value } => {
                write!(f, "REALTY_API_URL must be an http(s) URL, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
