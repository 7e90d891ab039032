use std::env;
use std::fmt;
use std::time::Duration;

use reqwest::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Distinguishes runtime behavior for different stages of the service.
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
    pub wizard: WizardConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let base_url = env::var("VINCULACION_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let request_timeout =
            optional_secs("VINCULACION_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);

        let poll_secs = optional_secs("VINCULACION_POLL_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if poll_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                variable: "VINCULACION_POLL_INTERVAL_SECS",
            });
        }

        let biometric_fallback_url = env::var("VINCULACION_BIOMETRIC_FALLBACK_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let fetch_readiness_link = flag("VINCULACION_FETCH_READINESS_LINK")?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            api: ApiConfig {
                base_url,
                request_timeout,
            },
            wizard: WizardConfig {
                poll_interval: Duration::from_secs(poll_secs),
                biometric_fallback_url,
                fetch_readiness_link,
            },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
                with_target: environment != AppEnvironment::Production,
            },
        })
    }
}

/// Settings controlling how the backend is reached.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Absolute base URL without a trailing slash.
    pub base_url: String,
    /// `None` leaves requests without a timeout.
    pub request_timeout: Option<Duration>,
}

/// Knobs for the enrollment wizard itself.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub poll_interval: Duration,
    pub biometric_fallback_url: Option<String>,
    pub fetch_readiness_link: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            biometric_fallback_url: None,
            fetch_readiness_link: false,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Colored output, only for interactive development.
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ansi: false,
            with_target: true,
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|_| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn optional_secs(variable: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(variable) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { variable }),
        _ => Ok(None),
    }
}

fn flag(variable: &'static str) -> Result<bool, ConfigError> {
    let Ok(value) = env::var(variable) else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError::InvalidFlag { variable }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidBaseUrl { value: String },
    InvalidNumber { variable: &'static str },
    InvalidFlag { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBaseUrl { value } => write!(
                f,
                "VINCULACION_API_BASE_URL must be an absolute http(s) URL, got '{value}'"
            ),
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a positive whole number of seconds")
            }
            ConfigError::InvalidFlag { variable } => {
                write!(f, "{variable} must be true or false")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
