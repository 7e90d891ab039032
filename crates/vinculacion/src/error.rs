use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::enrollment::{BackendError, Step, WizardError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Catalog(CatalogError),
    Json(serde_json::Error),
    Wizard(WizardError),
    Backend(BackendError),
    /// The wizard stopped before confirmation without an operation failing.
    Incomplete { step: Step, reason: String },
}

impl AppError {
    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Telemetry(_) => 78,
            AppError::Io(_) | AppError::Catalog(_) | AppError::Json(_) => 66,
            AppError::Backend(_) => 69,
            AppError::Wizard(_) | AppError::Incomplete { .. } => 1,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Catalog(err) => write!(f, "catalog error: {}", err),
            AppError::Json(err) => write!(f, "invalid json: {}", err),
            AppError::Wizard(err) => write!(f, "enrollment error: {}", err),
            AppError::Backend(err) => write!(f, "backend error: {}", err),
            AppError::Incomplete { step, reason } => {
                write!(f, "enrollment stopped at {}: {}", step, reason)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Wizard(err) => Some(err),
            AppError::Backend(err) => Some(err),
            AppError::Incomplete { .. } => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<WizardError> for AppError {
    fn from(value: WizardError) -> Self {
        Self::Wizard(value)
    }
}

impl From<BackendError> for AppError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::enrollment::ValidationError;

    #[test]
    fn exit_codes_follow_sysexits() {
        let config = AppError::from(ConfigError::InvalidNumber {
            variable: "VINCULACION_POLL_INTERVAL_SECS",
        });
        assert_eq!(config.exit_code(), 78);

        let backend = AppError::from(BackendError::Transport("refused".to_string()));
        assert_eq!(backend.exit_code(), 69);

        let wizard = AppError::from(WizardError::from(ValidationError::MissingLocation));
        assert_eq!(wizard.exit_code(), 1);
        assert!(std::error::Error::source(&wizard).is_some());
    }

    #[test]
    fn incomplete_names_the_step() {
        let error = AppError::Incomplete {
            step: Step::BiometricValidation,
            reason: "validacion rechazada".to_string(),
        };
        assert!(error.to_string().contains("validacion rechazada"));
        assert_eq!(error.exit_code(), 1);
    }
}
