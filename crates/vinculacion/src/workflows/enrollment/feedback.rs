use std::time::Duration;

use serde::Serialize;

use super::errors::WizardError;

/// How long a transient notification stays on screen.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Error,
    Success,
    Info,
}

/// Transient, auto-dismissing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, message)
    }

    fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: translate_backend_message(&message.into()),
        }
    }
}

/// Blocking dialog that needs an explicit acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modal {
    pub title: String,
    pub message: String,
}

impl Modal {
    pub fn vetoed_document() -> Self {
        Self {
            title: "Validacion bloqueada".to_string(),
            message: "Este documento quedo vetado tras dos intentos fallidos. Por favor comunicate con Congente para habilitar un nuevo intento.".to_string(),
        }
    }

    pub fn existing_associate() -> Self {
        Self {
            title: "Asociado existente".to_string(),
            message: "Tu documento ya esta registrado como asociado. Si necesitas ayuda, contacta a un asesor.".to_string(),
        }
    }
}

/// Where an error is shown to the applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    Notification(Notification),
    Modal(Modal),
    Silent,
}

impl From<&WizardError> for Surface {
    fn from(error: &WizardError) -> Self {
        match error {
            WizardError::VetoedDocument { .. } => Surface::Modal(Modal::vetoed_document()),
            WizardError::DuplicateAssociate { .. } => Surface::Modal(Modal::existing_associate()),
            WizardError::Validation(err) => Surface::Notification(Notification::error(err.to_string())),
            WizardError::Submission { message } => {
                Surface::Notification(Notification::error(message.clone()))
            }
            WizardError::Network(_) => Surface::Notification(Notification::error(
                "No fue posible comunicarse con el servidor. Por favor intenta nuevamente.",
            )),
            WizardError::NotSubmitted => Surface::Notification(Notification::error(
                "Primero debes enviar la vinculacion agil en este paso.",
            )),
            WizardError::NoActiveRegistration => Surface::Notification(Notification::error(
                "No existe pre-registro activo para enviar vinculacion agil.",
            )),
            WizardError::InvalidTransition { .. } => Surface::Silent,
        }
    }
}

/// Replaces raw backend phrasing the applicant should not see.
pub fn translate_backend_message(message: &str) -> String {
    if message.contains("already exists") {
        return "Ya es asociado de Congente no puede asociarse nuevamente.".to_string();
    }
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::enrollment::errors::ValidationError;

    #[test]
    fn blocking_errors_open_modals() {
        let vetoed = WizardError::VetoedDocument {
            detail: "vetado".to_string(),
        };
        assert_eq!(Surface::from(&vetoed), Surface::Modal(Modal::vetoed_document()));

        let duplicate = WizardError::DuplicateAssociate {
            message: "ya es asociado".to_string(),
        };
        assert_eq!(
            Surface::from(&duplicate),
            Surface::Modal(Modal::existing_associate())
        );
    }

    #[test]
    fn validation_errors_become_error_notifications() {
        let error = WizardError::from(ValidationError::MissingLocation);
        match Surface::from(&error) {
            Surface::Notification(notification) => {
                assert_eq!(notification.kind, NotificationKind::Error);
                assert_eq!(
                    notification.message,
                    "Debes seleccionar departamento y ciudad DANE."
                );
            }
            other => panic!("expected notification, got {other:?}"),
        }
    }

    #[test]
    fn already_exists_messages_are_translated() {
        let notification = Notification::error("tercero with this codigo already exists.");
        assert_eq!(
            notification.message,
            "Ya es asociado de Congente no puede asociarse nuevamente."
        );
        assert_eq!(Notification::info("listo").message, "listo");
    }
}
