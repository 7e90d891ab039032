use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use super::assembler::EnrollmentRecord;
use super::backend::{EnrollmentBackend, EnrollmentSubmission, SubmissionResponse};
use super::domain::{RegistrationId, SubmissionResult, SubmissionState};
use super::errors::WizardError;
use super::feedback::Notification;

const SUBMISSION_FALLBACK: &str = "Error enviando vinculacion agil.";
const VERIFICATION_PENDING: &str = "Aun no se ha completado el registro en LINIX";
const VERIFICATION_FAILED: &str = "Error al verificar. Por favor intenta nuevamente.";

fn dry_run_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)LINIX_DRY_RUN|modo local|simulada").expect("dry-run pattern compiles")
    })
}

/// Whether a core-system reply describes a simulated submission.
pub fn is_dry_run(reply: &Value) -> bool {
    dry_run_marker().is_match(&reply.to_string())
}

/// Final verification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Completed,
    Pending { message: String },
}

/// Sends the assembled record and confirms it reached the core system.
pub struct SubmissionGate<B> {
    backend: Arc<B>,
}

impl<B> SubmissionGate<B>
where
    B: EnrollmentBackend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn submit(
        &self,
        registration_id: &RegistrationId,
        record: EnrollmentRecord,
    ) -> Result<SubmissionResult, WizardError> {
        let submission = EnrollmentSubmission {
            registration_id: registration_id.clone(),
            record,
        };
        let response = self
            .backend
            .submit_enrollment(&submission)
            .await
            .map_err(|error| {
                warn!(registration_id = %registration_id, error = %error, "enrollment submission failed");
                WizardError::from_backend(error, SUBMISSION_FALLBACK)
            })?;

        let result = interpret_submission(response)?;
        info!(
            registration_id = %registration_id,
            dry_run = result.dry_run,
            reference = %result.reference_number,
            "enrollment submitted"
        );
        Ok(result)
    }

    /// Fails with [`WizardError::NotSubmitted`] before any request when the
    /// enrollment has not been submitted.
    pub async fn verify(
        &self,
        registration_id: &RegistrationId,
        submission: &SubmissionState,
    ) -> Result<Verification, WizardError> {
        if !submission.submitted {
            return Err(WizardError::NotSubmitted);
        }

        let response = self
            .backend
            .verify_enrollment(registration_id)
            .await
            .map_err(|error| {
                warn!(registration_id = %registration_id, error = %error, "verification failed");
                WizardError::Submission {
                    message: VERIFICATION_FAILED.to_string(),
                }
            })?;

        if response.completado {
            info!(registration_id = %registration_id, "enrollment confirmed by core system");
            return Ok(Verification::Completed);
        }
        let message = response
            .mensaje
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| VERIFICATION_PENDING.to_string());
        Ok(Verification::Pending { message })
    }
}

fn interpret_submission(response: SubmissionResponse) -> Result<SubmissionResult, WizardError> {
    if !response.ok {
        let message = [response.detalle, response.error]
            .into_iter()
            .flatten()
            .find(|message| !message.trim().is_empty())
            .unwrap_or_else(|| SUBMISSION_FALLBACK.to_string());
        return Err(WizardError::Submission { message });
    }

    let reply = response.respuesta_linix.unwrap_or(Value::Null);
    let text_field = |key: &str| {
        reply
            .get(key)
            .and_then(|value| match value {
                Value::String(text) => Some(text.clone()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
    };

    Ok(SubmissionResult {
        dry_run: is_dry_run(&reply),
        reference_number: text_field("radicado").unwrap_or_default(),
        message: text_field("message")
            .or(response.mensaje)
            .unwrap_or_default(),
    })
}

/// Notification shown after a successful submission.
pub fn submission_notice(result: &SubmissionResult) -> Notification {
    if result.dry_run {
        Notification::info(
            "Vinculacion agil simulada (DRY_RUN). Ahora desactiva DRY_RUN para validar contra API real.",
        )
    } else {
        Notification::success(
            "Vinculacion agil enviada a LINIX correctamente. Ya puedes verificar el estado final.",
        )
    }
}
