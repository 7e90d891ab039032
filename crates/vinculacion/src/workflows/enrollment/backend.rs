use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::assembler::EnrollmentRecord;
use super::domain::{BasicData, BiometricInfo, BiometricStatus, RegistrationId};

/// Response of `POST /preregistro/iniciar/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRegistration {
    pub id: RegistrationId,
    #[serde(default)]
    pub link_biometria: Option<String>,
    #[serde(default)]
    pub url_biometria: Option<String>,
}

impl CreatedRegistration {
    pub fn verification_link(&self) -> Option<String> {
        [&self.link_biometria, &self.url_biometria]
            .into_iter()
            .flatten()
            .map(|link| link.trim())
            .find(|link| !link.is_empty())
            .map(str::to_string)
    }
}

/// Response of `GET /preregistro/{id}/estado-biometria/`.
#[derive(Debug, Clone, Deserialize)]
pub struct BiometricReport {
    pub estado_biometria: String,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub justificacion: Option<String>,
}

impl BiometricReport {
    pub fn status(&self) -> BiometricStatus {
        BiometricStatus::from_wire(&self.estado_biometria)
    }

    pub fn info(&self) -> BiometricInfo {
        BiometricInfo {
            message: self.mensaje.clone().unwrap_or_default(),
            justification: self.justificacion.clone().unwrap_or_default(),
        }
    }
}

/// Body of `POST /vinculacion-agil/`.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentSubmission {
    #[serde(rename = "preregistroId")]
    pub registration_id: RegistrationId,
    #[serde(flatten)]
    pub record: EnrollmentRecord,
}

/// Response of `POST /vinculacion-agil/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub respuesta_linix: Option<Value>,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detalle: Option<String>,
}

/// Response of `POST /preregistro/{id}/verificar-linix/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationResponse {
    #[serde(default)]
    pub completado: bool,
    #[serde(default)]
    pub mensaje: Option<String>,
}

/// Transport-level failure classes the gates care about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("document vetoed: {detail}")]
    Vetoed { detail: String },
    #[error("already an associate: {message}")]
    AlreadyAssociated { message: String },
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid response payload: {0}")]
    Decode(String),
}

/// The five backend operations the wizard relies on.
#[async_trait]
pub trait EnrollmentBackend: Send + Sync {
    async fn create_registration(
        &self,
        basic_data: &BasicData,
    ) -> Result<CreatedRegistration, BackendError>;

    async fn biometric_status(&self, id: &RegistrationId) -> Result<BiometricReport, BackendError>;

    /// Returns `link_linix`.
    async fn readiness_link(&self, id: &RegistrationId) -> Result<String, BackendError>;

    async fn submit_enrollment(
        &self,
        submission: &EnrollmentSubmission,
    ) -> Result<SubmissionResponse, BackendError>;

    async fn verify_enrollment(
        &self,
        id: &RegistrationId,
    ) -> Result<VerificationResponse, BackendError>;
}
