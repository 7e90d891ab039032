//! reqwest implementation of [`EnrollmentBackend`] for the enrollment API.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::backend::{
    BackendError, BiometricReport, CreatedRegistration, EnrollmentBackend, EnrollmentSubmission,
    SubmissionResponse, VerificationResponse,
};
use super::domain::{BasicData, RegistrationId};
use crate::config::ApiConfig;

const VETO_CODE: &str = "VETADO";
const ASSOCIATE_MARKER: &str = "ya es asociado";

/// Structured error body returned by the enrollment API.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    codigo: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detalle: Option<String>,
    #[serde(default)]
    detalles: Option<Value>,
}

impl ErrorBody {
    /// First field-level message for the document number, if the backend sent one.
    fn document_detail(&self) -> Option<String> {
        self.detalles
            .as_ref()?
            .get("numero_cedula")?
            .get(0)?
            .as_str()
            .map(str::to_string)
    }

    fn first_message(candidates: impl IntoIterator<Item = Option<String>>) -> String {
        candidates
            .into_iter()
            .flatten()
            .find(|message| !message.trim().is_empty())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ReadinessLink {
    link_linix: String,
}

/// HTTP client for the enrollment backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        request
            .send()
            .await
            .map_err(|err| BackendError::Transport(format!("{}: {err}", self.base_url)))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        response
            .json::<T>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn error_body(response: Response) -> (StatusCode, ErrorBody) {
        let status = response.status();
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        (status, body)
    }

    async fn rejected(response: Response) -> BackendError {
        let (status, body) = Self::error_body(response).await;
        BackendError::Rejected {
            status: status.as_u16(),
            message: ErrorBody::first_message([body.error, body.detalle]),
        }
    }
}

#[async_trait]
impl EnrollmentBackend for HttpBackend {
    async fn create_registration(
        &self,
        basic_data: &BasicData,
    ) -> Result<CreatedRegistration, BackendError> {
        let request = self
            .request(Method::POST, "/preregistro/iniciar/")
            .json(basic_data);
        let response = self.send(request).await?;
        if response.status().is_success() {
            return Self::json(response).await;
        }

        let (status, body) = Self::error_body(response).await;
        debug!(status = status.as_u16(), codigo = ?body.codigo, "pre-registration refused");
        if status == StatusCode::FORBIDDEN && body.codigo.as_deref() == Some(VETO_CODE) {
            return Err(BackendError::Vetoed {
                detail: ErrorBody::first_message([body.detalle, body.error]),
            });
        }
        let error = body.error.clone().unwrap_or_default();
        if error.to_lowercase().contains(ASSOCIATE_MARKER) {
            return Err(BackendError::AlreadyAssociated { message: error });
        }
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message: ErrorBody::first_message([body.document_detail(), body.error, body.detalle]),
        })
    }

    async fn biometric_status(&self, id: &RegistrationId) -> Result<BiometricReport, BackendError> {
        let path = format!("/preregistro/{id}/estado-biometria/");
        let response = self.send(self.request(Method::GET, &path)).await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Self::json(response).await
    }

    async fn readiness_link(&self, id: &RegistrationId) -> Result<String, BackendError> {
        let path = format!("/preregistro/{id}/link-linix/");
        let response = self.send(self.request(Method::GET, &path)).await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        let body: ReadinessLink = Self::json(response).await?;
        Ok(body.link_linix)
    }

    /// Non-2xx replies that still carry the usual body are returned with
    /// `ok = false` so the caller can read `detalle` and `error`.
    async fn submit_enrollment(
        &self,
        submission: &EnrollmentSubmission,
    ) -> Result<SubmissionResponse, BackendError> {
        let request = self.request(Method::POST, "/vinculacion-agil/").json(submission);
        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            return Self::json(response).await;
        }
        match response.json::<SubmissionResponse>().await {
            Ok(body) => Ok(SubmissionResponse { ok: false, ..body }),
            Err(_) => Err(BackendError::Rejected {
                status: status.as_u16(),
                message: String::new(),
            }),
        }
    }

    /// Any reply with a readable body is interpreted; a 404 reports "not yet".
    async fn verify_enrollment(
        &self,
        id: &RegistrationId,
    ) -> Result<VerificationResponse, BackendError> {
        let path = format!("/preregistro/{id}/verificar-linix/");
        let response = self.send(self.request(Method::POST, &path)).await?;
        let status = response.status();
        match response.json::<VerificationResponse>().await {
            Ok(body) => Ok(body),
            Err(err) if status.is_success() => Err(BackendError::Decode(err.to_string())),
            Err(_) => Err(BackendError::Rejected {
                status: status.as_u16(),
                message: String::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_skips_blank_candidates() {
        let message = ErrorBody::first_message([
            None,
            Some("  ".to_string()),
            Some("vetado".to_string()),
        ]);
        assert_eq!(message, "vetado");
        assert_eq!(ErrorBody::first_message([Some("uno".to_string())]), "uno");
        assert_eq!(ErrorBody::first_message(Vec::<Option<String>>::new()), "");
    }

    #[test]
    fn document_detail_reads_first_field_error() {
        let body: ErrorBody = serde_json::from_value(serde_json::json!({
            "error": "Datos invalidos",
            "detalles": { "numero_cedula": ["La cedula debe ser numerica", "otra"] }
        }))
        .expect("decodes");
        assert_eq!(
            body.document_detail().as_deref(),
            Some("La cedula debe ser numerica")
        );
    }
}
