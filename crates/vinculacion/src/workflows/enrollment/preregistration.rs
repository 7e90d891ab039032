use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::backend::EnrollmentBackend;
use super::domain::{BasicData, Registration};
use super::errors::{ValidationError, WizardError};

/// Validates stage-1 data and creates the registration on the backend.
pub struct PreRegistrationGate<B> {
    backend: Arc<B>,
    fallback_url: Option<String>,
}

impl<B> PreRegistrationGate<B>
where
    B: EnrollmentBackend + 'static,
{
    pub fn new(backend: Arc<B>, fallback_url: Option<String>) -> Self {
        Self {
            backend,
            fallback_url,
        }
    }

    /// Local checks only; nothing is sent when this fails.
    pub fn validate(basic: &BasicData, today: NaiveDate) -> Result<(), ValidationError> {
        let fields = [
            &basic.full_name,
            &basic.document_number,
            &basic.document_type,
            &basic.issue_date,
            &basic.branch,
        ];
        if fields.iter().any(|value| value.trim().is_empty()) {
            return Err(ValidationError::MissingBasicData);
        }

        let issued = NaiveDate::parse_from_str(basic.issue_date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::MalformedIssueDate)?;
        if issued > today {
            return Err(ValidationError::FutureIssueDate);
        }
        Ok(())
    }

    pub async fn submit(
        &self,
        basic: &BasicData,
        today: NaiveDate,
    ) -> Result<Registration, WizardError> {
        Self::validate(basic, today)?;

        let created = self
            .backend
            .create_registration(basic)
            .await
            .map_err(|error| {
                warn!(error = %error, "pre-registration rejected");
                WizardError::from_backend(error, "Error al crear el pre-registro.")
            })?;

        let link = created
            .verification_link()
            .or_else(|| self.fallback_url.clone());
        info!(
            registration_id = %created.id,
            has_link = link.is_some(),
            "pre-registration created"
        );
        Ok(Registration::new(created.id, basic.clone(), link))
    }
}
