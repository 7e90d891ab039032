use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Wizard stage. Only ever moves forward, one stage at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum Step {
    #[default]
    BasicData,
    BiometricValidation,
    EnrollmentForm,
    Confirmation,
}

impl Step {
    pub fn number(self) -> u8 {
        match self {
            Self::BasicData => 1,
            Self::BiometricValidation => 2,
            Self::EnrollmentForm => 3,
            Self::Confirmation => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::BasicData => "Datos Basicos",
            Self::BiometricValidation => "Validacion",
            Self::EnrollmentForm => "Formulario",
            Self::Confirmation => "Verificacion",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::BasicData => Some(Self::BiometricValidation),
            Self::BiometricValidation => Some(Self::EnrollmentForm),
            Self::EnrollmentForm => Some(Self::Confirmation),
            Self::Confirmation => None,
        }
    }

    /// Returns `target` when it is the immediate successor, otherwise stays put.
    pub fn advance_to(self, target: Step) -> Step {
        if self.next() == Some(target) {
            target
        } else {
            self
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Confirmation
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

/// Backend-issued identifier of one enrollment attempt.
///
/// The backend emits integers; strings are accepted too so the id stays opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RegistrationId(pub String);

impl RegistrationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RegistrationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(number) => Ok(Self(number.to_string())),
            serde_json::Value::String(text) if !text.trim().is_empty() => {
                Ok(Self(text.trim().to_string()))
            }
            other => Err(serde::de::Error::custom(format!(
                "expected a registration id, got {other}"
            ))),
        }
    }
}

/// Stage-1 identity data, serialized with the backend's field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicData {
    #[serde(rename = "nombres_completos")]
    pub full_name: String,
    #[serde(rename = "numero_cedula")]
    pub document_number: String,
    /// Catalog code of the document type (`1`..`9`).
    #[serde(rename = "tipo_documento")]
    pub document_type: String,
    /// `YYYY-MM-DD`.
    #[serde(rename = "fecha_expedicion")]
    pub issue_date: String,
    #[serde(rename = "agencia")]
    pub branch: String,
}

/// Editable stage-1 fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicField {
    FullName,
    DocumentNumber,
    DocumentType,
    IssueDate,
    Branch,
}

impl BasicData {
    pub fn with_field(mut self, field: BasicField, value: &str) -> Self {
        match field {
            BasicField::FullName => self.full_name = value.to_uppercase(),
            BasicField::DocumentNumber => self.document_number = value.to_string(),
            BasicField::DocumentType => self.document_type = value.to_string(),
            BasicField::IssueDate => self.issue_date = value.to_string(),
            BasicField::Branch => self.branch = value.to_string(),
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiometricStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl BiometricStatus {
    /// Maps the backend's `estado_biometria`. `EN_PROCESO` and unknown codes stay pending.
    pub fn from_wire(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "APROBADO" => Self::Approved,
            "RECHAZADO" => Self::Rejected,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "PENDIENTE",
            Self::Approved => "APROBADO",
            Self::Rejected => "RECHAZADO",
        }
    }
}

/// Human-readable detail replaced on every successful poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BiometricInfo {
    pub message: String,
    pub justification: String,
}

impl BiometricInfo {
    /// Justification trimmed to 90 characters for compact display.
    pub fn justification_summary(&self) -> String {
        let trimmed = self.justification.trim();
        if trimmed.chars().count() <= 90 {
            return trimmed.to_string();
        }
        let head: String = trimmed.chars().take(90).collect();
        format!("{head}...")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub basic_data: BasicData,
    pub biometric_status: BiometricStatus,
    pub biometric_link: Option<String>,
    pub biometric_info: BiometricInfo,
}

impl Registration {
    pub fn new(id: RegistrationId, basic_data: BasicData, biometric_link: Option<String>) -> Self {
        Self {
            id,
            basic_data,
            biometric_status: BiometricStatus::Pending,
            biometric_link,
            biometric_info: BiometricInfo::default(),
        }
    }

    /// Applies a poll result. Terminal statuses are final for this registration.
    pub fn record_status(mut self, status: BiometricStatus, info: BiometricInfo) -> Self {
        if self.biometric_status.is_terminal() {
            return self;
        }
        self.biometric_status = status;
        self.biometric_info = info;
        self
    }
}

/// Outcome of a successful enrollment submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub dry_run: bool,
    pub reference_number: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionState {
    pub submitted: bool,
    pub verified: bool,
    pub dry_run: bool,
    pub reference_number: String,
    pub message: String,
}

impl SubmissionState {
    pub fn record_submission(result: &SubmissionResult) -> Self {
        Self {
            submitted: true,
            verified: false,
            dry_run: result.dry_run,
            reference_number: result.reference_number.clone(),
            message: result.message.clone(),
        }
    }

    /// No-op unless the enrollment was submitted first.
    pub fn mark_verified(mut self) -> Self {
        if self.submitted {
            self.verified = true;
        }
        self
    }
}
