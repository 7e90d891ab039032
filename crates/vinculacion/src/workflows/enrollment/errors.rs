use super::backend::BackendError;
use super::domain::Step;

/// Local input problems. Display text is the message shown to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Por favor completa todos los campos obligatorios")]
    MissingBasicData,
    #[error("La fecha de expedicion debe tener el formato AAAA-MM-DD")]
    MalformedIssueDate,
    #[error("La fecha de expedicion no puede ser futura")]
    FutureIssueDate,
    #[error("Debes seleccionar departamento y ciudad DANE.")]
    MissingLocation,
    #[error("La ciudad seleccionada no pertenece al departamento.")]
    CityOutsideDepartment,
    #[error("Ingresa un correo electronico valido con dominio, por ejemplo: nombre@dominio.com")]
    InvalidEmail,
    #[error("Debes seleccionar la actividad CIIU principal desde la lista.")]
    MissingEconomicActivity,
    #[error("El campo {0} es obligatorio.")]
    MissingField(&'static str),
    #[error("El campo {0} tiene un valor invalido.")]
    InvalidField(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("document is vetoed after repeated failed biometric attempts: {detail}")]
    VetoedDocument { detail: String },
    #[error("document already belongs to an associate: {message}")]
    DuplicateAssociate { message: String },
    #[error("{message}")]
    Submission { message: String },
    #[error("backend unreachable: {0}")]
    Network(String),
    #[error("enrollment must be submitted before it can be verified")]
    NotSubmitted,
    #[error("there is no active registration")]
    NoActiveRegistration,
    #[error("{action} is not available at step {step}")]
    InvalidTransition { action: &'static str, step: Step },
}

impl WizardError {
    /// Classifies a backend failure; `fallback` is used when the backend gave no detail.
    pub(crate) fn from_backend(error: BackendError, fallback: &str) -> Self {
        match error {
            BackendError::Vetoed { detail } => Self::VetoedDocument { detail },
            BackendError::AlreadyAssociated { message } => Self::DuplicateAssociate { message },
            BackendError::Rejected { message, .. } => Self::Submission {
                message: if message.trim().is_empty() {
                    fallback.to_string()
                } else {
                    message
                },
            },
            BackendError::Transport(detail) | BackendError::Decode(detail) => {
                Self::Network(detail)
            }
        }
    }
}
