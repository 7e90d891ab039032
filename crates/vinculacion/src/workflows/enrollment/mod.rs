//! Four-stage digital enrollment: basic data, biometric validation, the
//! enrollment form and final confirmation against the core system.
//!
//! [`EnrollmentWizard`] owns the flow. Gates talk to the backend through
//! [`EnrollmentBackend`]; every visible change goes through [`WizardStore`].

pub mod assembler;
pub mod backend;
pub mod client;
pub mod domain;
mod errors;
pub mod feedback;
pub mod identity;
mod poller;
mod preregistration;
pub mod store;
mod submission;
mod wizard;

#[cfg(test)]
mod tests;

pub use assembler::{
    build_record, normalize_salary, EnrollmentForm, EnrollmentRecord, FormField, UnknownFormField,
};
pub use backend::{
    BackendError, BiometricReport, CreatedRegistration, EnrollmentBackend, EnrollmentSubmission,
    SubmissionResponse, VerificationResponse,
};
pub use client::HttpBackend;
pub use domain::{
    BasicData, BasicField, BiometricInfo, BiometricStatus, Registration, RegistrationId, Step,
    SubmissionResult, SubmissionState,
};
pub use errors::{ValidationError, WizardError};
pub use feedback::{Modal, Notification, NotificationKind, Surface};
pub use identity::{map_document_type, split_full_name, NameParts};
pub use poller::{BiometricPoller, PollHandle};
pub use preregistration::PreRegistrationGate;
pub use store::{WizardEvent, WizardState, WizardStore};
pub use submission::{is_dry_run, submission_notice, SubmissionGate, Verification};
pub use wizard::{EnrollmentWizard, LoggingLauncher, VerificationLauncher};
