use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tracing::{info, warn};

use super::assembler::{build_record, FormField};
use super::backend::EnrollmentBackend;
use super::domain::{BasicField, BiometricStatus, RegistrationId, Step, SubmissionResult};
use super::errors::WizardError;
use super::feedback::Notification;
use super::poller::{unlock_enrollment, BiometricPoller, PollHandle};
use super::preregistration::PreRegistrationGate;
use super::store::{WizardEvent, WizardState, WizardStore};
use super::submission::{submission_notice, SubmissionGate, Verification};
use crate::catalog::Catalog;
use crate::config::WizardConfig;

/// Opens the biometric provider's verification flow for the applicant.
pub trait VerificationLauncher: Send + Sync {
    fn open(&self, url: &str);
}

/// Launcher that only records the link.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingLauncher;

impl VerificationLauncher for LoggingLauncher {
    fn open(&self, url: &str) {
        info!(url = %url, "biometric verification link ready");
    }
}

/// Drives one applicant through the four enrollment stages.
///
/// Every operation reports its error through the store as well as returning
/// it, so presenters only need to watch [`WizardState`].
pub struct EnrollmentWizard<B> {
    catalog: Arc<dyn Catalog>,
    config: WizardConfig,
    store: WizardStore,
    backend: Arc<B>,
    preregistration: PreRegistrationGate<B>,
    poller: BiometricPoller<B>,
    submission: SubmissionGate<B>,
    poll: Mutex<Option<PollHandle>>,
    launcher: Arc<dyn VerificationLauncher>,
}

impl<B> EnrollmentWizard<B>
where
    B: EnrollmentBackend + 'static,
{
    pub fn new(backend: Arc<B>, catalog: Arc<dyn Catalog>, config: WizardConfig) -> Self {
        let store = WizardStore::default();
        Self {
            preregistration: PreRegistrationGate::new(
                Arc::clone(&backend),
                config.biometric_fallback_url.clone(),
            ),
            poller: BiometricPoller::new(
                Arc::clone(&backend),
                store.clone(),
                config.poll_interval,
                config.fetch_readiness_link,
            ),
            submission: SubmissionGate::new(Arc::clone(&backend)),
            backend,
            catalog,
            config,
            store,
            poll: Mutex::new(None),
            launcher: Arc::new(LoggingLauncher),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn VerificationLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn store(&self) -> &WizardStore {
        &self.store
    }

    pub fn snapshot(&self) -> WizardState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<WizardState> {
        self.store.subscribe()
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn edit_basic_data(&self, field: BasicField, value: &str) -> WizardState {
        self.store.dispatch(WizardEvent::BasicDataEdited {
            field,
            value: value.to_string(),
        })
    }

    /// Creates a registration from the current basic data and starts polling.
    ///
    /// Allowed at stage 1 and 2 unless the document was vetoed. The running
    /// poll loop keeps watching the current registration until the backend
    /// has created its replacement; a veto discards it.
    pub async fn submit_basic_data(&self) -> Result<RegistrationId, WizardError> {
        let state = self.store.snapshot();
        if state.vetoed || state.step > Step::BiometricValidation {
            return self.fail(WizardError::InvalidTransition {
                action: "submit_basic_data",
                step: state.step,
            });
        }
        if let Err(error) = PreRegistrationGate::<B>::validate(&state.basic_data, today()) {
            return self.fail(error.into());
        }

        let registration = match self
            .preregistration
            .submit(&state.basic_data, today())
            .await
        {
            Ok(registration) => registration,
            Err(error @ WizardError::VetoedDocument { .. }) => {
                self.cancel_polling();
                self.store.dispatch(WizardEvent::DocumentVetoed);
                return self.fail(error);
            }
            Err(error) => return self.fail(error),
        };

        self.cancel_polling();
        let registration_id = registration.id.clone();
        let link = registration.biometric_link.clone();
        let updated = self
            .store
            .dispatch(WizardEvent::RegistrationStarted(registration));
        if updated.registration_id() != Some(&registration_id) {
            warn!(
                registration_id = %registration_id,
                step = %updated.step,
                "registration created after the wizard moved on, ignoring it"
            );
            return self.fail(WizardError::InvalidTransition {
                action: "submit_basic_data",
                step: updated.step,
            });
        }
        info!(registration_id = %registration_id, step = %updated.step, "biometric validation started");

        if let Some(url) = link.as_deref() {
            self.launcher.open(url);
        }

        let handle = self.poller.start(registration_id.clone());
        *self.poll.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(registration_id)
    }

    /// Creates a fresh registration after a rejected biometric check.
    pub async fn retry_validation(&self) -> Result<RegistrationId, WizardError> {
        let state = self.store.snapshot();
        if state.vetoed
            || state.step != Step::BiometricValidation
            || state.biometric_status() != Some(BiometricStatus::Rejected)
        {
            return self.fail(WizardError::InvalidTransition {
                action: "retry_validation",
                step: state.step,
            });
        }
        info!(
            previous = ?state.registration_id().map(RegistrationId::as_str),
            "retrying biometric validation"
        );
        self.submit_basic_data().await
    }

    /// Retries the stage-3 unlock for an approved registration still at stage 2.
    pub async fn resume_enrollment(&self) -> Result<bool, WizardError> {
        let state = self.store.snapshot();
        let registration_id = match state.registration_id() {
            Some(id) if state.step == Step::BiometricValidation => id.clone(),
            _ => {
                return self.fail(WizardError::InvalidTransition {
                    action: "resume_enrollment",
                    step: state.step,
                })
            }
        };
        if state.biometric_status() != Some(BiometricStatus::Approved) {
            return self.fail(WizardError::InvalidTransition {
                action: "resume_enrollment",
                step: state.step,
            });
        }
        Ok(unlock_enrollment(
            self.backend.as_ref(),
            &self.store,
            &registration_id,
            self.config.fetch_readiness_link,
        )
        .await)
    }

    pub fn edit_enrollment_field(&self, field: FormField, value: &str) -> WizardState {
        self.store.dispatch(WizardEvent::EnrollmentFieldEdited {
            field,
            value: value.to_string(),
        })
    }

    /// Validates the stage-3 form and sends it. Re-running it resubmits.
    pub async fn submit_enrollment(&self) -> Result<SubmissionResult, WizardError> {
        let state = self.store.snapshot();
        let Some(registration_id) = state.registration_id().cloned() else {
            return self.fail(WizardError::NoActiveRegistration);
        };
        if state.step != Step::EnrollmentForm {
            return self.fail(WizardError::InvalidTransition {
                action: "submit_enrollment",
                step: state.step,
            });
        }

        let record = match build_record(
            &state.form,
            &state.basic_data,
            self.catalog.as_ref(),
            today(),
        ) {
            Ok(record) => record,
            Err(error) => {
                warn!(registration_id = %registration_id, error = %error, "enrollment form invalid");
                return self.fail(error.into());
            }
        };

        match self.submission.submit(&registration_id, record).await {
            Ok(result) => {
                self.store
                    .dispatch(WizardEvent::EnrollmentSubmitted(result.clone()));
                self.store.notify(submission_notice(&result));
                Ok(result)
            }
            Err(error) => self.fail(error),
        }
    }

    /// Asks the core system whether the enrollment is complete.
    ///
    /// Returns `Ok(false)` when it is still pending; the wizard stays at stage 3.
    pub async fn verify_enrollment(&self) -> Result<bool, WizardError> {
        let state = self.store.snapshot();
        let outcome = match state.registration_id() {
            Some(id) => self.submission.verify(id, &state.submission).await,
            None => Err(WizardError::NotSubmitted),
        };

        match outcome {
            Ok(Verification::Completed) => {
                let updated = self.store.dispatch(WizardEvent::EnrollmentVerified);
                info!(step = %updated.step, "enrollment completed");
                Ok(true)
            }
            Ok(Verification::Pending { message }) => {
                self.store.notify(Notification::error(message));
                Ok(false)
            }
            Err(error) => self.fail(error),
        }
    }

    /// Stops the active poll loop, if any.
    pub fn cancel_polling(&self) {
        let handle = self
            .poll
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            info!(registration_id = %handle.registration_id(), "biometric polling cancelled");
            handle.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn dismiss_notification(&self) -> WizardState {
        self.store.dispatch(WizardEvent::NotificationDismissed)
    }

    pub fn close_modal(&self) -> WizardState {
        self.store.dispatch(WizardEvent::ModalClosed)
    }

    fn fail<T>(&self, error: WizardError) -> Result<T, WizardError> {
        self.store.present_error(&error);
        Err(error)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
