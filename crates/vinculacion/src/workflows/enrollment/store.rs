use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::assembler::{EnrollmentForm, FormField};
use super::domain::{
    BasicData, BasicField, BiometricInfo, BiometricStatus, Registration, RegistrationId, Step,
    SubmissionResult, SubmissionState,
};
use super::errors::WizardError;
use super::feedback::{Modal, Notification, Surface, NOTIFICATION_TTL};

/// Everything the wizard shows, as one immutable snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WizardState {
    pub step: Step,
    pub basic_data: BasicData,
    pub registration: Option<Registration>,
    pub form: EnrollmentForm,
    pub submission: SubmissionState,
    pub notification: Option<Notification>,
    pub modal: Option<Modal>,
    pub verification_url: Option<String>,
    /// Set once the backend vetoes the document. No new registration is
    /// accepted afterwards.
    pub vetoed: bool,
    /// Bumped on every notification so a timer only dismisses its own.
    pub notification_seq: u64,
}

/// State transitions. Each one is applied by [`WizardState::reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    BasicDataEdited { field: BasicField, value: String },
    RegistrationStarted(Registration),
    DocumentVetoed,
    BiometricReported {
        registration_id: RegistrationId,
        status: BiometricStatus,
        info: BiometricInfo,
    },
    EnrollmentUnlocked { registration_id: RegistrationId },
    EnrollmentFieldEdited { field: FormField, value: String },
    EnrollmentSubmitted(SubmissionResult),
    EnrollmentVerified,
    Notified(Notification),
    NotificationDismissed,
    ModalOpened(Modal),
    ModalClosed,
}

impl WizardState {
    pub fn registration_id(&self) -> Option<&RegistrationId> {
        self.registration.as_ref().map(|registration| &registration.id)
    }

    pub fn biometric_status(&self) -> Option<BiometricStatus> {
        self.registration
            .as_ref()
            .map(|registration| registration.biometric_status)
    }

    fn is_current(&self, id: &RegistrationId) -> bool {
        self.registration_id() == Some(id)
    }

    pub fn reduce(self, event: WizardEvent) -> WizardState {
        match event {
            WizardEvent::BasicDataEdited { field, value } => {
                let basic_data = self.basic_data.with_field(field, &value);
                let form = self.form.apply_defaults(&basic_data);
                WizardState {
                    basic_data,
                    form,
                    ..self
                }
            }
            WizardEvent::RegistrationStarted(registration) => {
                if self.vetoed || self.step > Step::BiometricValidation {
                    return self;
                }
                let verification_url = registration.biometric_link.clone();
                WizardState {
                    step: self.step.advance_to(Step::BiometricValidation),
                    registration: Some(registration),
                    submission: SubmissionState::default(),
                    modal: None,
                    verification_url,
                    ..self
                }
            }
            WizardEvent::DocumentVetoed => WizardState {
                registration: None,
                verification_url: None,
                vetoed: true,
                ..self
            },
            WizardEvent::BiometricReported {
                registration_id,
                status,
                info,
            } => {
                if !self.is_current(&registration_id) {
                    return self;
                }
                let registration = self
                    .registration
                    .map(|registration| registration.record_status(status, info));
                WizardState {
                    registration,
                    ..self
                }
            }
            WizardEvent::EnrollmentUnlocked { registration_id } => {
                let approved = self.biometric_status() == Some(BiometricStatus::Approved);
                if !self.is_current(&registration_id)
                    || !approved
                    || self.step != Step::BiometricValidation
                {
                    return self;
                }
                WizardState {
                    step: Step::EnrollmentForm,
                    submission: SubmissionState::default(),
                    ..self
                }
            }
            WizardEvent::EnrollmentFieldEdited { field, value } => WizardState {
                form: self.form.edit(field, &value),
                ..self
            },
            WizardEvent::EnrollmentSubmitted(result) => {
                if self.step != Step::EnrollmentForm {
                    return self;
                }
                WizardState {
                    submission: SubmissionState::record_submission(&result),
                    ..self
                }
            }
            WizardEvent::EnrollmentVerified => {
                if !self.submission.submitted || self.step != Step::EnrollmentForm {
                    return self;
                }
                WizardState {
                    step: Step::Confirmation,
                    submission: self.submission.mark_verified(),
                    ..self
                }
            }
            WizardEvent::Notified(notification) => WizardState {
                notification: Some(notification),
                notification_seq: self.notification_seq + 1,
                ..self
            },
            WizardEvent::NotificationDismissed => WizardState {
                notification: None,
                ..self
            },
            WizardEvent::ModalOpened(modal) => WizardState {
                modal: Some(modal),
                ..self
            },
            WizardEvent::ModalClosed => WizardState {
                modal: None,
                ..self
            },
        }
    }
}

/// Shared handle to the current [`WizardState`]. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct WizardStore {
    sender: Arc<watch::Sender<WizardState>>,
}

impl Default for WizardStore {
    fn default() -> Self {
        Self::new(WizardState::default())
    }
}

impl WizardStore {
    pub fn new(initial: WizardState) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Applies `event` and returns the resulting snapshot.
    pub fn dispatch(&self, event: WizardEvent) -> WizardState {
        self.sender.send_modify(|state| {
            let current = std::mem::take(state);
            *state = current.reduce(event);
        });
        self.snapshot()
    }

    /// Shows a transient notification and schedules its dismissal when a
    /// runtime is available.
    pub fn notify(&self, notification: Notification) -> WizardState {
        let state = self.dispatch(WizardEvent::Notified(notification));
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let store = self.clone();
            let seq = state.notification_seq;
            runtime.spawn(async move {
                tokio::time::sleep(NOTIFICATION_TTL).await;
                if store.snapshot().notification_seq == seq {
                    store.dispatch(WizardEvent::NotificationDismissed);
                }
            });
        }
        state
    }

    /// Shows `error` on its surface. Returns the resulting snapshot.
    pub fn present_error(&self, error: &WizardError) -> WizardState {
        match Surface::from(error) {
            Surface::Notification(notification) => self.notify(notification),
            Surface::Modal(modal) => self.dispatch(WizardEvent::ModalOpened(modal)),
            Surface::Silent => self.snapshot(),
        }
    }

    pub fn snapshot(&self) -> WizardState {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WizardState> {
        self.sender.subscribe()
    }
}
