use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::backend::EnrollmentBackend;
use super::domain::{BiometricStatus, RegistrationId, Step};
use super::errors::WizardError;
use super::store::{WizardEvent, WizardStore};

/// Spawns the status loop for one registration at a time.
pub struct BiometricPoller<B> {
    backend: Arc<B>,
    store: WizardStore,
    period: Duration,
    fetch_readiness_link: bool,
}

impl<B> BiometricPoller<B>
where
    B: EnrollmentBackend + 'static,
{
    pub fn new(
        backend: Arc<B>,
        store: WizardStore,
        period: Duration,
        fetch_readiness_link: bool,
    ) -> Self {
        Self {
            backend,
            store,
            period,
            fetch_readiness_link,
        }
    }

    /// Checks immediately, then once per period until a terminal status.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, registration_id: RegistrationId) -> PollHandle {
        let task = tokio::spawn(poll_until_terminal(
            Arc::clone(&self.backend),
            self.store.clone(),
            registration_id.clone(),
            self.period,
            self.fetch_readiness_link,
        ));
        PollHandle {
            registration_id,
            task,
        }
    }
}

/// Owner of a running poll loop. Dropping the handle stops the loop.
#[derive(Debug)]
pub struct PollHandle {
    registration_id: RegistrationId,
    task: JoinHandle<Option<BiometricStatus>>,
}

impl PollHandle {
    pub fn registration_id(&self) -> &RegistrationId {
        &self.registration_id
    }

    /// Stops the loop. No status request is issued after this returns.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to end. `None` when it was cancelled or superseded.
    pub async fn join(mut self) -> Option<BiometricStatus> {
        (&mut self.task).await.ok().flatten()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_until_terminal<B>(
    backend: Arc<B>,
    store: WizardStore,
    registration_id: RegistrationId,
    period: Duration,
    fetch_readiness_link: bool,
) -> Option<BiometricStatus>
where
    B: EnrollmentBackend + ?Sized,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let status = loop {
        ticker.tick().await;
        if store.snapshot().registration_id() != Some(&registration_id) {
            debug!(registration_id = %registration_id, "registration superseded, stopping poll");
            return None;
        }

        let report = match backend.biometric_status(&registration_id).await {
            Ok(report) => report,
            Err(error) => {
                warn!(
                    registration_id = %registration_id,
                    error = %error,
                    "biometric status check failed, keeping last known status"
                );
                continue;
            }
        };

        let status = report.status();
        debug!(registration_id = %registration_id, status = status.label(), "biometric status");
        store.dispatch(WizardEvent::BiometricReported {
            registration_id: registration_id.clone(),
            status,
            info: report.info(),
        });
        if status.is_terminal() {
            break status;
        }
    };

    info!(registration_id = %registration_id, status = status.label(), "biometric validation finished");
    if status == BiometricStatus::Approved {
        unlock_enrollment(backend.as_ref(), &store, &registration_id, fetch_readiness_link).await;
    }
    Some(status)
}

/// Moves an approved registration into stage 3.
///
/// With `fetch_readiness_link` the backend must hand out the core-system link
/// first; a failure leaves the wizard at stage 2 and is shown to the applicant.
pub(crate) async fn unlock_enrollment<B>(
    backend: &B,
    store: &WizardStore,
    registration_id: &RegistrationId,
    fetch_readiness_link: bool,
) -> bool
where
    B: EnrollmentBackend + ?Sized,
{
    if fetch_readiness_link {
        match backend.readiness_link(registration_id).await {
            Ok(link) => {
                debug!(registration_id = %registration_id, link = %link, "readiness link obtained");
            }
            Err(error) => {
                warn!(registration_id = %registration_id, error = %error, "readiness link unavailable");
                store.present_error(&WizardError::from_backend(
                    error,
                    "Error al obtener link de LINIX",
                ));
                return false;
            }
        }
    }

    let state = store.dispatch(WizardEvent::EnrollmentUnlocked {
        registration_id: registration_id.clone(),
    });
    let unlocked = state.step == Step::EnrollmentForm
        && state.registration_id() == Some(registration_id);
    if unlocked {
        info!(registration_id = %registration_id, step = %state.step, "enrollment form unlocked");
    }
    unlocked
}
