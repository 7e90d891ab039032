use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::workflows::enrollment::backend::BackendError;
use crate::workflows::enrollment::domain::{BasicData, BiometricStatus, Registration, RegistrationId, Step};
use crate::workflows::enrollment::errors::WizardError;
use crate::workflows::enrollment::feedback::NotificationKind;
use crate::workflows::enrollment::poller::BiometricPoller;
use crate::workflows::enrollment::store::{WizardEvent, WizardStore};
use crate::workflows::enrollment::wizard::EnrollmentWizard;

#[tokio::test(start_paused = true)]
async fn resubmitting_cancels_the_previous_loop() {
    let backend = Arc::new(ScriptedBackend::default());
    let wizard = wizard(backend.clone());
    fill_basic_data(&wizard);

    let first = wizard.submit_basic_data().await.expect("first registration");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(backend.status_calls(first.as_str()), 1);

    let second = wizard.submit_basic_data().await.expect("second registration");
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(backend.status_calls(first.as_str()), 1, "old loop stopped");
    assert!(backend.status_calls(second.as_str()) >= 6);
    assert!(wizard.is_polling());
    assert_eq!(backend.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_resubmission_keeps_polling_the_current_registration() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .with_registration(Ok(created("100")))
            .with_registration(Err(BackendError::Transport("refused".to_string())))
            .with_statuses("100", &["PENDIENTE", "APROBADO"]),
    );
    let wizard = wizard(backend.clone());
    fill_basic_data(&wizard);
    let mut updates = wizard.subscribe();

    wizard.submit_basic_data().await.expect("first registration");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(backend.status_calls("100"), 1);

    assert!(matches!(
        wizard.submit_basic_data().await,
        Err(WizardError::Network(_))
    ));
    assert!(wizard.is_polling(), "current loop survives the failed request");
    assert_eq!(
        wizard.snapshot().registration_id().map(RegistrationId::as_str),
        Some("100")
    );

    let state = wait_until(&mut updates, |state| state.step == Step::EnrollmentForm).await;
    assert_eq!(state.registration_id().map(RegistrationId::as_str), Some("100"));
    assert_eq!(backend.status_calls("100"), 2);
    assert_eq!(backend.count(|call| matches!(call, Call::Create(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_checks_never_overlap() {
    let backend = Arc::new(ScriptedBackend::default().with_status_delay(Duration::from_secs(7)));
    let wizard = wizard(backend.clone());
    fill_basic_data(&wizard);

    let id = wizard.submit_basic_data().await.expect("registration created");
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(backend.max_in_flight(), 1);
    assert!(backend.status_calls(id.as_str()) >= 4);
}

#[tokio::test(start_paused = true)]
async fn failed_checks_keep_polling_with_last_known_status() {
    let backend = Arc::new(ScriptedBackend::default().with_status_replies(
        "100",
        vec![
            Ok(report("PENDIENTE")),
            Err(BackendError::Transport("connection reset".to_string())),
            Err(BackendError::Rejected {
                status: 502,
                message: "bad gateway".to_string(),
            }),
            Ok(report("APROBADO")),
        ],
    ));
    let wizard = wizard(backend.clone());
    fill_basic_data(&wizard);
    let mut updates = wizard.subscribe();

    wizard.submit_basic_data().await.expect("registration created");
    tokio::time::sleep(Duration::from_secs(11)).await;
    let state = wizard.snapshot();
    assert_eq!(backend.status_calls("100"), 3);
    assert_eq!(state.biometric_status(), Some(BiometricStatus::Pending));
    assert_eq!(
        state.registration.map(|r| r.biometric_info.message),
        Some("Estado PENDIENTE".to_string())
    );
    assert!(wizard.snapshot().notification.is_none(), "poll failures stay silent");

    let state = wait_until(&mut updates, |state| state.step == Step::EnrollmentForm).await;
    assert_eq!(state.biometric_status(), Some(BiometricStatus::Approved));
}

#[tokio::test(start_paused = true)]
async fn in_process_status_counts_as_pending() {
    let backend = Arc::new(
        ScriptedBackend::default().with_statuses("100", &["EN_PROCESO", "EN_PROCESO", "APROBADO"]),
    );
    let wizard = wizard(backend.clone());
    fill_basic_data(&wizard);
    let mut updates = wizard.subscribe();

    wizard.submit_basic_data().await.expect("registration created");
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(
        wizard.snapshot().biometric_status(),
        Some(BiometricStatus::Pending)
    );
    wait_until(&mut updates, |state| state.step == Step::EnrollmentForm).await;
}

#[tokio::test(start_paused = true)]
async fn cancelled_handle_issues_no_further_requests() {
    let backend = Arc::new(ScriptedBackend::default());
    let store = WizardStore::default();
    let id = RegistrationId("9".to_string());
    store.dispatch(WizardEvent::RegistrationStarted(Registration::new(
        id.clone(),
        BasicData::default(),
        None,
    )));
    let poller = BiometricPoller::new(backend.clone(), store, Duration::from_secs(5), false);

    let handle = poller.start(id.clone());
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(backend.status_calls("9"), 2);

    handle.cancel();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.status_calls("9"), 2);
    assert!(handle.join().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn superseded_registration_stops_its_loop() {
    let backend = Arc::new(ScriptedBackend::default());
    let store = WizardStore::default();
    let old = RegistrationId("1".to_string());
    store.dispatch(WizardEvent::RegistrationStarted(Registration::new(
        old.clone(),
        BasicData::default(),
        None,
    )));
    let poller =
        BiometricPoller::new(backend.clone(), store.clone(), Duration::from_secs(5), false);
    let handle = poller.start(old);
    tokio::time::sleep(Duration::from_millis(1)).await;

    store.dispatch(WizardEvent::RegistrationStarted(Registration::new(
        RegistrationId("2".to_string()),
        BasicData::default(),
        None,
    )));
    assert!(handle.join().await.is_none());
    assert_eq!(backend.status_calls("1"), 1);
}

#[tokio::test(start_paused = true)]
async fn readiness_failure_holds_stage_two_until_resumed() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .with_statuses("100", &["APROBADO"])
            .with_readiness(Err(BackendError::Rejected {
                status: 400,
                message: "Debes completar la validacion biometrica".to_string(),
            })),
    );
    let mut settings = config();
    settings.fetch_readiness_link = true;
    let wizard = EnrollmentWizard::new(backend.clone(), catalog(), settings);
    fill_basic_data(&wizard);
    let mut updates = wizard.subscribe();

    wizard.submit_basic_data().await.expect("registration created");
    let state = wait_until(&mut updates, |state| state.notification.is_some()).await;
    assert_eq!(state.step, Step::BiometricValidation);
    assert_eq!(state.biometric_status(), Some(BiometricStatus::Approved));
    let notification = state.notification.expect("readiness error shown");
    assert_eq!(notification.kind, NotificationKind::Error);
    assert_eq!(notification.message, "Debes completar la validacion biometrica");

    assert!(wizard.resume_enrollment().await.expect("resume accepted"));
    assert_eq!(wizard.snapshot().step, Step::EnrollmentForm);
    assert_eq!(
        backend.count(|call| matches!(call, Call::Readiness(_))),
        2
    );
    assert_eq!(backend.count(|call| matches!(call, Call::Create(_))), 1);
}
