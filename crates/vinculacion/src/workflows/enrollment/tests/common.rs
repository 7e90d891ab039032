use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::catalog::{Catalog, CsvCatalog};
use crate::config::WizardConfig;
use crate::workflows::enrollment::backend::{
    BackendError, BiometricReport, CreatedRegistration, EnrollmentBackend, EnrollmentSubmission,
    SubmissionResponse, VerificationResponse,
};
use crate::workflows::enrollment::domain::{BasicData, BasicField, RegistrationId, Step};
use crate::workflows::enrollment::store::WizardState;
use crate::workflows::enrollment::wizard::{EnrollmentWizard, VerificationLauncher};
use crate::workflows::enrollment::FormField;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Call {
    Create(BasicData),
    Status(RegistrationId),
    Readiness(RegistrationId),
    Submit(Value),
    Verify(RegistrationId),
}

#[derive(Default)]
struct Script {
    registrations: VecDeque<Result<CreatedRegistration, BackendError>>,
    statuses: HashMap<String, VecDeque<Result<BiometricReport, BackendError>>>,
    readiness: VecDeque<Result<String, BackendError>>,
    submissions: VecDeque<Result<SubmissionResponse, BackendError>>,
    verifications: VecDeque<Result<VerificationResponse, BackendError>>,
    next_id: u64,
}

/// In-memory backend replaying scripted replies and recording every call.
///
/// Unscripted calls succeed: registrations get sequential ids from 100,
/// status checks report `PENDIENTE`.
#[derive(Default)]
pub(super) struct ScriptedBackend {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
    status_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub(super) fn with_registration(self, reply: Result<CreatedRegistration, BackendError>) -> Self {
        self.script.lock().expect("script lock").registrations.push_back(reply);
        self
    }

    pub(super) fn with_statuses(self, id: &str, codes: &[&str]) -> Self {
        let replies = codes.iter().map(|code| Ok(report(code))).collect::<Vec<_>>();
        self.with_status_replies(id, replies)
    }

    pub(super) fn with_status_replies(
        self,
        id: &str,
        replies: Vec<Result<BiometricReport, BackendError>>,
    ) -> Self {
        self.script
            .lock()
            .expect("script lock")
            .statuses
            .entry(id.to_string())
            .or_default()
            .extend(replies);
        self
    }

    pub(super) fn with_readiness(self, reply: Result<String, BackendError>) -> Self {
        self.script.lock().expect("script lock").readiness.push_back(reply);
        self
    }

    pub(super) fn with_submission(self, reply: Result<SubmissionResponse, BackendError>) -> Self {
        self.script.lock().expect("script lock").submissions.push_back(reply);
        self
    }

    pub(super) fn with_verification(
        self,
        reply: Result<VerificationResponse, BackendError>,
    ) -> Self {
        self.script.lock().expect("script lock").verifications.push_back(reply);
        self
    }

    pub(super) fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub(super) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(super) fn status_calls(&self, id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Status(called) if called.as_str() == id))
            .count()
    }

    pub(super) fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub(super) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl EnrollmentBackend for ScriptedBackend {
    async fn create_registration(
        &self,
        basic_data: &BasicData,
    ) -> Result<CreatedRegistration, BackendError> {
        self.record(Call::Create(basic_data.clone()));
        let mut script = self.script.lock().expect("script lock");
        if let Some(reply) = script.registrations.pop_front() {
            return reply;
        }
        let id = 100 + script.next_id;
        script.next_id += 1;
        Ok(created(&id.to_string()))
    }

    async fn biometric_status(&self, id: &RegistrationId) -> Result<BiometricReport, BackendError> {
        self.record(Call::Status(id.clone()));
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.script
            .lock()
            .expect("script lock")
            .statuses
            .get_mut(id.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(report("PENDIENTE")))
    }

    async fn readiness_link(&self, id: &RegistrationId) -> Result<String, BackendError> {
        self.record(Call::Readiness(id.clone()));
        self.script
            .lock()
            .expect("script lock")
            .readiness
            .pop_front()
            .unwrap_or_else(|| Ok(format!("https://linix.example/vinculacion/{id}")))
    }

    async fn submit_enrollment(
        &self,
        submission: &EnrollmentSubmission,
    ) -> Result<SubmissionResponse, BackendError> {
        self.record(Call::Submit(
            serde_json::to_value(submission).expect("submission serializes"),
        ));
        self.script
            .lock()
            .expect("script lock")
            .submissions
            .pop_front()
            .unwrap_or_else(|| Ok(live_submission()))
    }

    async fn verify_enrollment(
        &self,
        id: &RegistrationId,
    ) -> Result<VerificationResponse, BackendError> {
        self.record(Call::Verify(id.clone()));
        self.script
            .lock()
            .expect("script lock")
            .verifications
            .pop_front()
            .unwrap_or_else(|| {
                Ok(VerificationResponse {
                    completado: true,
                    mensaje: Some("Vinculacion completada".to_string()),
                })
            })
    }
}

#[derive(Default)]
pub(super) struct RecordingLauncher {
    opened: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub(super) fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("launcher lock").clone()
    }
}

impl VerificationLauncher for RecordingLauncher {
    fn open(&self, url: &str) {
        self.opened.lock().expect("launcher lock").push(url.to_string());
    }
}

pub(super) fn created(id: &str) -> CreatedRegistration {
    serde_json::from_value(json!({
        "id": id.parse::<u64>().map(Value::from).unwrap_or_else(|_| Value::from(id)),
        "link_biometria": format!("https://decrim.example/caso/{id}"),
    }))
    .expect("valid registration payload")
}

pub(super) fn report(code: &str) -> BiometricReport {
    BiometricReport {
        estado_biometria: code.to_string(),
        mensaje: Some(format!("Estado {code}")),
        justificacion: None,
    }
}

pub(super) fn live_submission() -> SubmissionResponse {
    SubmissionResponse {
        ok: true,
        respuesta_linix: Some(json!({ "message": "Tercero creado", "radicado": "RAD-2291" })),
        mensaje: Some("Vinculacion enviada".to_string()),
        ..SubmissionResponse::default()
    }
}

pub(super) fn dry_run_submission() -> SubmissionResponse {
    SubmissionResponse {
        ok: true,
        respuesta_linix: Some(json!({
            "message": "Vinculacion simulada: LINIX_DRY_RUN activo",
            "radicado": "",
        })),
        mensaje: Some("Vinculacion enviada".to_string()),
        ..SubmissionResponse::default()
    }
}

pub(super) fn catalog() -> Arc<dyn Catalog> {
    let catalog = CsvCatalog::from_readers(
        Cursor::new("id,name\n50,Meta\n5,Antioquia\n"),
        Cursor::new("id,name,department_id\n50001,Villavicencio,50\n50006,Acacias,50\n5001,Medellin,5\n"),
        Cursor::new("code,description\n4711,Comercio al por menor\n0111,Cultivo de cereales\n"),
    )
    .expect("sample catalog parses");
    Arc::new(catalog)
}

pub(super) fn config() -> WizardConfig {
    WizardConfig {
        poll_interval: Duration::from_secs(5),
        biometric_fallback_url: None,
        fetch_readiness_link: false,
    }
}

pub(super) fn wizard(backend: Arc<ScriptedBackend>) -> EnrollmentWizard<ScriptedBackend> {
    EnrollmentWizard::new(backend, catalog(), config())
}

pub(super) fn fill_basic_data(wizard: &EnrollmentWizard<ScriptedBackend>) {
    wizard.edit_basic_data(BasicField::FullName, "Carlos Daniel Ortiz Angel");
    wizard.edit_basic_data(BasicField::DocumentNumber, "1122334455");
    wizard.edit_basic_data(BasicField::DocumentType, "1");
    wizard.edit_basic_data(BasicField::IssueDate, "2015-03-02");
    wizard.edit_basic_data(BasicField::Branch, "ACACIAS");
}

pub(super) fn fill_form(wizard: &EnrollmentWizard<ScriptedBackend>) {
    let fields = [
        (FormField::BirthDate, "1990-04-12"),
        (FormField::Email, "carlos.ortiz@correo.com"),
        (FormField::Mobile, "3104567890"),
        (FormField::Address, "calle 10 # 4-21"),
        (FormField::Neighborhood, "el centro"),
        (FormField::Department, "50"),
        (FormField::City, "50001"),
        (FormField::PrimaryActivity, "4711"),
        (FormField::Salary, "$ 2.500.000"),
    ];
    for (field, value) in fields {
        wizard.edit_enrollment_field(field, value);
    }
}

/// Waits, with the clock paused, until `predicate` holds for the published state.
pub(super) async fn wait_until(
    updates: &mut watch::Receiver<WizardState>,
    predicate: impl FnMut(&WizardState) -> bool,
) -> WizardState {
    tokio::time::timeout(Duration::from_secs(600), updates.wait_for(predicate))
        .await
        .expect("state reached before timeout")
        .expect("store alive")
        .clone()
}

/// Runs stage 1 and 2. `backend` must approve registration `100`.
pub(super) async fn approved_wizard(
    backend: Arc<ScriptedBackend>,
) -> EnrollmentWizard<ScriptedBackend> {
    let wizard = wizard(backend);
    fill_basic_data(&wizard);
    let mut updates = wizard.subscribe();
    wizard
        .submit_basic_data()
        .await
        .expect("registration created");
    wait_until(&mut updates, |state| state.step == Step::EnrollmentForm).await;
    wizard
}
