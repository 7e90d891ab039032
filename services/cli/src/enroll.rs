use crate::infra::{self, ConsoleLauncher};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vinculacion::config::AppConfig;
use vinculacion::error::AppError;
use vinculacion::workflows::enrollment::{
    BasicField, BiometricStatus, EnrollmentWizard, FormField, HttpBackend, Step, WizardState,
};

#[derive(Args, Debug)]
pub(crate) struct EnrollArgs {
    /// Applicant's full name (names followed by surnames)
    #[arg(long)]
    pub(crate) full_name: String,
    /// Identity document number
    #[arg(long)]
    pub(crate) document_number: String,
    /// Document type code (1 = cedula de ciudadania)
    #[arg(long, default_value = "1")]
    pub(crate) document_type: String,
    /// Document issue date (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) issue_date: String,
    /// Branch the applicant enrolls at
    #[arg(long)]
    pub(crate) branch: String,
    /// JSON object with the stage-3 form fields
    #[arg(long)]
    pub(crate) form: Option<PathBuf>,
    /// Directory holding departments.csv, cities.csv and ciiu.csv
    #[arg(long, default_value = "demos/catalog")]
    pub(crate) catalog_dir: PathBuf,
    /// How long to wait for the biometric outcome, in seconds
    #[arg(long, default_value_t = 900)]
    pub(crate) wait_secs: u64,
    /// New biometric attempts to start after a rejection
    #[arg(long, default_value_t = 0)]
    pub(crate) retries: u32,
    /// Stop after submitting, without the final core-system check
    #[arg(long)]
    pub(crate) skip_verify: bool,
}

pub(crate) async fn run_enrollment(config: AppConfig, args: EnrollArgs) -> Result<(), AppError> {
    let catalog = infra::load_catalog(&args.catalog_dir)?;
    let form = infra::read_form_file(args.form.as_deref())?;
    let backend = Arc::new(HttpBackend::new(&config.api)?);
    info!(base_url = %backend.base_url(), environment = ?config.environment, "starting enrollment");

    let wizard = EnrollmentWizard::new(backend, catalog, config.wizard.clone())
        .with_launcher(Arc::new(ConsoleLauncher));
    let printer = infra::spawn_surface_printer(wizard.subscribe());

    let basic = [
        (BasicField::FullName, &args.full_name),
        (BasicField::DocumentNumber, &args.document_number),
        (BasicField::DocumentType, &args.document_type),
        (BasicField::IssueDate, &args.issue_date),
        (BasicField::Branch, &args.branch),
    ];
    for (field, value) in basic {
        wizard.edit_basic_data(field, value);
    }

    let outcome = drive(&wizard, &args, form).await;
    wizard.cancel_polling();
    // let the printer flush the last transition before it is stopped
    tokio::task::yield_now().await;
    printer.abort();
    outcome
}

async fn drive(
    wizard: &EnrollmentWizard<HttpBackend>,
    args: &EnrollArgs,
    form: Vec<(FormField, String)>,
) -> Result<(), AppError> {
    let registration_id = wizard.submit_basic_data().await?;
    info!(registration_id = %registration_id, "waiting for biometric validation");

    let wait = Duration::from_secs(args.wait_secs);
    let mut retries_left = args.retries;
    loop {
        let state = wait_for_biometric(wizard, wait).await?;
        match state.biometric_status() {
            Some(BiometricStatus::Rejected) if retries_left > 0 => {
                retries_left -= 1;
                let id = wizard.retry_validation().await?;
                info!(registration_id = %id, retries_left, "biometric validation retried");
            }
            Some(BiometricStatus::Rejected) => {
                let reason = state
                    .registration
                    .map(|registration| registration.biometric_info.justification_summary())
                    .filter(|summary| !summary.is_empty())
                    .unwrap_or_else(|| "validacion biometrica rechazada".to_string());
                return Err(AppError::Incomplete {
                    step: state.step,
                    reason,
                });
            }
            _ if state.step == Step::EnrollmentForm => break,
            _ => {
                warn!("readiness link unavailable, retrying once");
                if wizard.resume_enrollment().await? {
                    break;
                }
                return Err(incomplete(&wizard.snapshot(), "el sistema central no habilito el paso 3"));
            }
        }
    }

    for (field, value) in form {
        wizard.edit_enrollment_field(field, &value);
    }
    let result = wizard.submit_enrollment().await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if args.skip_verify {
        return Ok(());
    }
    if wizard.verify_enrollment().await? {
        println!("{}", serde_json::to_string_pretty(&wizard.snapshot().submission)?);
        Ok(())
    } else {
        Err(incomplete(&wizard.snapshot(), "verificacion pendiente en LINIX"))
    }
}

/// Resolves once stage 2 settles: rejected, unlocked, or approved with an error shown.
async fn wait_for_biometric(
    wizard: &EnrollmentWizard<HttpBackend>,
    wait: Duration,
) -> Result<WizardState, AppError> {
    let mut updates = wizard.subscribe();
    let settled = tokio::time::timeout(wait, async {
        updates
            .wait_for(|state| {
                state.step >= Step::EnrollmentForm
                    || state.biometric_status() == Some(BiometricStatus::Rejected)
                    || (state.biometric_status() == Some(BiometricStatus::Approved)
                        && state.notification.is_some())
            })
            .await
            .map(|state| state.clone())
    })
    .await;

    match settled {
        Ok(Ok(state)) => Ok(state),
        Ok(Err(_)) => Err(incomplete(&wizard.snapshot(), "el asistente se detuvo")),
        Err(_) => Err(incomplete(
            &wizard.snapshot(),
            "tiempo de espera agotado para la validacion biometrica",
        )),
    }
}

fn incomplete(state: &WizardState, fallback: &str) -> AppError {
    let reason = state
        .notification
        .as_ref()
        .map(|notification| notification.message.clone())
        .unwrap_or_else(|| fallback.to_string());
    AppError::Incomplete {
        step: state.step,
        reason,
    }
}
