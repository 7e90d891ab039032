use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vinculacion::catalog::{Catalog, CsvCatalog};
use vinculacion::error::AppError;
use vinculacion::workflows::enrollment::{
    FormField, Notification, NotificationKind, VerificationLauncher, WizardState,
};

pub(crate) fn load_catalog(dir: &Path) -> Result<Arc<dyn Catalog>, AppError> {
    let catalog = CsvCatalog::from_dir(dir)?;
    Ok(Arc::new(catalog))
}

/// Reads a JSON object keyed by backend field names (`celular`, `ciudad`, ...).
pub(crate) fn read_form_file(path: Option<&Path>) -> Result<Vec<(FormField, String)>, AppError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path)?;
    Ok(parse_form(&raw)?)
}

pub(crate) fn parse_form(raw: &str) -> Result<Vec<(FormField, String)>, serde_json::Error> {
    let values: BTreeMap<FormField, Value> = serde_json::from_str(raw)?;
    Ok(values
        .into_iter()
        .filter_map(|(field, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(text) => text,
                Value::Bool(true) => "S".to_string(),
                Value::Bool(false) => "N".to_string(),
                other => other.to_string(),
            };
            Some((field, text))
        })
        .collect())
}

/// Prints the verification link for the applicant to open in a browser.
pub(crate) struct ConsoleLauncher;

impl VerificationLauncher for ConsoleLauncher {
    fn open(&self, url: &str) {
        println!("Abre este enlace para la validacion biometrica: {url}");
    }
}

/// Echoes step changes, notifications and modals until the store goes away.
pub(crate) fn spawn_surface_printer(mut updates: watch::Receiver<WizardState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = updates.borrow_and_update().clone();
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if state.step != last.step {
                println!("Paso {}", state.step);
            }
            if state.notification_seq != last.notification_seq {
                if let Some(notification) = &state.notification {
                    print_notification(notification);
                }
            }
            if state.modal.is_some() && state.modal != last.modal {
                if let Some(modal) = &state.modal {
                    eprintln!("[{}] {}", modal.title, modal.message);
                }
            }
            last = state;
        }
    })
}

fn print_notification(notification: &Notification) {
    match notification.kind {
        NotificationKind::Error => eprintln!("error: {}", notification.message),
        NotificationKind::Success => println!("ok: {}", notification.message),
        NotificationKind::Info => println!("info: {}", notification.message),
    }
}
