use crate::enroll::{run_enrollment, EnrollArgs};
use crate::infra;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vinculacion::config::AppConfig;
use vinculacion::error::AppError;
use vinculacion::telemetry;
use vinculacion::workflows::enrollment::{
    split_full_name, EnrollmentBackend, HttpBackend, RegistrationId,
};

#[derive(Parser, Debug)]
#[command(
    name = "vinculacion",
    about = "Run the digital membership enrollment against the enrollment API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk one applicant through the four enrollment stages
    Enroll(EnrollArgs),
    /// Print the current biometric status of a registration
    Status(StatusArgs),
    /// Show how a full name is split into the core-system name fields
    SplitName(SplitNameArgs),
    /// Search the economic-activity (CIIU) catalog
    Activities(ActivitiesArgs),
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Registration id returned by the pre-registration step
    id: String,
}

#[derive(Args, Debug)]
struct SplitNameArgs {
    /// Full name as typed by the applicant
    full_name: String,
}

#[derive(Args, Debug)]
struct ActivitiesArgs {
    /// Code or description fragment
    query: String,
    /// Directory holding departments.csv, cities.csv and ciiu.csv
    #[arg(long, default_value = "demos/catalog")]
    catalog_dir: PathBuf,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Enroll(args) => {
            let config = AppConfig::load()?;
            telemetry::init(&config.telemetry)?;
            run_enrollment(config, args).await
        }
        Command::Status(args) => {
            let config = AppConfig::load()?;
            telemetry::init(&config.telemetry)?;
            run_status(&config, args).await
        }
        Command::SplitName(args) => {
            let parts = split_full_name(&args.full_name);
            println!("{}", serde_json::to_string_pretty(&parts)?);
            Ok(())
        }
        Command::Activities(args) => {
            let catalog = infra::load_catalog(&args.catalog_dir)?;
            for activity in catalog.search_activities(&args.query) {
                println!("{}", activity.display_label());
            }
            Ok(())
        }
    }
}

async fn run_status(config: &AppConfig, args: StatusArgs) -> Result<(), AppError> {
    let backend = HttpBackend::new(&config.api)?;
    let report = backend
        .biometric_status(&RegistrationId(args.id.trim().to_string()))
        .await?;
    let info = report.info();
    let output = serde_json::json!({
        "status": report.status(),
        "label": report.status().label(),
        "message": info.message,
        "justification": info.justification_summary(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
