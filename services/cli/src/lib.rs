mod cli;
mod enroll;
mod infra;

use vinculacion::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
