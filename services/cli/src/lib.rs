mod cli;
mod commands;
mod context;

use realty_desk::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
