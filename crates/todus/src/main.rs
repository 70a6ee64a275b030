mod accounts;
mod cli;
mod env;
mod logging;
mod settings;
mod ui;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use todus_transfer::TransferError;
use tracing::{error, info};

use crate::accounts::FileAccountStore;
use crate::cli::{App, AppContext};
use crate::env::TodusEnv;
use crate::settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let app = App::parse();
    match run(app).await {
        Ok(code) => code,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(app: App) -> Result<ExitCode> {
    let env = TodusEnv::new()?;
    logging::init(&env)?;

    let settings = Settings::load(env.config()).with_context(|| format!("Failed to load {}", env.config().display()))?;
    let accounts = FileAccountStore::open(env.accounts(), app.number.as_deref())?;
    let ctx = AppContext { env, settings, accounts: Arc::new(accounts) };
    info!(command = ?app.cmd, "starting");

    // Dropping the command future aborts every transfer task it owns.
    tokio::select! {
        result = cli::run(app.cmd, &ctx) => result.map(|()| ExitCode::SUCCESS),
        Ok(()) = tokio::signal::ctrl_c() => {
            info!("interrupted");
            println!("Operation canceled by user.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report(err: &anyhow::Error) {
    error!(error = ?err, "command failed");
    match err.downcast_ref::<TransferError>() {
        Some(TransferError::Authentication { phone }) => eprintln!("ERROR: Session expired for account: {phone}"),
        Some(TransferError::Aborted) => eprintln!("Operation canceled by user."),
        _ => eprintln!("ERROR: {err:#}"),
    }
}
