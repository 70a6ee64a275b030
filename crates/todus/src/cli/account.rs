use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tabled::Tabled;
use tracing::info;

use super::AppContext;
use crate::accounts::normalize_phone;
use crate::ui::{ProgressTracker, format};

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "Phone")]
    phone:      String,
    #[tabled(rename = "Registered")]
    registered: &'static str,
    #[tabled(rename = "Current")]
    current:    &'static str,
}

/// Request an SMS code, read it from the terminal and save the password.
pub async fn login(ctx: &AppContext) -> Result<()> {
    let phone = match ctx.accounts.requested() {
        Some(phone) => phone.to_string(),
        None => normalize_phone(&prompt("Phone number: ").await?),
    };
    if phone.is_empty() {
        bail!("No phone number given");
    }

    let http = ctx.http()?;
    http.request_code(&phone).await.context("Failed to request a verification code")?;
    let code = prompt("Enter PIN: ").await?;
    let password = http.validate_code(&phone, &code).await.context("Failed to validate the code")?;
    if password.is_empty() {
        bail!("The service returned no password for {phone}");
    }

    ctx.accounts.set_password(&phone, &password)?;
    info!(%phone, "account registered");
    println!("Logged in: {phone}");
    Ok(())
}

pub async fn token(ctx: &AppContext) -> Result<()> {
    let client = ctx.client(ctx.settings.transfer_config(), Arc::new(ProgressTracker::new()))?;
    let token = client.login().await?;
    println!("{token}");
    Ok(())
}

pub fn list(ctx: &AppContext) -> Result<()> {
    let records = ctx.accounts.records();
    if records.is_empty() {
        println!("No accounts added yet.");
        return Ok(());
    }

    let selected = ctx.accounts.selected();
    let rows = records.into_iter().map(|record| AccountRow {
        current:    if selected.as_deref() == Some(record.phone_number.as_str()) { "*" } else { "" },
        registered: if record.password.is_empty() { "no" } else { "yes" },
        phone:      record.phone_number,
    });
    println!("{}", format(rows));
    Ok(())
}

async fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().read_line(&mut line).map(|_| line)
    })
    .await??;
    Ok(line.trim().to_string())
}
