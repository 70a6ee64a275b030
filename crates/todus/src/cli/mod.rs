pub mod account;
pub mod app;
pub mod download;
pub mod upload;

use std::sync::Arc;

use anyhow::Result;
use todus_fetch::ServiceClient;
use todus_proto::Handshake;
use todus_transfer::{Orchestrator, TransferConfig};

use crate::accounts::FileAccountStore;
use crate::env::TodusEnv;
use crate::settings::Settings;
use crate::ui::ProgressTracker;

pub use app::{App, Commands};

pub type Client = Orchestrator<Handshake, Arc<FileAccountStore>>;

/// What every command runs against.
pub struct AppContext {
    pub env:      TodusEnv,
    pub settings: Settings,
    pub accounts: Arc<FileAccountStore>,
}

impl AppContext {
    pub fn http(&self) -> Result<ServiceClient> { Ok(ServiceClient::new(self.settings.http_config())?) }

    /// Orchestrator for one command. Ctrl-C aborts it.
    pub fn client(&self, config: TransferConfig, tracker: Arc<ProgressTracker>) -> Result<Client> {
        let broker = Handshake::new(self.settings.handshake_config());
        let client = Orchestrator::new(broker, self.http()?, self.accounts.clone(), config).with_observer(tracker);

        let cancel = client.cancellation();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
        Ok(client)
    }
}

pub async fn run(cmd: Commands, ctx: &AppContext) -> Result<()> {
    match cmd {
        Commands::Login => account::login(ctx).await,
        Commands::Upload(arg) => upload::run(ctx, arg).await,
        Commands::Download(arg) => download::run(ctx, arg).await,
        Commands::Token => account::token(ctx).await,
        Commands::Accounts => account::list(ctx),
    }
}
