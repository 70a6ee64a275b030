use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use home::home_dir;

/// Files the client keeps between runs.
#[derive(Debug, Clone)]
pub struct TodusEnv {
    root:     PathBuf,
    pwd:      PathBuf,
    config:   PathBuf,
    accounts: PathBuf,
    log:      PathBuf,
}

impl TodusEnv {
    /// `~/.todus`, or `$TODUS_HOME` when set.
    pub fn new() -> Result<Self> {
        let pwd = env::current_dir().context("Failed to get current directory")?;
        let root = match env::var_os("TODUS_HOME") {
            Some(root) => PathBuf::from(root),
            None => home_dir().context("Failed to get home directory")?.join(".todus"),
        };
        Ok(Self::from_root(&root, pwd))
    }

    pub fn from_root(root: &Path, pwd: PathBuf) -> Self {
        Self {
            root: root.to_path_buf(),
            pwd,
            config: root.join("config.toml"),
            accounts: root.join("accounts.toml"),
            log: root.join("log.txt"),
        }
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Working directory; manifests and downloads land here.
    pub fn pwd(&self) -> &Path { &self.pwd }

    pub fn config(&self) -> &Path { &self.config }

    pub fn accounts(&self) -> &Path { &self.accounts }

    pub fn log(&self) -> &Path { &self.log }
}
