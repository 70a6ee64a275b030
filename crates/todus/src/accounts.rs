use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use todus_fs::{AtomicWriteOptions, atomic_read, atomic_write};
use todus_transfer::{Account, AccountStore};
use tracing::{info, warn};

/// Bare national numbers are this long.
const NATIONAL_DIGITS: usize = 8;
const COUNTRY_CODE: &str = "53";

/// Strip spaces and `+`, and prefix the country code to national numbers.
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| !c.is_whitespace() && *c != '+').collect();
    if digits.len() == NATIONAL_DIGITS {
        format!("{COUNTRY_CODE}{digits}")
    } else {
        digits
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub phone_number: String,
    #[serde(default)]
    pub password:     String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<AccountRecord>,
}

/// `accounts.toml`, with one account selected for this run.
#[derive(Debug)]
pub struct FileAccountStore {
    path:     PathBuf,
    selected: Option<String>,
    file:     Mutex<AccountsFile>,
}

impl FileAccountStore {
    /// Load `path`; a missing file holds no accounts.
    ///
    /// `selected` picks the account by phone, otherwise the first one is used.
    pub fn open(path: impl Into<PathBuf>, selected: Option<&str>) -> Result<Self> {
        let path = path.into();
        let file = match atomic_read(&path) {
            Ok(bytes) => {
                let text = String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path.display()))?;
                toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?
            }
            Err(todus_fs::Error::NotFound(_)) => AccountsFile::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, selected: selected.map(normalize_phone), file: Mutex::new(file) })
    }

    pub fn records(&self) -> Vec<AccountRecord> { self.lock().accounts.clone() }

    /// Phone given with `-n`, normalized.
    pub fn requested(&self) -> Option<&str> { self.selected.as_deref() }

    /// Phone of the account this run works with.
    pub fn selected(&self) -> Option<String> {
        self.selected
            .clone()
            .or_else(|| self.lock().accounts.first().map(|record| record.phone_number.clone()))
    }

    /// Store `password` for `phone`, adding the account if it is new.
    pub fn set_password(&self, phone: &str, password: &str) -> Result<()> {
        let phone = normalize_phone(phone);
        let mut file = self.lock();
        match file.accounts.iter_mut().find(|record| record.phone_number == phone) {
            Some(record) => record.password = password.to_string(),
            None => file.accounts.push(AccountRecord { phone_number: phone, password: password.to_string() }),
        }
        self.save(&file)
    }

    fn save(&self, file: &AccountsFile) -> Result<()> {
        let text = toml::to_string(file).context("Failed to serialize accounts")?;
        atomic_write(&self.path, text.as_bytes(), AtomicWriteOptions::new().permissions(0o600).sync(true))?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AccountsFile> { self.file.lock().unwrap_or_else(PoisonError::into_inner) }
}

impl AccountStore for FileAccountStore {
    fn current_account(&self) -> Account {
        let Some(phone) = self.selected() else {
            return Account::default();
        };
        let password = self
            .lock()
            .accounts
            .iter()
            .find(|record| record.phone_number == phone)
            .map(|record| record.password.clone())
            .unwrap_or_default();
        Account { password, ..Account::new(phone) }
    }

    fn on_auth_expired(&self, account: &Account) {
        info!(phone = %account.phone_identity, "clearing expired password");
        if let Err(err) = self.set_password(&account.phone_identity, "") {
            warn!(phone = %account.phone_identity, error = %err, "failed to persist expired account");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+53 5123 4567"), "5351234567");
        assert_eq!(normalize_phone("51234567"), "5351234567");
        assert_eq!(normalize_phone("5351234567"), "5351234567");
    }

    #[test]
    fn test_missing_file_has_no_account() {
        let dir = tempdir().unwrap();
        let store = FileAccountStore::open(dir.path().join("accounts.toml"), None).unwrap();
        assert!(store.records().is_empty());
        assert_eq!(store.selected(), None);
        assert!(!store.current_account().is_registered());
    }

    #[test]
    fn test_password_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.toml");

        let store = FileAccountStore::open(&path, None).unwrap();
        store.set_password("51234567", "secret").unwrap();
        store.set_password("5359876543", "other").unwrap();

        let reopened = FileAccountStore::open(&path, Some("+53 5987 6543")).unwrap();
        assert_eq!(reopened.records().len(), 2);
        let account = reopened.current_account();
        assert_eq!(account.phone_identity, "5359876543");
        assert_eq!(account.password, "other");

        let first = FileAccountStore::open(&path, None).unwrap();
        assert_eq!(first.current_account().password, "secret");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        FileAccountStore::open(&path, None).unwrap().set_password("51234567", "x").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_requested_is_only_the_explicit_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        FileAccountStore::open(&path, None).unwrap().set_password("51234567", "secret").unwrap();

        let implicit = FileAccountStore::open(&path, None).unwrap();
        assert_eq!(implicit.requested(), None);
        assert_eq!(implicit.selected().as_deref(), Some("5351234567"));

        let explicit = FileAccountStore::open(&path, Some("5987 6543")).unwrap();
        assert_eq!(explicit.requested(), Some("5359876543"));
    }

    #[test]
    fn test_auth_expired_clears_password() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        let store = FileAccountStore::open(&path, Some("5351234567")).unwrap();
        store.set_password("5351234567", "secret").unwrap();

        store.on_auth_expired(&store.current_account());

        let reopened = FileAccountStore::open(&path, Some("5351234567")).unwrap();
        assert_eq!(reopened.records()[0].password, "");
        assert!(!reopened.current_account().is_registered());
    }
}
