use std::sync::Arc;

/// Credentials of one phone account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub phone_identity: String,
    /// Empty until the phone has been registered.
    pub password:       String,
}

impl Account {
    pub fn new(phone_identity: impl Into<String>) -> Self {
        Self { phone_identity: phone_identity.into(), ..Self::default() }
    }

    pub fn is_registered(&self) -> bool { !self.phone_identity.is_empty() && !self.password.is_empty() }
}

/// Where the orchestrator gets credentials from, and reports them stale to.
pub trait AccountStore: Send + Sync {
    fn current_account(&self) -> Account;

    /// The service rejected the account's password. Implementations forget
    /// the password so the user has to register again.
    fn on_auth_expired(&self, account: &Account);
}

impl<T: AccountStore + ?Sized> AccountStore for Arc<T> {
    fn current_account(&self) -> Account { (**self).current_account() }

    fn on_auth_expired(&self, account: &Account) { (**self).on_auth_expired(account) }
}
