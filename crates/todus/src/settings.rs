use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use todus_fetch::HttpConfig;
use todus_proto::HandshakeConfig;
use todus_transfer::{RetryPolicy, TransferConfig};

/// Everything `config.toml` can set. Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version_name: String,
    pub version_code: String,
    pub handshake:    HandshakeSettings,
    pub http:         HttpSettings,
    pub transfer:     TransferSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeSettings {
    pub host:            String,
    pub port:            u16,
    pub domain:          String,
    pub receive_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub auth_url:        String,
    pub request_timeout: u64,
    pub connect_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    pub negotiation_timeout: u64,
    pub transfer_timeout:    u64,
    pub upload_backoff:      u64,
    pub stall_backoff:       u64,
    pub download_backoff:    u64,
    /// Absent: retry until success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries:         Option<u32>,
    pub upload_workers:      usize,
    pub download_workers:    usize,
}

impl Default for Settings {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            version_name: http.version_name.clone(),
            version_code: http.version_code.clone(),
            handshake:    HandshakeSettings::default(),
            http:         HttpSettings::default(),
            transfer:     TransferSettings::default(),
        }
    }
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        let config = HandshakeConfig::default();
        Self {
            host:            config.host,
            port:            config.port,
            domain:          config.domain,
            receive_timeout: config.receive_timeout.as_secs(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        let config = HttpConfig::default();
        Self {
            auth_url:        config.auth_url,
            request_timeout: config.request_timeout.as_secs(),
            connect_timeout: config.connect_timeout.as_secs(),
        }
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        let config = TransferConfig::default();
        Self {
            negotiation_timeout: config.negotiation_timeout.as_secs(),
            transfer_timeout:    config.transfer_timeout.as_secs(),
            upload_backoff:      config.upload_backoff.as_secs(),
            stall_backoff:       HttpConfig::default().stall_backoff.as_secs(),
            download_backoff:    config.download_backoff.as_secs(),
            max_retries:         None,
            upload_workers:      config.upload_workers,
            download_workers:    config.download_workers,
        }
    }
}

impl Settings {
    /// Defaults, then `config_file`, then `TODUS_*` variables (`__` nests).
    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("TODUS_").split("__"))
    }

    pub fn load(config_file: &Path) -> Result<Self, figment::Error> { Self::figment(config_file).extract() }

    pub fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            host:            self.handshake.host.clone(),
            port:            self.handshake.port,
            domain:          self.handshake.domain.clone(),
            receive_timeout: Duration::from_secs(self.handshake.receive_timeout),
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            auth_url:        self.http.auth_url.trim_end_matches('/').to_string(),
            version_name:    self.version_name.clone(),
            version_code:    self.version_code.clone(),
            request_timeout: Duration::from_secs(self.http.request_timeout),
            connect_timeout: Duration::from_secs(self.http.connect_timeout),
            stall_backoff:   Duration::from_secs(self.transfer.stall_backoff),
        }
    }

    pub fn transfer_config(&self) -> TransferConfig {
        let transfer = &self.transfer;
        TransferConfig {
            negotiation_timeout: Duration::from_secs(transfer.negotiation_timeout),
            transfer_timeout:    Duration::from_secs(transfer.transfer_timeout),
            upload_backoff:      Duration::from_secs(transfer.upload_backoff),
            download_backoff:    Duration::from_secs(transfer.download_backoff),
            retry:               RetryPolicy::from_max_retries(transfer.max_retries),
            upload_workers:      transfer.upload_workers,
            download_workers:    transfer.download_workers,
            ..TransferConfig::default()
        }
    }
}
