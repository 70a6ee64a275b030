use std::time::Duration;

/// Endpoints, client identity and timing of the HTTP channel.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base of the account endpoints, without trailing slash.
    pub auth_url:        String,
    /// Reported in every `User-Agent`.
    pub version_name:    String,
    /// Sent in the login body.
    pub version_code:    String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Pause before re-requesting a download whose body broke off.
    pub stall_backoff:   Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            auth_url:        "https://auth.todus.cu".to_string(),
            version_name:    "0.40.29".to_string(),
            version_code:    "21833".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            stall_backoff:   Duration::from_secs(5),
        }
    }
}

impl HttpConfig {
    pub fn auth_agent(&self) -> String { format!("ToDus {} Auth", self.version_name) }

    pub fn upload_agent(&self) -> String { format!("ToDus {} HTTP-Upload", self.version_name) }

    pub fn download_agent(&self) -> String { format!("ToDus {} HTTP-Download", self.version_name) }
}
