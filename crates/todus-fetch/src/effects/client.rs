use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RANGE, USER_AGENT};
use reqwest::{Body, Response, StatusCode};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::auth;
use crate::data::HttpConfig;
use crate::error::{Error, Result};

const PROTOBUF: &str = "application/x-protobuf";

/// Temporary sibling a download is written to before it is renamed.
pub fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Client for the account endpoints and the bulk transfer URLs.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http:   reqwest::Client,
    config: HttpConfig,
}

impl ServiceClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpConfig { &self.config }

    async fn post_auth(&self, endpoint: &str, body: Vec<u8>) -> Result<Response> {
        let url = format!("{}/v2/auth/{endpoint}", self.config.auth_url);
        debug!(%url, "auth request");
        let response = self
            .http
            .post(&url)
            .header(USER_AGENT, self.config.auth_agent())
            .header(CONTENT_TYPE, PROTOBUF)
            .timeout(self.config.request_timeout)
            .body(body)
            .send()
            .await?;
        Ok(response)
    }

    /// Ask the service to text a verification code to `phone`.
    pub async fn request_code(&self, phone: &str) -> Result<()> {
        let body = auth::base_body(phone, &auth::device_id());
        let response = self.post_auth("users.reserve", body).await?;
        check_status(&response)?;
        Ok(())
    }

    /// Confirm `phone` with the texted `code`; returns the account password.
    pub async fn validate_code(&self, phone: &str, code: &str) -> Result<String> {
        let body = auth::register_body(phone, &auth::device_id(), code);
        let response = self.post_auth("users.register", body).await?;
        check_status(&response)?;
        let reply = response.bytes().await?;
        Ok(auth::parse_password(&reply))
    }

    /// Exchange the account password for a bearer token.
    pub async fn login(&self, phone: &str, password: &str) -> Result<String> {
        let body = auth::login_body(phone, &auth::device_id(), password, &self.config.version_code);
        let response = self.post_auth("token", body).await?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(Error::Unauthorized);
        }
        check_status(&response)?;
        let reply = response.bytes().await?;
        Ok(auth::parse_token(&reply))
    }

    /// PUT `data` to a reserved upload URL.
    pub async fn upload(&self, token: &str, upload_url: &str, data: impl Into<Body>) -> Result<()> {
        let response = self
            .http
            .put(upload_url)
            .header(USER_AGENT, self.config.upload_agent())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(data)
            .send()
            .await?;
        check_status(&response)?;
        debug!(status = response.status().as_u16(), "upload accepted");
        Ok(())
    }

    /// GET `url` into `target`, resuming from `<target>.part` if present.
    ///
    /// A body that breaks off mid-transfer is re-requested from the current
    /// length after [`HttpConfig::stall_backoff`]. `on_progress` receives the
    /// number of bytes on disk after each chunk. Returns the final size.
    pub async fn download<P>(&self, token: &str, url: &str, target: &Path, on_progress: P) -> Result<u64>
    where
        P: Fn(u64, u64) + Send + Sync,
    {
        let temp = part_path(target);
        let mut file = OpenOptions::new().create(true).append(true).open(&temp).await?;
        let mut pos = file.metadata().await?.len();
        let mut expected: Option<u64> = None;

        while expected.is_none_or(|size| pos < size) {
            let mut request = self
                .http
                .get(url)
                .header(USER_AGENT, self.config.download_agent())
                .header(AUTHORIZATION, format!("Bearer {token}"));
            if pos > 0 {
                request = request.header(RANGE, format!("bytes={pos}-"));
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) if err.is_timeout() => {
                    warn!(%err, pos, "download request timed out");
                    tokio::time::sleep(self.config.stall_backoff).await;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if pos > 0 && response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
                debug!(pos, "nothing left past the resume offset");
                break;
            }
            check_status(&response)?;
            if pos > 0 && response.status() == StatusCode::OK {
                warn!(pos, "server ignored the range, restarting download");
                file.set_len(0).await?;
                pos = 0;
            }

            let remaining = response.content_length().ok_or(Error::MissingContentLength)?;
            let size = pos + remaining;
            expected = Some(size);
            if pos == 0 {
                info!(size, "download started");
            } else {
                info!(size, pos, "download resumed");
            }

            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        file.write_all(&bytes).await?;
                        file.flush().await?;
                        pos += bytes.len() as u64;
                        on_progress(pos, size);
                    }
                    Err(err) => {
                        warn!(%err, pos, size, "download stalled");
                        tokio::time::sleep(self.config.stall_backoff).await;
                        break;
                    }
                }
            }
        }

        file.flush().await?;
        drop(file);
        fs::rename(&temp, target).await?;
        Ok(pos)
    }
}

fn check_status(response: &Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Status { status: status.as_u16(), url: response.url().to_string() })
    }
}
