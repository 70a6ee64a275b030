use std::path::PathBuf;

use url::form_urlencoded;

const NAME_QUERY: &str = "?name=";

/// One file to fetch: a stored download URL and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url:    String,
    pub target: PathBuf,
}

impl DownloadJob {
    pub fn new(url: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self { url: url.into(), target: target.into() }
    }

    /// Parse a share link `<url>?name=<form-encoded name>`.
    pub fn from_share_link(link: &str) -> Option<Self> {
        let (url, encoded) = link.split_once(NAME_QUERY)?;
        // A bare `&` belongs to the name, not to a following pair.
        let pair = format!("n={}", encoded.replace('&', "%26"));
        let name: String = form_urlencoded::parse(pair.as_bytes())
            .next()
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        if url.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(url, name))
    }

    /// File name of the target, for display.
    pub fn name(&self) -> String {
        match self.target.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.target.display().to_string(),
        }
    }
}

/// Share link for a finished upload: `url` with the file name appended.
pub fn share_link(url: &str, name: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("{url}{NAME_QUERY}{encoded}")
}
