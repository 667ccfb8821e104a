//! Where page HTML comes from.

use std::future::Future;
use std::path::PathBuf;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use valuelist_shared::{FetchConfig, Result, ValueListError};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// A provider of raw page HTML.
pub trait PageSource {
    /// Fetch the current HTML for `url`.
    fn fetch_html(&self, url: &Url) -> impl Future<Output = Result<String>> + Send;

    /// Short name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Fetches pages over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Build a client from the fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ValueListError::fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    #[instrument(skip(self), fields(%url))]
    async fn fetch_html(&self, url: &Url) -> Result<String> {
        debug!("fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ValueListError::fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(error = %e, "could not read error response body");
                    String::new()
                }
            };
            return Err(ValueListError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ValueListError::fetch(format!("{url}: body read failed: {e}")))?;

        debug!(status = status.as_u16(), bytes = body.len(), "page fetched");
        Ok(body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Serves a saved HTML file regardless of the URL asked for.
///
/// Used to re-run the pipeline against a snapshot from a failed run.
#[derive(Debug, Clone)]
pub struct FilePageSource {
    path: PathBuf,
}

impl FilePageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PageSource for FilePageSource {
    async fn fetch_html(&self, url: &Url) -> Result<String> {
        debug!(path = ?self.path, %url, "reading page from file");
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ValueListError::io(&self.path, e))
    }

    fn name(&self) -> &str {
        "file"
    }
}
