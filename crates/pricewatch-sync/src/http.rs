//! HTTP download of supplier spreadsheets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tracing::info;

/// Browser-like agent; some file hosts refuse unknown clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
pub const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status} for {url}")]
    Server { status: u16, url: String },
    #[error("cannot save download: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloads supplier files into a working directory.
pub struct HttpFetcher {
    client: reqwest::Client,
    dest_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(dest_dir: &Path) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            dest_dir: dest_dir.to_path_buf(),
        })
    }

    /// GET `url` and store the body as `<base_name>_<YYYYmmdd_HHMMSS>.xlsx`.
    pub async fn download(&self, url: &str, base_name: &str) -> Result<PathBuf, FetchError> {
        info!(url, "downloading");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Server {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.bytes().await?;

        let dst = self.dest_dir.join(download_name(base_name));
        tokio::fs::create_dir_all(&self.dest_dir).await?;
        tokio::fs::write(&dst, &body).await?;
        info!(file = %dst.display(), bytes = body.len(), "downloaded");
        Ok(dst)
    }
}

fn download_name(base_name: &str) -> String {
    format!("{base_name}_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S"))
}
