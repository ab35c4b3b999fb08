//! Latest-version lookup.
//!
//! The index at `https://go.dev/VERSION?m=text` answers with the newest
//! release on its first line:
//!
//! ```text
//! go1.23.1
//! time 2024-08-29T20:56:24Z
//! ```
//!
//! Every call re-queries the index; nothing is cached.

use std::time::Duration;

use crate::config::Settings;
use crate::errors::{GovmError, Result};
use crate::toolchain::download::http_client;
use crate::toolchain::version::{ToolchainVersion, extract_first_version};

/// Upper bound on an index query, independent of the download timeout.
const INDEX_TIMEOUT_SECS: u64 = 30;

/// Client for the remote version index.
#[derive(Debug, Clone)]
pub struct RemoteOracle {
    client: reqwest::Client,
    index_url: String,
}

impl RemoteOracle {
    /// # Errors
    ///
    /// Returns [`GovmError::RemoteUnavailable`] if the HTTP client cannot be built.
    pub fn new(settings: &Settings) -> Result<Self> {
        let timeout = settings.timeout.min(Duration::from_secs(INDEX_TIMEOUT_SECS));
        let client = http_client(timeout)
            .map_err(|e| GovmError::remote_unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            index_url: settings.version_index_url.clone(),
        })
    }

    /// Fetches the newest published version.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::RemoteUnavailable`] when the request fails, the
    /// server answers with an error status, or the body holds no version.
    pub async fn latest_version(&self) -> Result<ToolchainVersion> {
        let url = &self.index_url;
        tracing::debug!(%url, "querying latest version");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GovmError::remote_unavailable(format!("failed to reach {url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GovmError::remote_unavailable(format!("HTTP error {status} from {url}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| GovmError::remote_unavailable(format!("failed to read {url}: {e}")))?;

        let version = parse_index(&body)
            .ok_or_else(|| GovmError::remote_unavailable(format!("no version found at {url}")))?;
        tracing::info!(%version, "latest version");
        Ok(version)
    }
}

/// Extracts the first version-shaped token from an index body.
#[must_use]
pub fn parse_index(body: &str) -> Option<ToolchainVersion> {
    extract_first_version(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides};
    use crate::toolchain::testing::serve;

    fn oracle(index_url: String) -> RemoteOracle {
        let file = FileConfig {
            version_index_url: Some(index_url),
            timeout_secs: Some(5),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(file, &Overrides::default(), |_| None, None).unwrap();
        RemoteOracle::new(&settings).unwrap()
    }

    #[test]
    fn parse_index_reads_first_line() {
        let body = "go1.23.1\ntime 2024-08-29T20:56:24Z\n";
        assert_eq!(parse_index(body), ToolchainVersion::parse("1.23.1").ok());
    }

    #[tokio::test]
    async fn latest_version_from_server() {
        let base = serve(vec![(
            "/VERSION?m=text".to_string(),
            200,
            b"go1.23.1\ntime 2024-08-29T20:56:24Z\n".to_vec(),
        )]);
        let latest = oracle(format!("{base}/VERSION?m=text")).latest_version().await.unwrap();
        assert_eq!(latest.to_string(), "1.23.1");
    }

    #[tokio::test]
    async fn body_without_version_is_unavailable() {
        let base = serve(vec![("/VERSION".to_string(), 200, b"<html>hello</html>".to_vec())]);
        let err = oracle(format!("{base}/VERSION")).latest_version().await.unwrap_err();
        assert!(matches!(err, GovmError::RemoteUnavailable { .. }), "{err}");
    }

    #[tokio::test]
    async fn error_status_is_unavailable() {
        let base = serve(vec![("/VERSION".to_string(), 503, b"go1.23.1".to_vec())]);
        let err = oracle(format!("{base}/VERSION")).latest_version().await.unwrap_err();
        assert!(err.to_string().contains("503"), "{err}");
    }

    #[tokio::test]
    async fn unreachable_index_is_unavailable() {
        let err = oracle("http://127.0.0.1:9/VERSION".to_string())
            .latest_version()
            .await
            .unwrap_err();
        assert!(matches!(err, GovmError::RemoteUnavailable { .. }));
    }
}
