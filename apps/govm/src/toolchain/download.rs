//! Archive retrieval over HTTP.
//!
//! ## Behaviour
//!
//! - Streams into `<scratch>/<archive>.tmp`, renamed to the final name on success
//! - A fixed number of attempts with exponential backoff and jitter
//! - A per-request timeout
//! - The finished file is read end to end as a tar.gz before it is returned
//! - A published `.sha256` sidecar is checked when the server has one

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::config::Settings;
use crate::errors::{GovmError, IoResultExt, Result};
use crate::toolchain::archive;
use crate::toolchain::platform::Platform;
use crate::toolchain::verify;
use crate::toolchain::version::ToolchainVersion;

/// User-Agent header for every request govm makes.
pub const USER_AGENT: &str = concat!("govm/", env!("CARGO_PKG_VERSION"));

/// Extension of Go release archives.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

const PARTIAL_SUFFIX: &str = ".tmp";

/// Base delay between retries in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Upper bound on the delay before jitter.
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Minimum interval between progress redraws.
const PROGRESS_INTERVAL_MS: u128 = 250;

/// A verified archive in the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub size: u64,
}

/// Source of release archives.
#[allow(async_fn_in_trait)]
pub trait ArchiveFetcher {
    /// Places the archive for `version` and `platform` into `scratch_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::DownloadFailed`] for network or HTTP failures and
    /// [`GovmError::CorruptArchive`] when the retrieved file fails verification.
    /// No partial file is left behind in either case.
    async fn fetch(
        &self,
        version: &ToolchainVersion,
        platform: Platform,
        scratch_dir: &Path,
    ) -> Result<FetchedArchive>;
}

/// Canonical archive file name, e.g. `go1.21.0.linux-amd64.tar.gz`.
#[must_use]
pub fn archive_name(version: &ToolchainVersion, platform: Platform) -> String {
    format!(
        "go{version}.{}-{}{ARCHIVE_EXTENSION}",
        platform.os.as_str(),
        platform.arch.as_str()
    )
}

/// Path of the in-progress download for `dest`.
#[must_use]
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

/// Downloads archives from a base URL such as `https://go.dev/dl`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
    base_url: String,
    attempts: u32,
    show_progress: bool,
}

impl HttpDownloader {
    /// Builds a downloader from resolved settings.
    ///
    /// Progress is drawn on stderr only when it is a terminal and `quiet` is
    /// false.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::DownloadFailed`] if the HTTP client cannot be built.
    pub fn new(settings: &Settings, quiet: bool) -> Result<Self> {
        let client = http_client(settings.timeout).map_err(|e| GovmError::DownloadFailed {
            url: settings.download_base_url.clone(),
            message: format!("failed to create HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            base_url: settings.download_base_url.clone(),
            attempts: settings.retries.max(1),
            show_progress: !quiet && std::io::stderr().is_terminal(),
        })
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url.trim_end_matches('/'))
    }

    async fn download_with_retries(&self, url: &str, dest: &Path) -> Result<()> {
        let partial = partial_path(dest);
        let mut last_error = String::new();

        for attempt in 0..self.attempts {
            if attempt > 0 {
                let delay = calculate_retry_delay(attempt);
                tracing::info!(attempt = attempt + 1, of = self.attempts, delay_ms = delay, "retrying download");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.download_once(url, &partial).await {
                Ok(bytes) => {
                    tokio::fs::rename(&partial, dest).await.io_context(|| {
                        format!("failed to rename {} to {}", partial.display(), dest.display())
                    })?;
                    tracing::debug!(url, bytes, "download complete");
                    return Ok(());
                }
                Err(Attempt::Fatal(message)) => {
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(GovmError::DownloadFailed {
                        url: url.to_string(),
                        message,
                    });
                }
                Err(Attempt::Retryable(message)) => {
                    tracing::warn!(url, attempt = attempt + 1, error = %message, "download attempt failed");
                    let _ = tokio::fs::remove_file(&partial).await;
                    last_error = message;
                }
            }
        }

        Err(GovmError::DownloadFailed {
            url: url.to_string(),
            message: format!("{last_error} (after {} attempts)", self.attempts),
        })
    }

    async fn download_once(&self, url: &str, dest: &Path) -> std::result::Result<u64, Attempt> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Attempt::Retryable(format!("failed to connect: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Attempt::Fatal("archive not published (HTTP 404)".to_string()));
        }
        if !status.is_success() {
            return Err(Attempt::Retryable(format!("HTTP error {status}")));
        }

        let total = response.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Attempt::Fatal(format!("failed to create {}: {e}", dest.display())))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let start = Instant::now();
        let mut last_draw = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Attempt::Retryable(format!("connection dropped: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Attempt::Fatal(format!("failed to write {}: {e}", dest.display())))?;
            downloaded += chunk.len() as u64;

            if self.show_progress && last_draw.elapsed().as_millis() >= PROGRESS_INTERVAL_MS {
                draw_progress(downloaded, total, start.elapsed().as_secs_f64());
                last_draw = Instant::now();
            }
        }
        file.flush()
            .await
            .map_err(|e| Attempt::Fatal(format!("failed to flush {}: {e}", dest.display())))?;

        if self.show_progress {
            draw_progress(downloaded, total, start.elapsed().as_secs_f64());
            eprintln!();
        }
        if total > 0 && downloaded != total {
            return Err(Attempt::Retryable(format!(
                "short read: {downloaded} of {total} bytes"
            )));
        }
        Ok(downloaded)
    }

    async fn published_checksum(&self, url: &str) -> Option<String> {
        let sidecar = format!("{url}.sha256");
        let response = match self.client.get(&sidecar).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(url = %sidecar, status = %response.status(), "no checksum published");
                return None;
            }
            Err(e) => {
                tracing::debug!(url = %sidecar, error = %e, "checksum lookup failed");
                return None;
            }
        };
        let body = response.text().await.ok()?;
        verify::parse_checksum_file(&body)
    }
}

enum Attempt {
    Retryable(String),
    Fatal(String),
}

impl ArchiveFetcher for HttpDownloader {
    async fn fetch(
        &self,
        version: &ToolchainVersion,
        platform: Platform,
        scratch_dir: &Path,
    ) -> Result<FetchedArchive> {
        let name = archive_name(version, platform);
        let url = self.url_for(&name);
        let dest = scratch_dir.join(&name);

        tokio::fs::create_dir_all(scratch_dir)
            .await
            .io_context(|| format!("failed to create {}", scratch_dir.display()))?;

        tracing::info!(%url, "downloading");
        self.download_with_retries(&url, &dest).await?;

        let checksum = self.published_checksum(&url).await;
        if let Err(e) = verify_fetched(&dest, checksum.as_deref()) {
            tracing::warn!(path = %dest.display(), error = %e, "removing archive that failed verification");
            let _ = std::fs::remove_file(&dest);
            return Err(e);
        }

        let size = std::fs::metadata(&dest)
            .io_context(|| format!("failed to stat {}", dest.display()))?
            .len();
        Ok(FetchedArchive { path: dest, size })
    }
}

/// Structural check, plus a digest comparison when one is known.
///
/// # Errors
///
/// Returns [`GovmError::CorruptArchive`] on any failure.
pub fn verify_fetched(path: &Path, checksum: Option<&str>) -> Result<()> {
    if let Some(expected) = checksum {
        verify::verify_checksum(path, expected)?;
        tracing::debug!(path = %path.display(), "checksum verified");
    }
    let summary = archive::inspect_tar_gz(path)?;
    tracing::debug!(path = %path.display(), entries = summary.entries, "archive verified");
    Ok(())
}

/// Builds the shared HTTP client.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(30)))
        .user_agent(USER_AGENT)
        .build()
}

/// Delay before retry `attempt` (1-based): 2s, 4s, ... up to a minute, with
/// +/- 25% jitter.
fn calculate_retry_delay(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(MAX_RETRY_DELAY_MS);
    let jitter_range = base_delay / 4;
    let jitter = rand::rng().random_range(0..=jitter_range * 2);
    base_delay - jitter_range + jitter
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn draw_progress(downloaded: u64, total: u64, elapsed_secs: f64) {
    let percent = if total > 0 {
        (downloaded as f64 / total as f64 * 100.0) as u8
    } else {
        0
    };
    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };
    eprint!(
        "\r{}/{} ({percent}%) {}/s     ",
        format_bytes(downloaded),
        format_bytes(total),
        format_bytes(speed as u64)
    );
    let _ = std::io::stderr().flush();
}

/// Formats a byte count with binary units.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
