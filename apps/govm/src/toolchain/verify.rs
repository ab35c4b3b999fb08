//! SHA-256 verification of downloaded archives.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::{GovmError, IoResultExt, Result};

/// Checks `file_path` against a lowercase or uppercase hex digest.
///
/// # Errors
///
/// Returns [`GovmError::CorruptArchive`] on mismatch, or an I/O error if the
/// file cannot be read.
pub fn verify_checksum(file_path: &Path, expected: &str) -> Result<()> {
    let computed = compute_sha256(file_path)?;
    let expected = expected.trim().to_ascii_lowercase();
    if computed != expected {
        return Err(GovmError::CorruptArchive {
            path: file_path.to_path_buf(),
            message: format!("checksum mismatch: expected {expected}, got {computed}"),
        });
    }
    Ok(())
}

/// Returns the SHA-256 of a file as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .io_context(|| format!("failed to open {} for checksum", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buffer)
            .io_context(|| format!("failed to read {} for checksum", file_path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Extracts the digest from a `.sha256` sidecar body.
///
/// Accepts both a bare digest and the `sha256sum` format
/// (`<digest>  <file name>`).
#[must_use]
pub fn parse_checksum_file(body: &str) -> Option<String> {
    let digest = body.split_whitespace().next()?;
    (digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| digest.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // sha256("hello world")
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn compute_sha256_of_known_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.txt");
        std::fs::write(&path, "hello world").unwrap();
        assert_eq!(compute_sha256(&path).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn verify_accepts_uppercase_digest() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.txt");
        std::fs::write(&path, "hello world").unwrap();
        verify_checksum(&path, &HELLO_SHA256.to_uppercase()).unwrap();
    }

    #[test]
    fn mismatch_is_a_corrupt_archive() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.txt");
        std::fs::write(&path, "hello world!").unwrap();
        let err = verify_checksum(&path, HELLO_SHA256).unwrap_err();
        assert!(matches!(err, GovmError::CorruptArchive { .. }));
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = compute_sha256(Path::new("/nonexistent/archive.tar.gz")).unwrap_err();
        assert!(matches!(err, GovmError::Io { .. }));
    }

    #[test]
    fn sidecar_formats() {
        assert_eq!(parse_checksum_file(&format!("{HELLO_SHA256}\n")).as_deref(), Some(HELLO_SHA256));
        assert_eq!(
            parse_checksum_file(&format!("{HELLO_SHA256}  go1.21.0.linux-amd64.tar.gz\n")).as_deref(),
            Some(HELLO_SHA256)
        );
        assert_eq!(parse_checksum_file("<html>404</html>"), None);
        assert_eq!(parse_checksum_file(""), None);
    }
}
