//! # Tag Bridge Utilities
//!
//! Content fingerprinting used to tell a real configuration change apart from
//! the duplicate notifications a file watcher emits for one save.
//!
//! - Uses SHA-2 over the raw file bytes
//! - Retries reads that fail while another process still holds the file

use errors::FingerprintError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::debug;

/// SHA-256 digest of a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Compute the SHA-256 fingerprint of a byte buffer.
///
/// # Examples
///
/// ```
/// use utils::compute_content_hash;
///
/// let hash = compute_content_hash(b"hello world");
/// assert_eq!(hash.to_string().len(), 64);
/// ```
#[must_use]
pub fn compute_content_hash(content: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(digest.as_slice());
    Fingerprint(bytes)
}

/// How often, and how far apart, a fingerprint read is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// Fingerprint the file at `path`.
///
/// Transient read failures (file locked by the writer, interrupted reads) are
/// retried on a fixed interval. A missing file fails immediately.
pub async fn file_fingerprint(
    path: &Path,
    policy: &RetryPolicy,
) -> Result<Fingerprint, FingerprintError> {
    let display = path.display().to_string();
    fingerprint_with(&display, policy, || tokio::fs::read(path)).await
}

/// Up to `policy.attempts` calls of `read`, `policy.delay` apart, while the
/// failure is transient. The last error is returned once attempts run out.
async fn fingerprint_with<F, Fut>(
    display: &str,
    policy: &RetryPolicy,
    mut read: F,
) -> Result<Fingerprint, FingerprintError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<Vec<u8>>>,
{
    let strategy = FixedInterval::new(policy.delay).take(policy.attempts.saturating_sub(1));

    RetryIf::spawn(
        strategy,
        || {
            let pending = read();
            async move {
                let bytes = pending
                    .await
                    .map_err(|e| FingerprintError::from_io(display, e))?;
                Ok(compute_content_hash(&bytes))
            }
        },
        |e: &FingerprintError| {
            let transient = e.is_transient();
            if transient {
                let path = display;
                debug!(path = %path, error = %e, "Fingerprint read failed, retrying");
            }
            transient
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_compute_content_hash() {
        let hash1 = compute_content_hash(b"hello world");
        let hash2 = compute_content_hash(b"hello world");
        let hash3 = compute_content_hash(b"hello world!");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(
            hash1.to_string(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn test_file_fingerprint_tracks_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"OpcServer,GroupName,TagName\n").unwrap();
        file.flush().unwrap();

        let policy = RetryPolicy::default();
        let first = file_fingerprint(file.path(), &policy).await.unwrap();
        let again = file_fingerprint(file.path(), &policy).await.unwrap();
        assert_eq!(first, again);

        file.write_all(b"S,G,T\n").unwrap();
        file.flush().unwrap();
        let changed = file_fingerprint(file.path(), &policy).await.unwrap();
        assert_ne!(first, changed);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RetryPolicy {
            attempts: 5,
            delay: Duration::from_secs(3600),
        };
        let err = file_fingerprint(&dir.path().join("absent.csv"), &policy)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried_until_attempts_run_out() {
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_secs(2),
        };
        let started = tokio::time::Instant::now();
        let mut calls = 0;

        let err = fingerprint_with("locked.csv", &policy, || {
            calls += 1;
            let message = format!("locked {}", calls);
            async move {
                Err::<Vec<u8>, _>(io::Error::new(io::ErrorKind::PermissionDenied, message))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert!(err.is_transient());
        assert!(err.to_string().contains("locked 3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers() {
        let policy = RetryPolicy {
            attempts: 5,
            delay: Duration::from_secs(1),
        };
        let started = tokio::time::Instant::now();
        let mut calls = 0;

        let hash = fingerprint_with("busy.csv", &policy, || {
            calls += 1;
            let outcome = if calls < 3 {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "busy"))
            } else {
                Ok(b"S,G,T".to_vec())
            };
            async move { outcome }
        })
        .await
        .unwrap();

        assert_eq!(hash, compute_content_hash(b"S,G,T"));
        assert_eq!(calls, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let policy = RetryPolicy {
            attempts: 5,
            delay: Duration::from_secs(60),
        };
        let mut calls = 0;

        let err = fingerprint_with("bad.csv", &policy, || {
            calls += 1;
            async { Err::<Vec<u8>, _>(io::Error::new(io::ErrorKind::InvalidData, "bad")) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(!err.is_transient());
    }
}
