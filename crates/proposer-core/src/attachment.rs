//! Attachment ports and the photo download policy.
//!
//! Photos arrive as transport references (a URL or a local path). They are
//! fetched through a [`FileFetcher`], retried a configured number of times,
//! and persisted through an [`AttachmentStore`]. Only the relative path of
//! the stored file ever enters a catalog.

use std::future::Future;

use proposer_types::error::AttachmentError;
use tracing::warn;

/// Directory (relative to the content dir) holding engineer photos.
pub const PHOTO_DIR: &str = "engineers_photo";

/// Extension given to stored photos.
pub const PHOTO_EXTENSION: &str = "jpg";

/// Resolves a transport file reference to bytes.
pub trait FileFetcher: Send + Sync {
    fn fetch(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<Vec<u8>, AttachmentError>> + Send;
}

/// Persists attachment bytes under the content directory.
pub trait AttachmentStore: Send + Sync {
    /// Write `bytes` to a freshly named file in `dir` and return its path
    /// relative to the content directory (e.g. `engineers_photo/<id>.jpg`).
    fn store(
        &self,
        dir: &str,
        extension: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<String, AttachmentError>> + Send;
}

/// Fetch `reference`, retrying up to `retries` extra times on failure.
///
/// Returns the last error once every attempt failed. Rejected references
/// are never retried.
pub async fn fetch_with_retry<F: FileFetcher>(
    fetcher: &F,
    reference: &str,
    retries: u32,
) -> Result<Vec<u8>, AttachmentError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(reference).await {
            Ok(bytes) => return Ok(bytes),
            Err(e @ AttachmentError::Rejected(_)) => return Err(e),
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!(reference, attempt, error = %e, "attachment download failed, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fetch a photo and store it under [`PHOTO_DIR`], returning the relative path.
pub async fn save_photo<F: FileFetcher, S: AttachmentStore>(
    fetcher: &F,
    store: &S,
    reference: &str,
    retries: u32,
) -> Result<String, AttachmentError> {
    let bytes = fetch_with_retry(fetcher, reference, retries).await?;
    store.store(PHOTO_DIR, PHOTO_EXTENSION, &bytes).await
}
