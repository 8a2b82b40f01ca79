//! Filesystem adapters for Proposer.
//!
//! Implements the attachment ports from `proposer-core`: storing photo bytes
//! under the content directory and resolving transport file references.
//! Also resolves the data directory layout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use proposer_core::attachment::{AttachmentStore, FileFetcher};
use proposer_types::error::AttachmentError;
use uuid::Uuid;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PROPOSER_DATA_DIR` environment variable
/// 2. `~/.proposer`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PROPOSER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".proposer");
    }

    PathBuf::from(".proposer")
}

/// Directory holding stored attachments: `{data_dir}/content`.
pub fn content_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("content")
}

/// Directory rendered documents are written to by the terminal transport.
pub fn documents_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("documents")
}

/// Writes attachments under a content directory with random file names.
pub struct LocalAttachmentStore {
    root: PathBuf,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AttachmentStore for LocalAttachmentStore {
    async fn store(
        &self,
        dir: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, AttachmentError> {
        let relative = format!("{dir}/{}.{extension}", Uuid::new_v4());
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AttachmentError::Storage(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AttachmentError::Storage(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "stored attachment");
        Ok(relative)
    }
}

/// Which attachment references a transport may hand to the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Only `http(s)://` URLs. Used by network transports.
    UrlsOnly,
    /// URLs plus paths on the local filesystem. Used by the terminal.
    UrlsAndLocalFiles,
}

/// Resolves attachment references: `http(s)://` URLs with a bounded HTTP GET,
/// local paths only when the policy allows them.
pub struct AttachmentFetcher {
    client: reqwest::Client,
    policy: ReferencePolicy,
    max_bytes: u64,
}

impl AttachmentFetcher {
    /// `timeout` bounds each download end to end; bodies over `max_bytes`
    /// are rejected.
    pub fn new(
        policy: ReferencePolicy,
        timeout: Duration,
        max_bytes: u64,
    ) -> Result<Self, AttachmentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AttachmentError::Download(format!("http client: {e}")))?;
        Ok(Self {
            client,
            policy,
            max_bytes,
        })
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, AttachmentError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AttachmentError::Download(e.to_string()))?;

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(self.too_large(url));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AttachmentError::Download(e.to_string()))?
        {
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large(url));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn fetch_local(&self, path: &str) -> Result<Vec<u8>, AttachmentError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AttachmentError::Download(format!("{path}: {e}")))?;
        if metadata.len() > self.max_bytes {
            return Err(self.too_large(path));
        }
        tokio::fs::read(path)
            .await
            .map_err(|e| AttachmentError::Download(format!("{path}: {e}")))
    }

    fn too_large(&self, reference: &str) -> AttachmentError {
        AttachmentError::Rejected(format!("{reference}: larger than {} bytes", self.max_bytes))
    }
}

impl FileFetcher for AttachmentFetcher {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, AttachmentError> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return self.fetch_url(reference).await;
        }
        match self.policy {
            ReferencePolicy::UrlsAndLocalFiles => self.fetch_local(reference).await,
            ReferencePolicy::UrlsOnly => {
                tracing::warn!(reference, "rejected non-URL attachment reference");
                Err(AttachmentError::Rejected(
                    "only http(s) URLs are accepted".to_string(),
                ))
            }
        }
    }
}
