//! Document retrieval by URL.
//!
//! One attempt per call, bounded by the client timeout. Any transport failure
//! or non-2xx status is a `FetchError`; retry policy belongs to the caller.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;

use super::extraction::SourceDocument;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP client could not be built: {0}")]
    Client(String),

    #[error("Invalid document URL: {0}")]
    InvalidUrl(String),

    #[error("Download timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Could not connect to {0}")]
    Connection(String),

    #[error("Document server answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Download failed: {0}")]
    Transport(String),

    #[error("Could not read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Byte retrieval keyed by URL.
pub trait DocumentFetcher {
    fn fetch(&self, url: &str) -> Result<SourceDocument, FetchError>;
}

/// Blocking HTTP fetcher with a fixed timeout.
///
/// The reqwest blocking client owns a private runtime and must not be built
/// or torn down on an async worker thread, so it is created on first fetch.
/// Construction is therefore safe inside a tokio runtime.
pub struct HttpFetcher {
    client: OnceLock<reqwest::blocking::Client>,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: OnceLock::new(),
            timeout,
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, FetchError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(self.client.get_or_init(|| client))
    }

    fn classify_error(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            FetchError::Connection(url.to_string())
        } else if e.is_builder() {
            FetchError::InvalidUrl(url.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl DocumentFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<SourceDocument, FetchError> {
        tracing::debug!(url = %url, "Downloading document");

        let response = self
            .client()?
            .get(url)
            .send()
            .map_err(|e| self.classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .map_err(|e| self.classify_error(url, e))?;

        tracing::info!(
            url = %url,
            bytes = bytes.len(),
            content_type = content_type.as_deref().unwrap_or("unknown"),
            "Document downloaded"
        );

        Ok(SourceDocument::new(bytes.to_vec(), content_type))
    }
}

/// Read a local file into a `SourceDocument`, guessing the content type from
/// the extension. Magic bytes still win inside `SourceDocument`.
pub fn read_local_document(path: &Path) -> Result<SourceDocument, FetchError> {
    let bytes = std::fs::read(path).map_err(|source| FetchError::File {
        path: path.display().to_string(),
        source,
    })?;

    let content_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());

    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        content_type = content_type.as_deref().unwrap_or("unknown"),
        "Document read from disk"
    );

    Ok(SourceDocument::new(bytes, content_type))
}

// ── Mock for testing ──────────────────────────────────────

/// Fetcher that returns a canned document or a canned failure, and counts calls.
pub struct MockFetcher {
    response: Result<(Vec<u8>, Option<String>), u16>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn with_document(bytes: &[u8], content_type: Option<&str>) -> Self {
        Self {
            response: Ok((bytes.to_vec(), content_type.map(str::to_string))),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every fetch fails with the given HTTP status.
    pub fn failing(status: u16) -> Self {
        Self {
            response: Err(status),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentFetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<SourceDocument, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok((bytes, content_type)) => Ok(SourceDocument::new(bytes.clone(), content_type.clone())),
            Err(status) => Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            }),
        }
    }
}

impl<T: DocumentFetcher + ?Sized> DocumentFetcher for std::sync::Arc<T> {
    fn fetch(&self, url: &str) -> Result<SourceDocument, FetchError> {
        (**self).fetch(url)
    }
}
