//! Content fetcher: URL (or local file) in, bounded plain text out.

mod html;

pub use html::{collapse_whitespace, html_title, html_to_text, looks_like_html, truncate_chars};

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::http_client::HttpClient;

/// Largest body we are willing to download.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Errors that make a document unavailable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("Document too large: {0} bytes")]
    TooLarge(u64),

    #[error("Document has no text")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Network-level failures that a later run may succeed on.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}

/// Cleaned text of one document. Never persisted.
#[derive(Debug, Clone)]
pub struct RawDocumentText {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    /// Characters before truncation.
    pub original_chars: usize,
}

impl RawDocumentText {
    /// Clean a fetched body. HTML is rendered to text, anything else only has
    /// its whitespace collapsed.
    pub fn from_body(url: &str, body: &str, is_html: bool, max_chars: usize) -> Self {
        let (title, cleaned) = if is_html {
            (html_title(body), html_to_text(body))
        } else {
            (None, collapse_whitespace(body))
        };
        let original_chars = cleaned.chars().count();
        let text = truncate_chars(&cleaned, max_chars).to_string();
        Self {
            url: url.to_string(),
            title,
            text,
            original_chars,
        }
    }

    pub fn was_truncated(&self) -> bool {
        self.original_chars > self.text.chars().count()
    }
}

/// Fetches documents through the shared, rate-limited [`HttpClient`].
#[derive(Clone)]
pub struct ContentFetcher {
    client: HttpClient,
    max_chars: usize,
}

impl ContentFetcher {
    pub fn new(client: HttpClient, max_chars: usize) -> Self {
        Self { client, max_chars }
    }

    /// GET a document and clean it. Non-2xx responses are unavailable.
    pub async fn fetch(&self, url: &str) -> Result<RawDocumentText, FetchError> {
        let mut response = self.client.get(url).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status.as_u16(),
                url: url.to_string(),
            });
        }
        if let Some(length) = response.content_length() {
            if length > MAX_BODY_BYTES {
                return Err(FetchError::TooLarge(length));
            }
        }

        let content_type = response.content_type().unwrap_or("").to_lowercase();
        if content_type.starts_with("application/pdf")
            || content_type.starts_with("image/")
            || content_type.starts_with("application/zip")
        {
            return Err(FetchError::UnsupportedContent(content_type));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            append_capped(&mut body, &chunk, MAX_BODY_BYTES)?;
        }
        let body = String::from_utf8_lossy(&body);
        let is_html = content_type.contains("html") || looks_like_html(&body);
        let document = RawDocumentText::from_body(url, &body, is_html, self.max_chars);
        debug!(
            "Fetched {} ({} chars{})",
            url,
            document.text.len(),
            if document.was_truncated() { ", truncated" } else { "" }
        );

        if document.text.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(document)
    }

    /// Fetch `location`: a `file://` URL or existing local path is read from
    /// disk, anything else goes over HTTP.
    pub async fn load(&self, location: &str) -> Result<RawDocumentText, FetchError> {
        if let Some(path) = local_path(location) {
            return self.read_file(&path).await;
        }
        self.fetch(location).await
    }

    /// Read a local file (operator debugging).
    pub async fn read_file(&self, path: &Path) -> Result<RawDocumentText, FetchError> {
        let body = tokio::fs::read_to_string(path).await?;
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("htm") || ext.eq_ignore_ascii_case("html"))
            || looks_like_html(&body);
        let document = RawDocumentText::from_body(
            &path.display().to_string(),
            &body,
            is_html,
            self.max_chars,
        );
        if document.text.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(document)
    }
}

/// Append one body chunk, failing once the total passes `cap`. Covers
/// chunked responses that carry no `Content-Length`.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], cap: u64) -> Result<(), FetchError> {
    let total = (body.len() + chunk.len()) as u64;
    if total > cap {
        return Err(FetchError::TooLarge(total));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

fn local_path(location: &str) -> Option<PathBuf> {
    if location.starts_with("file:") {
        return Url::parse(location).ok()?.to_file_path().ok();
    }
    if location.contains("://") {
        return None;
    }
    let path = PathBuf::from(location);
    path.exists().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_truncates_after_cleaning() {
        let body = "<html><body><p>alpha</p>\n\n<p>beta gamma</p></body></html>";
        let doc = RawDocumentText::from_body("https://x.test/a.htm", body, true, 10);
        assert_eq!(doc.text, "alpha beta");
        assert_eq!(doc.original_chars, "alpha beta gamma".len());
        assert!(doc.was_truncated());
    }

    #[test]
    fn test_plain_text_body() {
        let doc = RawDocumentText::from_body("file.txt", "  NPV   of\t$1 ", false, 1000);
        assert_eq!(doc.text, "NPV of $1");
        assert_eq!(doc.title, None);
        assert!(!doc.was_truncated());
    }

    #[test]
    fn test_streamed_body_is_capped() {
        let mut body = Vec::new();
        append_capped(&mut body, b"0123456789", 16).unwrap();
        append_capped(&mut body, b"abcdef", 16).unwrap();
        assert_eq!(body.len(), 16);

        let err = append_capped(&mut body, b"x", 16).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge(17)));
        assert!(!err.is_transient());
        assert_eq!(body.len(), 16);
    }

    #[test]
    fn test_transient_classification() {
        let status = FetchError::Status {
            status: 503,
            url: "https://www.sec.gov/x".into(),
        };
        assert!(status.is_transient());
        assert!(!FetchError::Empty.is_transient());
        assert!(!FetchError::UnsupportedContent("application/pdf".into()).is_transient());
    }

    #[tokio::test]
    async fn test_load_reads_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.htm");
        std::fs::write(
            &path,
            "<html><head><title>Report</title></head><body><p>NPV</p></body></html>",
        )
        .unwrap();

        let client = HttpClient::new(
            std::time::Duration::from_secs(5),
            crate::rate_limit::RateLimiter::new(),
            None,
        )
        .unwrap();
        let fetcher = ContentFetcher::new(client, 1000);
        let url = Url::from_file_path(&path).unwrap().to_string();

        let doc = fetcher.load(&url).await.unwrap();
        assert_eq!(doc.title.as_deref(), Some("Report"));
        assert_eq!(doc.text, "NPV");
        assert!(local_path("https://www.sec.gov/x").is_none());
    }
}
