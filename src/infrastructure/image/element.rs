//! Image elements that fetch and decode real bitmaps.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::domain::errors::DecodeError;
use crate::domain::ports::{FetchRequest, ImageElement, LoadSignal};

/// Errors that can occur while fetching image bytes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The request carried no usable URL.
    #[error("No source to fetch")]
    NoSource,
    /// Network error during download.
    #[error("Network error: {0}")]
    Network(String),
    /// I/O error reading a local file.
    #[error("IO error: {0}")]
    Io(String),
}

/// Element that downloads `http(s)` sources or reads local paths, then
/// decodes the bytes with the `image` crate.
///
/// A failed fetch is logged and leaves the load signal unfired, so the
/// placeholder stays visible.
pub struct FetchingImageElement {
    http_client: reqwest::Client,
    bytes: Arc<Mutex<Option<Bytes>>>,
    fetch_task: Mutex<Option<JoinHandle<()>>>,
}

impl FetchingImageElement {
    /// Creates an element whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            bytes: Arc::new(Mutex::new(None)),
            fetch_task: Mutex::new(None),
        })
    }

    /// Returns true once bytes have been fetched.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.bytes.lock().is_some()
    }

    async fn fetch(http_client: &reqwest::Client, url: &str) -> Result<Bytes, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = http_client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Network(format!("Request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(FetchError::Network(format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.status().canonical_reason().unwrap_or("Unknown")
                )));
            }

            return response
                .bytes()
                .await
                .map_err(|e| FetchError::Network(format!("Failed to read body: {e}")));
        }

        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| FetchError::Io(format!("Failed to read {}: {e}", path.display())))
    }
}

impl std::fmt::Debug for FetchingImageElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchingImageElement")
            .field("has_data", &self.has_data())
            .finish_non_exhaustive()
    }
}

impl Drop for FetchingImageElement {
    fn drop(&mut self) {
        if let Some(task) = self.fetch_task.lock().take() {
            task.abort();
        }
    }
}

#[async_trait::async_trait]
impl ImageElement for FetchingImageElement {
    fn begin_fetch(&self, request: FetchRequest, on_load: LoadSignal) {
        let Some(url) = request.sources.primary_url().map(String::from) else {
            warn!(key = %request.key, error = %FetchError::NoSource, "Image fetch skipped");
            return;
        };

        *self.bytes.lock() = None;
        let http_client = self.http_client.clone();
        let bytes = self.bytes.clone();
        let key = request.key;

        debug!(key = %key, url = %url, "Fetching image");
        let task = tokio::spawn(async move {
            match Self::fetch(&http_client, &url).await {
                Ok(data) => {
                    trace!(key = %key, size = data.len(), "Image bytes received");
                    *bytes.lock() = Some(data);
                    on_load.fire();
                }
                Err(e) => warn!(key = %key, error = %e, "Image fetch failed"),
            }
        });

        if let Some(previous) = self.fetch_task.lock().replace(task) {
            previous.abort();
        }
    }

    async fn decode(&self) -> Result<(), DecodeError> {
        let data = self.bytes.lock().clone().ok_or(DecodeError::NoData)?;

        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&data))
            .await
            .map_err(|e| DecodeError::aborted(format!("Decode task panicked: {e}")))?
            .map_err(|e| DecodeError::malformed(e.to_string()))?;

        trace!(
            width = decoded.width(),
            height = decoded.height(),
            "Image decoded"
        );
        Ok(())
    }
}

/// Element that signals load immediately without any I/O.
/// Used for dry runs where only the reveal sequence matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantImageElement;

#[async_trait::async_trait]
impl ImageElement for InstantImageElement {
    fn begin_fetch(&self, request: FetchRequest, on_load: LoadSignal) {
        trace!(key = %request.key, "Instant load");
        on_load.fire();
    }

    async fn decode(&self) -> Result<(), DecodeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ImageSources, ResourceKey};
    use tokio::sync::mpsc;

    fn png_bytes() -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(4, 3)
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    fn request(path: &std::path::Path) -> FetchRequest {
        let sources = ImageSources::from_src(path.display().to_string());
        FetchRequest {
            key: ResourceKey::from_sources(&sources),
            sources,
        }
    }

    fn signal() -> (LoadSignal, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            LoadSignal::new(move || {
                let _ = tx.send(());
            }),
            rx,
        )
    }

    #[tokio::test]
    async fn test_local_fetch_and_decode() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("tiny.png");
        std::fs::write(&path, png_bytes())?;

        let element = FetchingImageElement::new(Duration::from_secs(5))?;
        let (on_load, mut rx) = signal();
        element.begin_fetch(request(&path), on_load);

        assert!(rx.recv().await.is_some());
        assert!(element.has_data());
        tokio_test::assert_ok!(element.decode().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_bytes_fail_decode() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png")?;

        let element = FetchingImageElement::new(Duration::from_secs(5))?;
        let (on_load, mut rx) = signal();
        element.begin_fetch(request(&path), on_load);
        assert!(rx.recv().await.is_some());

        let result = element.decode().await;
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_never_signals() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("absent.png");

        let element = FetchingImageElement::new(Duration::from_secs(5))?;
        let (on_load, mut rx) = signal();
        element.begin_fetch(request(&path), on_load);

        let waited = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        // Either still pending or the sender was dropped with the failed task.
        assert!(!matches!(waited, Ok(Some(()))));
        assert_eq!(element.decode().await, Err(DecodeError::NoData));
        Ok(())
    }

    #[tokio::test]
    async fn test_instant_element_signals_synchronously() {
        let (on_load, mut rx) = signal();
        InstantImageElement.begin_fetch(
            FetchRequest {
                key: ResourceKey::new("k"),
                sources: ImageSources::from_src("/a.png"),
            },
            on_load,
        );
        assert!(rx.try_recv().is_ok());
        assert!(InstantImageElement.decode().await.is_ok());
    }
}
