//! Process-wide image cache keyed by resolved URL.
//!
//! The cache is an explicit object owned by the application context. Callers
//! asking for the same URL while a fetch is pending share that fetch instead of
//! issuing their own.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("image request to `{url}` returned status {status}")]
    Status { url: String, status: u16 },
    #[error("image request to `{url}` failed: {message}")]
    Transport { url: String, message: String },
    #[error("image request to `{url}` timed out")]
    Timeout { url: String },
    #[error("image load was cancelled")]
    Cancelled,
}

/// Raw bytes returned by an [`ImageFetcher`].
#[derive(Clone, Debug)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

/// Shared handle to cached image bytes; clones point at the same buffer.
#[derive(Clone)]
pub struct ImageHandle {
    url: Arc<str>,
    bytes: Bytes,
    content_type: Option<Arc<str>>,
}

impl ImageHandle {
    pub fn new(url: &str, image: FetchedImage) -> Self {
        Self {
            url: Arc::from(url),
            bytes: image.bytes,
            content_type: image.content_type.map(Arc::from),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn shares_data_with(&self, other: &ImageHandle) -> bool {
        self.bytes.as_ptr() == other.bytes.as_ptr() && self.bytes.len() == other.bytes.len()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("url", &self.url)
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.bytes == other.bytes
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub pending: usize,
    pub hits: u64,
    pub fetches: u64,
    pub coalesced: u64,
}

type FetchCell = Arc<OnceCell<Result<ImageHandle, FetchError>>>;

struct PendingFetch {
    cell: FetchCell,
    waiters: usize,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, ImageHandle>,
    pending: HashMap<String, PendingFetch>,
    generation: u64,
    hits: u64,
    fetches: u64,
    coalesced: u64,
}

pub struct ImageCache {
    fetcher: Arc<dyn ImageFetcher>,
    state: Mutex<CacheState>,
}

impl ImageCache {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { fetcher, state: Mutex::new(CacheState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached handle for `resolved_url`, fetching it on first use.
    ///
    /// Failures are returned to every waiting caller and are not cached.
    pub async fn get(&self, resolved_url: &str) -> Result<ImageHandle, FetchError> {
        let (guard, generation) = {
            let mut state = self.lock();
            if let Some(handle) = state.entries.get(resolved_url).cloned() {
                state.hits += 1;
                return Ok(handle);
            }

            let generation = state.generation;
            let cell = match state.pending.get_mut(resolved_url) {
                Some(pending) => {
                    pending.waiters += 1;
                    let cell = Arc::clone(&pending.cell);
                    state.coalesced += 1;
                    debug!(
                        event_name = "images.cache.coalesced",
                        url = resolved_url,
                        "joining pending image fetch"
                    );
                    cell
                }
                None => {
                    let cell: FetchCell = Arc::new(OnceCell::new());
                    let pending = PendingFetch { cell: Arc::clone(&cell), waiters: 1 };
                    state.pending.insert(resolved_url.to_owned(), pending);
                    cell
                }
            };
            (PendingGuard { cache: self, url: resolved_url, cell }, generation)
        };

        let outcome = guard.cell.get_or_init(|| self.fetch(resolved_url)).await.clone();

        if let Ok(handle) = &outcome {
            let mut state = self.lock();
            // a clear() since this fetch started means the result is stale
            if state.generation == generation {
                state.entries.entry(resolved_url.to_owned()).or_insert_with(|| handle.clone());
            }
        }
        drop(guard);

        outcome
    }

    async fn fetch(&self, url: &str) -> Result<ImageHandle, FetchError> {
        self.lock().fetches += 1;
        debug!(event_name = "images.cache.fetch", url, "fetching image");

        match self.fetcher.fetch(url).await {
            Ok(image) => Ok(ImageHandle::new(url, image)),
            Err(error) => {
                warn!(
                    event_name = "images.cache.fetch_failed",
                    url,
                    error = %error,
                    "image fetch failed"
                );
                Err(error)
            }
        }
    }

    pub fn peek(&self, resolved_url: &str) -> Option<ImageHandle> {
        self.lock().entries.get(resolved_url).cloned()
    }

    pub fn contains(&self, resolved_url: &str) -> bool {
        self.lock().entries.contains_key(resolved_url)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Drops every cached handle and forgets pending fetches.
    pub fn clear(&self) {
        let mut state = self.lock();
        let released = state.entries.len();
        state.entries.clear();
        state.pending.clear();
        state.generation += 1;
        info!(event_name = "images.cache.cleared", released, "image cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            pending: state.pending.len(),
            hits: state.hits,
            fetches: state.fetches,
            coalesced: state.coalesced,
        }
    }
}

/// One caller's claim on a pending fetch.
///
/// Runs on completion and when the `get` future is dropped, so abandoned
/// fetches do not stay registered.
struct PendingGuard<'a> {
    cache: &'a ImageCache,
    url: &'a str,
    cell: FetchCell,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        let release = match state.pending.get_mut(self.url) {
            Some(pending) if Arc::ptr_eq(&pending.cell, &self.cell) => {
                pending.waiters = pending.waiters.saturating_sub(1);
                pending.waiters == 0 || self.cell.initialized()
            }
            _ => false,
        };
        if release {
            state.pending.remove(self.url);
        }
    }
}

impl fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCache").field("stats", &self.stats()).finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::{FetchError, FetchedImage, ImageFetcher};

    /// Serves canned bytes per URL after an optional delay and counts calls.
    #[derive(Default)]
    pub struct FakeFetcher {
        responses: Mutex<HashMap<String, Result<Bytes, u16>>>,
        delays: Mutex<HashMap<String, Duration>>,
        calls: Mutex<Vec<String>>,
        total: AtomicUsize,
    }

    impl FakeFetcher {
        pub fn serving(self, url: &str, body: &'static [u8]) -> Self {
            self.responses
                .lock()
                .expect("responses lock")
                .insert(url.to_owned(), Ok(Bytes::from_static(body)));
            self
        }

        pub fn failing(self, url: &str, status: u16) -> Self {
            self.responses.lock().expect("responses lock").insert(url.to_owned(), Err(status));
            self
        }

        pub fn delayed(self, url: &str, delay: Duration) -> Self {
            self.delays.lock().expect("delays lock").insert(url.to_owned(), delay);
            self
        }

        pub fn total_calls(&self) -> usize {
            self.total.load(Ordering::SeqCst)
        }

        pub fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().expect("calls lock").iter().filter(|call| *call == url).count()
        }
    }

    #[async_trait]
    impl ImageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
            self.total.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().expect("calls lock").push(url.to_owned());

            let delay = self.delays.lock().expect("delays lock").get(url).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let response = self.responses.lock().expect("responses lock").get(url).cloned();
            match response {
                Some(Ok(bytes)) => {
                    // copy so every fetch yields a distinct buffer
                    let owned = Bytes::from(bytes.to_vec());
                    Ok(FetchedImage { bytes: owned, content_type: Some("image/jpeg".to_owned()) })
                }
                Some(Err(status)) => Err(FetchError::Status { url: url.to_owned(), status }),
                None => Err(FetchError::Status { url: url.to_owned(), status: 404 }),
            }
        }
    }
}
