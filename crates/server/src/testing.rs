use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tuhfa_core::images::{FetchError, FetchedImage, ImageFetcher};

/// In-memory origin: known URLs return their bytes, anything else is a 404.
#[derive(Default)]
pub struct StaticFetcher {
    images: HashMap<String, &'static [u8]>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn with_image(mut self, url: &str, body: &'static [u8]) -> Self {
        self.images.insert(url.to_owned(), body);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.images.get(url) {
            Some(body) => Ok(FetchedImage {
                bytes: Bytes::from_static(body),
                content_type: Some("image/jpeg".to_owned()),
            }),
            None => Err(FetchError::Status { url: url.to_owned(), status: 404 }),
        }
    }
}
