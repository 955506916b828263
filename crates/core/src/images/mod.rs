//! Image delivery: URL quality policy, shared fetch cache and the per-image
//! loading lifecycle.

mod cache;
mod loader;
mod transform;

pub use cache::{CacheStats, FetchError, FetchedImage, ImageCache, ImageFetcher, ImageHandle};
pub use loader::{
    transition, ImageAction, ImageContext, ImageEvent, ImageInstance, ImageOptions, ImageState,
    ImageTransition, ImageTransitionError, ImageView, LoadOutcome,
};
pub use transform::{ImageRequest, ImageUrlPolicy, FULL_QUALITY_THRESHOLD};

/// The only origin that understands the size/quality query hints
pub const DEFAULT_CDN_HOST: &str = "images.pexels.com";

pub const DEFAULT_QUALITY: u8 = 75;

/// Shown in place of an image that could not be loaded
pub const PLACEHOLDER_GLYPH: &str = "🎁";
