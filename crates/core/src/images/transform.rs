use url::Url;

use crate::config::ImageConfig;

/// Query parameters owned by the CDN transform; anything else is preserved.
const TRANSFORM_PARAMS: [&str; 4] = ["w", "auto", "cs", "dpr"];

/// Requests at or above this quality get the untouched asset.
pub const FULL_QUALITY_THRESHOLD: u8 = 90;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageRequest {
    pub quality: u8,
    pub width: Option<u32>,
    pub priority: bool,
}

impl ImageRequest {
    pub fn new(quality: u8) -> Self {
        Self { quality, width: None, priority: false }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    pub fn wants_original(&self) -> bool {
        self.priority || self.quality >= FULL_QUALITY_THRESHOLD
    }
}

/// Rewrites image URLs for the one CDN that understands size/quality hints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUrlPolicy {
    cdn_host: String,
    device_pixel_ratio: u8,
    placeholder_width: u32,
    placeholder_quality: u8,
}

impl ImageUrlPolicy {
    pub fn new(cdn_host: impl Into<String>) -> Self {
        Self {
            cdn_host: cdn_host.into().to_ascii_lowercase(),
            device_pixel_ratio: 1,
            placeholder_width: 100,
            placeholder_quality: 20,
        }
    }

    pub fn from_config(config: &ImageConfig) -> Self {
        Self {
            cdn_host: config.cdn_host.to_ascii_lowercase(),
            device_pixel_ratio: config.device_pixel_ratio,
            placeholder_width: config.placeholder_width,
            placeholder_quality: config.placeholder_quality,
        }
    }

    pub fn cdn_host(&self) -> &str {
        &self.cdn_host
    }

    pub fn is_cdn_url(&self, src: &str) -> bool {
        Url::parse(src).map(|url| self.is_cdn(&url)).unwrap_or(false)
    }

    fn is_cdn(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| host.eq_ignore_ascii_case(&self.cdn_host))
    }

    /// Resolved URL for `src` under `request`.
    ///
    /// Unrecognized origins, unparseable URLs and full-quality requests come
    /// back unchanged.
    pub fn resolve(&self, src: &str, request: &ImageRequest) -> String {
        if request.wants_original() {
            return src.to_owned();
        }

        let Ok(mut url) = Url::parse(src) else {
            return src.to_owned();
        };
        if !self.is_cdn(&url) {
            return src.to_owned();
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !TRANSFORM_PARAMS.contains(&key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (key, value) in &kept {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("auto", "compress");
            pairs.append_pair("cs", "tinysrgb");
            if let Some(width) = request.width {
                pairs.append_pair("w", &width.to_string());
            }
            pairs.append_pair("dpr", &self.device_pixel_ratio.to_string());
        }

        url.to_string()
    }

    /// Low-quality blur-up variant, never wider than the placeholder cap.
    pub fn placeholder(&self, src: &str, width: Option<u32>) -> String {
        let width = width.map_or(self.placeholder_width, |width| width.min(self.placeholder_width));
        self.resolve(src, &ImageRequest::new(self.placeholder_quality).with_width(width))
    }
}

impl Default for ImageUrlPolicy {
    fn default() -> Self {
        Self::new(super::DEFAULT_CDN_HOST)
    }
}
