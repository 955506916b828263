//! Loading lifecycle of a single rendered image.
//!
//! `transition` is the pure state machine; [`ImageInstance`] drives it against
//! an [`ImageCache`] and owns the cancellation token that teardown fires.

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::cache::{FetchError, ImageCache, ImageHandle};
use super::transform::{ImageRequest, ImageUrlPolicy};
use super::{DEFAULT_QUALITY, PLACEHOLDER_GLYPH};
use crate::domain::product::Product;
use crate::locale::Locale;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageState {
    Idle,
    Loading,
    Loaded,
    Error,
}

impl ImageState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Error)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageEvent {
    BecameVisible,
    PlaceholderReady,
    PrimaryLoaded,
    PrimaryFailed,
    FallbackLoaded,
    FallbackFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageAction {
    FetchPrimary,
    FetchPlaceholder,
    ShowPlaceholder,
    HidePlaceholder,
    FetchFallback,
    ShowErrorGlyph,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageContext {
    pub blur_up: bool,
    pub has_fallback: bool,
    pub fallback_attempted: bool,
    pub placeholder_visible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageTransition {
    pub from: ImageState,
    pub to: ImageState,
    pub event: ImageEvent,
    pub actions: Vec<ImageAction>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ImageTransitionError {
    #[error("image is already {state:?}; {event:?} ignored")]
    Terminal { state: ImageState, event: ImageEvent },
    #[error("invalid image transition from {state:?} using event {event:?}")]
    InvalidEvent { state: ImageState, event: ImageEvent },
}

pub fn transition(
    current: ImageState,
    event: ImageEvent,
    context: &ImageContext,
) -> Result<ImageTransition, ImageTransitionError> {
    use ImageAction::{
        FetchFallback, FetchPlaceholder, FetchPrimary, HidePlaceholder, ShowErrorGlyph,
        ShowPlaceholder,
    };
    use ImageEvent::{
        BecameVisible, FallbackFailed, FallbackLoaded, PlaceholderReady, PrimaryFailed,
        PrimaryLoaded,
    };
    use ImageState::{Error, Idle, Loaded, Loading};

    if current.is_terminal() {
        return Err(ImageTransitionError::Terminal { state: current, event });
    }

    let hide_placeholder =
        if context.placeholder_visible { vec![HidePlaceholder] } else { Vec::new() };

    let (to, actions) = match (current, event) {
        (Idle, BecameVisible) => {
            let mut actions = vec![FetchPrimary];
            if context.blur_up {
                actions.push(FetchPlaceholder);
            }
            (Loading, actions)
        }
        (Loading, BecameVisible) => (Loading, Vec::new()),
        (Loading, PlaceholderReady) => {
            if context.blur_up && !context.placeholder_visible {
                (Loading, vec![ShowPlaceholder])
            } else {
                (Loading, Vec::new())
            }
        }
        (Loading, PrimaryLoaded) => (Loaded, hide_placeholder),
        (Loading, PrimaryFailed) if context.has_fallback && !context.fallback_attempted => {
            (Loading, vec![FetchFallback])
        }
        (Loading, PrimaryFailed) => {
            let mut actions = hide_placeholder;
            actions.push(ShowErrorGlyph);
            (Error, actions)
        }
        (Loading, FallbackLoaded) if context.fallback_attempted => (Loaded, hide_placeholder),
        (Loading, FallbackFailed) if context.fallback_attempted => {
            let mut actions = hide_placeholder;
            actions.push(ShowErrorGlyph);
            (Error, actions)
        }
        _ => return Err(ImageTransitionError::InvalidEvent { state: current, event }),
    };

    Ok(ImageTransition { from: current, to, event, actions })
}

/// Display options for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageOptions {
    pub src: String,
    pub alt: String,
    pub quality: u8,
    pub width: Option<u32>,
    pub aspect_ratio: Option<f32>,
    pub priority: bool,
    pub blur_up: bool,
    pub fallback: Option<String>,
}

impl ImageOptions {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
            quality: DEFAULT_QUALITY,
            width: None,
            aspect_ratio: None,
            priority: false,
            blur_up: false,
            fallback: None,
        }
    }

    /// Card image for `product`: localized alt text, blur-up, square frame.
    pub fn for_product(product: &Product, locale: Locale, fallback: Option<&str>) -> Self {
        let mut options = Self::new(product.image_url.clone(), product.name(locale))
            .with_blur_up(true)
            .with_aspect_ratio(1.0);
        options.fallback = fallback.map(str::to_owned);
        options
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = Some(aspect_ratio);
        self
    }

    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_blur_up(mut self, blur_up: bool) -> Self {
        self.blur_up = blur_up;
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn request(&self) -> ImageRequest {
        let request = ImageRequest::new(self.quality).with_priority(self.priority);
        match self.width {
            Some(width) => request.with_width(width),
            None => request,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    Loaded,
    Failed(FetchError),
    Cancelled,
    NotVisible,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImageView<'a> {
    Skeleton,
    Blurred(&'a ImageHandle),
    Full(&'a ImageHandle),
    Broken { glyph: &'static str, alt: &'a str },
}

pub struct ImageInstance {
    alt: String,
    aspect_ratio: Option<f32>,
    primary_url: String,
    placeholder_url: Option<String>,
    fallback_url: Option<String>,
    state: ImageState,
    context: ImageContext,
    placeholder: Option<ImageHandle>,
    image: Option<ImageHandle>,
    last_error: Option<FetchError>,
    cancel: CancellationToken,
}

impl ImageInstance {
    pub fn new(options: ImageOptions, policy: &ImageUrlPolicy) -> Self {
        let request = options.request();
        let primary_url = policy.resolve(&options.src, &request);
        let placeholder_url = options
            .blur_up
            .then(|| policy.placeholder(&options.src, options.width))
            .filter(|placeholder| *placeholder != primary_url);
        let fallback_url = options.fallback.as_deref().map(|src| policy.resolve(src, &request));

        let context = ImageContext {
            blur_up: placeholder_url.is_some(),
            has_fallback: fallback_url.is_some(),
            ..ImageContext::default()
        };
        let state = if options.priority { ImageState::Loading } else { ImageState::Idle };

        Self {
            alt: options.alt,
            aspect_ratio: options.aspect_ratio,
            primary_url,
            placeholder_url,
            fallback_url,
            state,
            context,
            placeholder: None,
            image: None,
            last_error: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn context(&self) -> &ImageContext {
        &self.context
    }

    pub fn primary_url(&self) -> &str {
        &self.primary_url
    }

    pub fn placeholder_url(&self) -> Option<&str> {
        self.placeholder_url.as_deref()
    }

    pub fn fallback_url(&self) -> Option<&str> {
        self.fallback_url.as_deref()
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        self.aspect_ratio
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Viewport intersection. Returns `true` when this started the load.
    pub fn on_visible(&mut self) -> bool {
        if self.state != ImageState::Idle {
            return false;
        }
        self.apply(ImageEvent::BecameVisible).is_ok()
    }

    pub fn apply(&mut self, event: ImageEvent) -> Result<ImageTransition, ImageTransitionError> {
        let outcome = transition(self.state, event, &self.context)?;
        for action in &outcome.actions {
            match action {
                ImageAction::ShowPlaceholder => self.context.placeholder_visible = true,
                ImageAction::HidePlaceholder => self.context.placeholder_visible = false,
                ImageAction::FetchFallback => self.context.fallback_attempted = true,
                _ => {}
            }
        }
        self.state = outcome.to;
        Ok(outcome)
    }

    fn record(&mut self, event: ImageEvent) -> Vec<ImageAction> {
        match self.apply(event) {
            Ok(outcome) => outcome.actions,
            Err(error) => {
                warn!(
                    event_name = "images.instance.transition_rejected",
                    url = %self.primary_url,
                    error = %error,
                    "image transition rejected"
                );
                Vec::new()
            }
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs the load to completion, or until teardown.
    ///
    /// A cancelled load returns without touching the state.
    pub async fn load(&mut self, cache: &ImageCache) -> LoadOutcome {
        match self.state {
            ImageState::Idle => return LoadOutcome::NotVisible,
            ImageState::Loaded => return LoadOutcome::Loaded,
            ImageState::Error => {
                return LoadOutcome::Failed(self.last_error.clone().unwrap_or(FetchError::Cancelled))
            }
            ImageState::Loading => {}
        }

        let cancel = self.cancel.clone();
        if cancel.is_cancelled() {
            return LoadOutcome::Cancelled;
        }

        let primary_url = self.primary_url.clone();
        let primary = cache.get(&primary_url);
        tokio::pin!(primary);

        let mut settled = None;
        if let Some(placeholder_url) = self.placeholder_url.clone() {
            let placeholder = cache.get(&placeholder_url);
            tokio::pin!(placeholder);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return LoadOutcome::Cancelled,
                result = &mut primary => settled = Some(result),
                result = &mut placeholder => match result {
                    Ok(handle) => {
                        self.placeholder = Some(handle);
                        self.record(ImageEvent::PlaceholderReady);
                    }
                    Err(error) => {
                        debug!(
                            event_name = "images.instance.placeholder_failed",
                            url = %placeholder_url,
                            error = %error,
                            "blur-up placeholder unavailable"
                        );
                    }
                },
            }
        }

        let primary_result = match settled {
            Some(result) => result,
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => return LoadOutcome::Cancelled,
                result = &mut primary => result,
            },
        };

        let error = match primary_result {
            Ok(handle) => {
                self.image = Some(handle);
                self.record(ImageEvent::PrimaryLoaded);
                return LoadOutcome::Loaded;
            }
            Err(error) => error,
        };

        let actions = self.record(ImageEvent::PrimaryFailed);
        let wants_fallback = actions.contains(&ImageAction::FetchFallback);
        let fallback_url = match (wants_fallback, &self.fallback_url) {
            (true, Some(url)) => url.clone(),
            _ => return self.fail(error),
        };

        debug!(
            event_name = "images.instance.fallback",
            url = %primary_url,
            fallback = %fallback_url,
            "primary image failed, trying fallback"
        );

        let fallback_result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return LoadOutcome::Cancelled,
            result = cache.get(&fallback_url) => result,
        };

        match fallback_result {
            Ok(handle) => {
                self.image = Some(handle);
                self.record(ImageEvent::FallbackLoaded);
                LoadOutcome::Loaded
            }
            Err(error) => {
                self.record(ImageEvent::FallbackFailed);
                self.fail(error)
            }
        }
    }

    fn fail(&mut self, error: FetchError) -> LoadOutcome {
        warn!(
            event_name = "images.instance.failed",
            url = %self.primary_url,
            error = %error,
            "image could not be loaded"
        );
        self.last_error = Some(error.clone());
        LoadOutcome::Failed(error)
    }

    pub fn view(&self) -> ImageView<'_> {
        match self.state {
            ImageState::Loaded => self.image.as_ref().map_or(ImageView::Skeleton, ImageView::Full),
            ImageState::Error => ImageView::Broken { glyph: PLACEHOLDER_GLYPH, alt: &self.alt },
            ImageState::Loading if self.context.placeholder_visible => {
                self.placeholder.as_ref().map_or(ImageView::Skeleton, ImageView::Blurred)
            }
            ImageState::Idle | ImageState::Loading => ImageView::Skeleton,
        }
    }
}

impl Drop for ImageInstance {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ImageInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInstance")
            .field("primary_url", &self.primary_url)
            .field("state", &self.state)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::product::{CategoryId, ProductId};
    use crate::images::cache::testing::FakeFetcher;

    const PLAIN_SRC: &str = "https://assets.example.com/gifts/rose.jpg";
    const FALLBACK_SRC: &str = "https://assets.example.com/gifts/default.jpg";
    const CDN_SRC: &str = "https://images.pexels.com/photos/56866/pexels-photo-56866.jpeg";

    fn loading_context() -> ImageContext {
        ImageContext { blur_up: true, has_fallback: true, ..ImageContext::default() }
    }

    #[test]
    fn becoming_visible_requests_primary_and_placeholder() {
        let outcome = transition(ImageState::Idle, ImageEvent::BecameVisible, &loading_context())
            .expect("idle image should start loading");

        assert_eq!(outcome.to, ImageState::Loading);
        assert_eq!(outcome.actions, vec![ImageAction::FetchPrimary, ImageAction::FetchPlaceholder]);
    }

    #[test]
    fn placeholder_is_only_shown_with_blur_up() {
        let without = ImageContext::default();
        let outcome = transition(ImageState::Loading, ImageEvent::PlaceholderReady, &without)
            .expect("placeholder event is valid while loading");
        assert!(outcome.actions.is_empty());

        let outcome =
            transition(ImageState::Loading, ImageEvent::PlaceholderReady, &loading_context())
                .expect("placeholder event is valid while loading");
        assert_eq!(outcome.actions, vec![ImageAction::ShowPlaceholder]);
    }

    #[test]
    fn primary_success_hides_visible_placeholder() {
        let context = ImageContext { placeholder_visible: true, ..loading_context() };
        let outcome = transition(ImageState::Loading, ImageEvent::PrimaryLoaded, &context)
            .expect("primary success is valid while loading");

        assert_eq!(outcome.to, ImageState::Loaded);
        assert_eq!(outcome.actions, vec![ImageAction::HidePlaceholder]);
    }

    #[test]
    fn fallback_is_attempted_only_once() {
        let first = transition(ImageState::Loading, ImageEvent::PrimaryFailed, &loading_context())
            .expect("primary failure is valid while loading");
        assert_eq!(first.to, ImageState::Loading);
        assert_eq!(first.actions, vec![ImageAction::FetchFallback]);

        let attempted = ImageContext { fallback_attempted: true, ..loading_context() };
        let second = transition(ImageState::Loading, ImageEvent::PrimaryFailed, &attempted)
            .expect("repeated failure ends in error");
        assert_eq!(second.to, ImageState::Error);
        assert_eq!(second.actions, vec![ImageAction::ShowErrorGlyph]);
    }

    #[test]
    fn fallback_events_require_an_attempt() {
        let error = transition(ImageState::Loading, ImageEvent::FallbackLoaded, &loading_context())
            .expect_err("fallback cannot load before it was requested");
        assert!(matches!(error, ImageTransitionError::InvalidEvent { .. }));
    }

    #[test]
    fn terminal_states_reject_events() {
        for state in [ImageState::Loaded, ImageState::Error] {
            let error = transition(state, ImageEvent::BecameVisible, &loading_context())
                .expect_err("terminal state should reject events");
            assert_eq!(error, ImageTransitionError::Terminal { state, event: ImageEvent::BecameVisible });
        }
    }

    #[test]
    fn priority_images_start_loading() {
        let policy = ImageUrlPolicy::default();

        let eager = ImageInstance::new(ImageOptions::new(PLAIN_SRC, "rose").with_priority(true), &policy);
        let lazy = ImageInstance::new(ImageOptions::new(PLAIN_SRC, "rose"), &policy);

        assert_eq!(eager.state(), ImageState::Loading);
        assert_eq!(lazy.state(), ImageState::Idle);
        assert_eq!(lazy.view(), ImageView::Skeleton);
    }

    #[test]
    fn placeholder_is_skipped_when_it_matches_primary() {
        let policy = ImageUrlPolicy::default();

        let plain = ImageInstance::new(ImageOptions::new(PLAIN_SRC, "rose").with_blur_up(true), &policy);
        assert!(plain.placeholder_url().is_none());
        assert!(!plain.context().blur_up);

        let cdn = ImageInstance::new(
            ImageOptions::new(CDN_SRC, "rose").with_blur_up(true).with_width(400),
            &policy,
        );
        assert_eq!(cdn.placeholder_url(), Some(policy.placeholder(CDN_SRC, Some(400)).as_str()));
    }

    #[test]
    fn product_options_use_localized_alt_text() {
        let product = Product {
            id: ProductId(1),
            name_en: "Red Rose Bouquet".to_string(),
            name_ar: "باقة ورود حمراء".to_string(),
            price: Decimal::new(150, 0),
            image_url: CDN_SRC.to_string(),
            category_id: CategoryId::from("flowers"),
            occasion_id: None,
            is_best_seller: true,
            is_special_gift: false,
        };

        let options = ImageOptions::for_product(&product, Locale::Ar, Some(FALLBACK_SRC));

        assert_eq!(options.alt, "باقة ورود حمراء");
        assert!(options.blur_up);
        assert_eq!(options.fallback.as_deref(), Some(FALLBACK_SRC));
        assert_eq!(options.aspect_ratio, Some(1.0));
    }

    #[tokio::test]
    async fn lazy_image_waits_for_visibility() {
        let fetcher = Arc::new(FakeFetcher::default().serving(PLAIN_SRC, b"rose"));
        let cache = ImageCache::new(fetcher.clone());
        let mut instance = ImageInstance::new(ImageOptions::new(PLAIN_SRC, "rose"), &ImageUrlPolicy::default());

        assert_eq!(instance.load(&cache).await, LoadOutcome::NotVisible);
        assert_eq!(fetcher.total_calls(), 0);

        assert!(instance.on_visible());
        assert!(!instance.on_visible());
        assert_eq!(instance.load(&cache).await, LoadOutcome::Loaded);
        assert!(matches!(instance.view(), ImageView::Full(handle) if handle.bytes().as_ref() == b"rose"));
    }

    fn priority_blur_up_instance(policy: &ImageUrlPolicy) -> ImageInstance {
        let options =
            ImageOptions::new(CDN_SRC, "rose").with_blur_up(true).with_width(400).with_priority(true);
        ImageInstance::new(options, policy)
    }

    #[tokio::test]
    async fn blur_up_placeholder_is_hidden_once_primary_arrives() {
        let policy = ImageUrlPolicy::default();
        let mut instance = priority_blur_up_instance(&policy);
        let primary = instance.primary_url().to_owned();
        let placeholder = instance.placeholder_url().expect("cdn image has a placeholder").to_owned();

        let fetcher = Arc::new(
            FakeFetcher::default()
                .serving(&primary, b"full")
                .serving(&placeholder, b"tiny")
                .delayed(&primary, Duration::from_millis(20)),
        );
        let cache = ImageCache::new(fetcher.clone());

        assert_eq!(instance.load(&cache).await, LoadOutcome::Loaded);
        assert_eq!(instance.state(), ImageState::Loaded);
        assert!(!instance.context().placeholder_visible);
        assert_eq!(fetcher.calls_for(&placeholder), 1);
        assert!(matches!(instance.view(), ImageView::Full(handle) if handle.bytes().as_ref() == b"full"));
    }

    #[tokio::test]
    async fn slow_placeholder_losing_the_race_is_not_left_pending() {
        let policy = ImageUrlPolicy::default();
        let mut instance = priority_blur_up_instance(&policy);
        let primary = instance.primary_url().to_owned();
        let placeholder = instance.placeholder_url().expect("cdn image has a placeholder").to_owned();

        let fetcher = Arc::new(
            FakeFetcher::default()
                .serving(&primary, b"full")
                .serving(&placeholder, b"tiny")
                .delayed(&primary, Duration::from_millis(10))
                .delayed(&placeholder, Duration::from_millis(50)),
        );
        let cache = ImageCache::new(fetcher.clone());

        assert_eq!(instance.load(&cache).await, LoadOutcome::Loaded);
        assert!(!instance.context().placeholder_visible);

        let stats = cache.stats();
        assert_eq!((stats.entries, stats.pending), (1, 0));
        assert!(cache.contains(&primary));
        assert!(!cache.contains(&placeholder));
    }

    #[tokio::test]
    async fn failed_primary_falls_back_exactly_once() {
        let fetcher = Arc::new(
            FakeFetcher::default().failing(PLAIN_SRC, 404).serving(FALLBACK_SRC, b"default"),
        );
        let cache = ImageCache::new(fetcher.clone());
        let mut instance = ImageInstance::new(
            ImageOptions::new(PLAIN_SRC, "rose").with_priority(true).with_fallback(FALLBACK_SRC),
            &ImageUrlPolicy::default(),
        );

        assert_eq!(instance.load(&cache).await, LoadOutcome::Loaded);
        assert!(instance.context().fallback_attempted);
        assert_eq!(fetcher.calls_for(PLAIN_SRC), 1);
        assert_eq!(fetcher.calls_for(FALLBACK_SRC), 1);

        assert_eq!(instance.load(&cache).await, LoadOutcome::Loaded);
        assert_eq!(fetcher.total_calls(), 2);
    }

    #[tokio::test]
    async fn failed_fallback_shows_error_glyph_without_retry() {
        let fetcher = Arc::new(
            FakeFetcher::default().failing(PLAIN_SRC, 500).failing(FALLBACK_SRC, 404),
        );
        let cache = ImageCache::new(fetcher.clone());
        let mut instance = ImageInstance::new(
            ImageOptions::new(PLAIN_SRC, "Red Rose Bouquet")
                .with_priority(true)
                .with_fallback(FALLBACK_SRC),
            &ImageUrlPolicy::default(),
        );

        let outcome = instance.load(&cache).await;
        assert_eq!(
            outcome,
            LoadOutcome::Failed(FetchError::Status { url: FALLBACK_SRC.to_string(), status: 404 })
        );
        assert_eq!(instance.state(), ImageState::Error);
        assert_eq!(
            instance.view(),
            ImageView::Broken { glyph: PLACEHOLDER_GLYPH, alt: "Red Rose Bouquet" }
        );

        assert!(matches!(instance.load(&cache).await, LoadOutcome::Failed(_)));
        assert_eq!(fetcher.total_calls(), 2);
    }

    #[tokio::test]
    async fn missing_fallback_goes_straight_to_error() {
        let fetcher = Arc::new(FakeFetcher::default().failing(PLAIN_SRC, 503));
        let cache = ImageCache::new(fetcher.clone());
        let mut instance =
            ImageInstance::new(ImageOptions::new(PLAIN_SRC, "rose").with_priority(true), &ImageUrlPolicy::default());

        assert!(matches!(instance.load(&cache).await, LoadOutcome::Failed(FetchError::Status { status: 503, .. })));
        assert_eq!(instance.state(), ImageState::Error);
        assert!(instance.apply(ImageEvent::BecameVisible).is_err());
    }

    #[tokio::test]
    async fn teardown_during_load_leaves_state_untouched() {
        let fetcher = Arc::new(
            FakeFetcher::default().serving(PLAIN_SRC, b"rose").delayed(PLAIN_SRC, Duration::from_millis(50)),
        );
        let cache = ImageCache::new(fetcher.clone());
        let mut instance =
            ImageInstance::new(ImageOptions::new(PLAIN_SRC, "rose").with_priority(true), &ImageUrlPolicy::default());
        let token = instance.cancellation_token();

        let (outcome, ()) = tokio::join!(instance.load(&cache), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token.cancel();
        });

        assert_eq!(outcome, LoadOutcome::Cancelled);
        assert_eq!(instance.state(), ImageState::Loading);
        assert!(instance.is_torn_down());
        assert_eq!(instance.view(), ImageView::Skeleton);
        assert_eq!(instance.load(&cache).await, LoadOutcome::Cancelled);
    }

    #[test]
    fn dropping_instance_cancels_its_token() {
        let instance = ImageInstance::new(ImageOptions::new(PLAIN_SRC, "rose"), &ImageUrlPolicy::default());
        let token = instance.cancellation_token();

        drop(instance);

        assert!(token.is_cancelled());
    }
}
