use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use tuhfa_core::assistant::{GiftAssistant, GiftMatcher};
use tuhfa_core::catalog::{Catalog, CatalogError};
use tuhfa_core::config::AppConfig;
use tuhfa_core::images::{ImageCache, ImageFetcher, ImageUrlPolicy};

use crate::fetcher::HttpImageFetcher;

/// Shared, cheaply cloneable handles every route works against.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub assistant: Arc<GiftAssistant>,
    pub images: Arc<ImageCache>,
    pub url_policy: Arc<ImageUrlPolicy>,
    pub default_quality: u8,
    pub fallback_url: Option<String>,
}

impl AppState {
    pub fn new(config: &AppConfig, catalog: Catalog, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let catalog = Arc::new(catalog);
        let matcher = GiftMatcher::new(Arc::clone(&catalog))
            .with_limits(config.assistant.max_suggestions, config.assistant.fallback_suggestions);
        let assistant =
            GiftAssistant::new(matcher, Duration::from_millis(config.assistant.analysis_delay_ms));

        Self {
            catalog,
            assistant: Arc::new(assistant),
            images: Arc::new(ImageCache::new(fetcher)),
            url_policy: Arc::new(ImageUrlPolicy::from_config(&config.images)),
            default_quality: config.images.default_quality,
            fallback_url: config.images.fallback_url.clone(),
        }
    }
}

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("image http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let catalog = Catalog::load(config.catalog.data_dir.as_deref())?;
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        products = catalog.len(),
        categories = catalog.categories().len(),
        occasions = catalog.occasions().len(),
        source = config
            .catalog
            .data_dir
            .as_deref()
            .map_or_else(|| "bundled".to_string(), |dir| dir.display().to_string()),
        "catalog loaded"
    );

    let fetcher = HttpImageFetcher::new(&config.images).map_err(BootstrapError::HttpClient)?;
    let state = AppState::new(&config, catalog, Arc::new(fetcher));
    info!(
        event_name = "system.bootstrap.images_ready",
        correlation_id = "bootstrap",
        cdn_host = state.url_policy.cdn_host(),
        default_quality = state.default_quality,
        "image pipeline initialized"
    );

    Ok(Application { config, state })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tuhfa_core::config::AppConfig;

    use crate::bootstrap::bootstrap_with_config;

    #[tokio::test]
    async fn bootstrap_loads_bundled_catalog() {
        let app = bootstrap_with_config(AppConfig::default())
            .await
            .expect("default bootstrap should succeed");

        assert!(!app.state.catalog.is_empty());
        assert_eq!(app.state.url_policy.cdn_host(), "images.pexels.com");
        assert!(app.state.images.is_empty());
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_broken_catalog_dir() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("products.json"), "not json").expect("write products");

        let mut config = AppConfig::default();
        config.catalog.data_dir = Some(dir.path().to_path_buf());
        let result = bootstrap_with_config(config).await;

        let message = result.err().expect("broken catalog should fail bootstrap").to_string();
        assert!(message.contains("products.json"), "unexpected error: {message}");
    }
}
