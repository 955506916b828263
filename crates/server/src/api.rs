//! Storefront JSON API.
//!
//! - `GET  /api/products`                 filtered catalog (`category`, `occasion`, `q`, `locale`)
//! - `GET  /api/products/{id}`            one product card
//! - `GET  /api/gift-assistant/options`   localized questionnaire options
//! - `POST /api/gift-assistant`           rank gifts for a questionnaire answer
//! - `GET  /api/images/resolve`           quality-adapted and placeholder URLs
//! - `GET  /api/images`                   catalog or CDN image bytes through the shared cache

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderName, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tuhfa_core::assistant::{AssistantOptions, QuestionnaireAnswer, SuggestionResult};
use tuhfa_core::domain::product::{CategoryId, OccasionId, Product, ProductId};
use tuhfa_core::errors::{ApplicationError, DomainError, InterfaceError};
use tuhfa_core::images::{ImageInstance, ImageOptions, ImageView, LoadOutcome};
use tuhfa_core::locale::{Locale, TextDirection};
use uuid::Uuid;

use crate::bootstrap::AppState;

const IMAGE_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-image-source");
const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/gift-assistant/options", get(assistant_options))
        .route("/api/gift-assistant", post(suggest_gifts))
        .route("/api/images/resolve", get(resolve_image))
        .route("/api/images", get(get_image))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    correlation_id: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        warn!(
            event_name = "api.request.failed",
            correlation_id = self.0.correlation_id(),
            status = status.as_u16(),
            error = %self.0,
            "request failed"
        );

        let body = ErrorBody { error: self.0.user_message(), correlation_id: self.0.correlation_id() };
        (status, Json(body)).into_response()
    }
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn reject(error: impl Into<ApplicationError>, correlation_id: &str) -> ApiError {
    ApiError(error.into().into_interface(correlation_id))
}

fn parse_locale(raw: Option<&str>) -> Result<Locale, ApplicationError> {
    match raw {
        Some(raw) => raw.parse().map_err(|error| DomainError::from(error).into()),
        None => Ok(Locale::default()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub occasion: Option<String>,
    pub q: Option<String>,
    pub locale: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSources {
    pub src: String,
    pub resolved: String,
    pub placeholder: Option<String>,
    pub fallback: Option<String>,
    pub alt: String,
    pub aspect_ratio: Option<f32>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub category_id: CategoryId,
    pub occasion_id: Option<OccasionId>,
    pub is_best_seller: bool,
    pub is_special_gift: bool,
    pub image: ImageSources,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductList {
    pub locale: Locale,
    pub direction: TextDirection,
    pub count: usize,
    pub products: Vec<ProductCard>,
}

fn product_card(product: &Product, locale: Locale, state: &AppState) -> ProductCard {
    let options = ImageOptions::for_product(product, locale, state.fallback_url.as_deref())
        .with_quality(state.default_quality);
    let instance = ImageInstance::new(options, &state.url_policy);

    ProductCard {
        id: product.id,
        name: product.name(locale).to_owned(),
        price: product.price,
        category_id: product.category_id.clone(),
        occasion_id: product.occasion_id.clone(),
        is_best_seller: product.is_best_seller,
        is_special_gift: product.is_special_gift,
        image: ImageSources {
            src: product.image_url.clone(),
            resolved: instance.primary_url().to_owned(),
            placeholder: instance.placeholder_url().map(str::to_owned),
            fallback: instance.fallback_url().map(str::to_owned),
            alt: instance.alt().to_owned(),
            aspect_ratio: instance.aspect_ratio(),
        },
    }
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductList>, ApiError> {
    let correlation_id = correlation_id();
    let locale =
        parse_locale(query.locale.as_deref()).map_err(|error| reject(error, &correlation_id))?;

    let products: Vec<ProductCard> = state
        .catalog
        .search(query.q.as_deref().unwrap_or_default())
        .into_iter()
        .filter(|product| {
            query.category.as_deref().map_or(true, |category| product.category_id.as_str() == category)
        })
        .filter(|product| {
            query.occasion.as_deref().map_or(true, |occasion| {
                product.occasion_id.as_ref().is_some_and(|id| id.as_str() == occasion)
            })
        })
        .map(|product| product_card(product, locale, &state))
        .collect();

    Ok(Json(ProductList {
        locale,
        direction: locale.direction(),
        count: products.len(),
        products,
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<ProductCard>, ApiError> {
    let correlation_id = correlation_id();
    let locale =
        parse_locale(query.locale.as_deref()).map_err(|error| reject(error, &correlation_id))?;

    let product = state.catalog.find(ProductId(id)).ok_or_else(|| {
        reject(ApplicationError::NotFound(format!("product {id}")), &correlation_id)
    })?;

    Ok(Json(product_card(product, locale, &state)))
}

pub async fn assistant_options(
    Query(query): Query<LocaleQuery>,
) -> Result<Json<AssistantOptions>, ApiError> {
    let correlation_id = correlation_id();
    let locale =
        parse_locale(query.locale.as_deref()).map_err(|error| reject(error, &correlation_id))?;

    Ok(Json(AssistantOptions::localized(locale)))
}

pub async fn suggest_gifts(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
    Json(answer): Json<QuestionnaireAnswer>,
) -> Result<Json<SuggestionResult>, ApiError> {
    let correlation_id = correlation_id();
    let locale =
        parse_locale(query.locale.as_deref()).map_err(|error| reject(error, &correlation_id))?;

    let result = state.assistant.find_gift(&answer, locale).await;
    info!(
        event_name = "api.gift_assistant.answered",
        correlation_id = %correlation_id,
        locale = %locale,
        suggestions = result.products.len(),
        fallback = result.fallback,
        "gift suggestions returned"
    );

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub src: String,
    pub w: Option<u32>,
    pub q: Option<u8>,
    #[serde(default)]
    pub priority: bool,
}

impl ImageQuery {
    fn options(&self, state: &AppState) -> Result<ImageOptions, ApplicationError> {
        let src = self.src.trim();
        if !is_http_url(src) {
            return Err(DomainError::InvariantViolation(
                "src must be an absolute http(s) URL".to_owned(),
            )
            .into());
        }

        let quality = self.q.unwrap_or(state.default_quality);
        if !(1..=100).contains(&quality) {
            return Err(DomainError::InvariantViolation("q must be in range 1..=100".to_owned())
                .into());
        }

        let mut options = ImageOptions::new(src, "").with_quality(quality).with_priority(self.priority);
        if let Some(width) = self.w {
            options = options.with_width(width);
        }
        if let Some(fallback) = state.fallback_url.as_deref().filter(|url| is_http_url(url)) {
            options = options.with_fallback(fallback);
        }

        Ok(options)
    }

    /// Only storefront images are fetched: catalog image URLs and the CDN host.
    fn ensure_storefront_source(&self, state: &AppState) -> Result<(), ApplicationError> {
        let src = self.src.trim();
        let listed = state.catalog.products().iter().any(|product| product.image_url == src);
        if listed || state.url_policy.is_cdn_url(src) {
            return Ok(());
        }

        Err(DomainError::InvariantViolation(format!(
            "src must be a catalog image or served by `{}`",
            state.url_policy.cdn_host()
        ))
        .into())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

#[derive(Clone, Debug, Serialize)]
pub struct ResolvedImage {
    pub src: String,
    pub resolved: String,
    pub placeholder: String,
    pub fallback: Option<String>,
    pub cdn: bool,
}

pub async fn resolve_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<Json<ResolvedImage>, ApiError> {
    let correlation_id = correlation_id();
    let options = query.options(&state).map_err(|error| reject(error, &correlation_id))?;
    let instance = ImageInstance::new(options.clone(), &state.url_policy);

    Ok(Json(ResolvedImage {
        resolved: instance.primary_url().to_owned(),
        placeholder: state.url_policy.placeholder(&options.src, options.width),
        fallback: instance.fallback_url().map(str::to_owned),
        cdn: state.url_policy.is_cdn_url(&options.src),
        src: options.src,
    }))
}

pub async fn get_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, ApiError> {
    let correlation_id = correlation_id();
    let options = query.options(&state).map_err(|error| reject(error, &correlation_id))?;
    query.ensure_storefront_source(&state).map_err(|error| reject(error, &correlation_id))?;

    let mut instance = ImageInstance::new(options, &state.url_policy);
    instance.on_visible();

    match instance.load(&state.images).await {
        LoadOutcome::Loaded => {}
        LoadOutcome::Failed(error) => return Err(reject(error, &correlation_id)),
        LoadOutcome::Cancelled | LoadOutcome::NotVisible => {
            return Err(reject(
                ApplicationError::Integration("image load did not complete".to_owned()),
                &correlation_id,
            ))
        }
    }

    let ImageView::Full(handle) = instance.view() else {
        return Err(reject(
            ApplicationError::Integration("loaded image has no data".to_owned()),
            &correlation_id,
        ));
    };

    let content_type = handle.content_type().unwrap_or("application/octet-stream").to_owned();
    let headers = [
        (CONTENT_TYPE, content_type),
        (CACHE_CONTROL, IMAGE_CACHE_CONTROL.to_owned()),
        (IMAGE_SOURCE_HEADER, handle.url().to_owned()),
    ];

    Ok((headers, handle.bytes().clone()).into_response())
}
