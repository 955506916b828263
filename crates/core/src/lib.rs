pub mod assistant;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod images;
pub mod locale;

pub use assistant::{
    GiftAssistant, GiftMatcher, QuestionnaireAnswer, QuizSession, QuizStep, SuggestionResult,
};
pub use catalog::{Catalog, CatalogError};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::product::{Category, CategoryId, Occasion, OccasionId, Product, ProductId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use images::{
    ImageCache, ImageFetcher, ImageHandle, ImageInstance, ImageOptions, ImageRequest, ImageState,
    ImageUrlPolicy,
};
pub use locale::{Locale, TextDirection};
