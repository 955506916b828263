use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assistant::{
    DEFAULT_ANALYSIS_DELAY_MS, DEFAULT_FALLBACK_SUGGESTIONS, DEFAULT_MAX_SUGGESTIONS,
};
use crate::images::{DEFAULT_CDN_HOST, DEFAULT_QUALITY};

pub const DEFAULT_CONFIG_FILE: &str = "tuhfa.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub images: ImageConfig,
    pub assistant: AssistantConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    /// Directory holding `products.json`, `categories.json` and `occasions.json`.
    /// The bundled catalog is used when unset.
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ImageConfig {
    pub cdn_host: String,
    pub default_quality: u8,
    pub device_pixel_ratio: u8,
    pub placeholder_width: u32,
    pub placeholder_quality: u8,
    pub fetch_timeout_secs: u64,
    pub fallback_url: Option<String>,
    pub user_agent: String,
}

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub analysis_delay_ms: u64,
    pub max_suggestions: usize,
    pub fallback_suggestions: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub cdn_host: Option<String>,
    pub image_quality: Option<u8>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            cdn_host: DEFAULT_CDN_HOST.to_string(),
            default_quality: DEFAULT_QUALITY,
            device_pixel_ratio: 1,
            placeholder_width: 100,
            placeholder_quality: 20,
            fetch_timeout_secs: 15,
            fallback_url: None,
            user_agent: format!("tuhfa/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            analysis_delay_ms: DEFAULT_ANALYSIS_DELAY_MS,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            fallback_suggestions: DEFAULT_FALLBACK_SUGGESTIONS,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            images: ImageConfig::default(),
            assistant: AssistantConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(data_dir) = catalog.data_dir {
                self.catalog.data_dir = Some(data_dir);
            }
        }

        if let Some(images) = patch.images {
            if let Some(cdn_host) = images.cdn_host {
                self.images.cdn_host = cdn_host;
            }
            if let Some(default_quality) = images.default_quality {
                self.images.default_quality = default_quality;
            }
            if let Some(device_pixel_ratio) = images.device_pixel_ratio {
                self.images.device_pixel_ratio = device_pixel_ratio;
            }
            if let Some(placeholder_width) = images.placeholder_width {
                self.images.placeholder_width = placeholder_width;
            }
            if let Some(placeholder_quality) = images.placeholder_quality {
                self.images.placeholder_quality = placeholder_quality;
            }
            if let Some(fetch_timeout_secs) = images.fetch_timeout_secs {
                self.images.fetch_timeout_secs = fetch_timeout_secs;
            }
            if let Some(fallback_url) = images.fallback_url {
                self.images.fallback_url = Some(fallback_url);
            }
            if let Some(user_agent) = images.user_agent {
                self.images.user_agent = user_agent;
            }
        }

        if let Some(assistant) = patch.assistant {
            if let Some(analysis_delay_ms) = assistant.analysis_delay_ms {
                self.assistant.analysis_delay_ms = analysis_delay_ms;
            }
            if let Some(max_suggestions) = assistant.max_suggestions {
                self.assistant.max_suggestions = max_suggestions;
            }
            if let Some(fallback_suggestions) = assistant.fallback_suggestions {
                self.assistant.fallback_suggestions = fallback_suggestions;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TUHFA_CATALOG_DATA_DIR") {
            self.catalog.data_dir = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("TUHFA_IMAGES_CDN_HOST") {
            self.images.cdn_host = value;
        }
        if let Some(value) = read_env("TUHFA_IMAGES_DEFAULT_QUALITY") {
            self.images.default_quality = parse_u8("TUHFA_IMAGES_DEFAULT_QUALITY", &value)?;
        }
        if let Some(value) = read_env("TUHFA_IMAGES_DEVICE_PIXEL_RATIO") {
            self.images.device_pixel_ratio = parse_u8("TUHFA_IMAGES_DEVICE_PIXEL_RATIO", &value)?;
        }
        if let Some(value) = read_env("TUHFA_IMAGES_PLACEHOLDER_WIDTH") {
            self.images.placeholder_width = parse_u32("TUHFA_IMAGES_PLACEHOLDER_WIDTH", &value)?;
        }
        if let Some(value) = read_env("TUHFA_IMAGES_PLACEHOLDER_QUALITY") {
            self.images.placeholder_quality =
                parse_u8("TUHFA_IMAGES_PLACEHOLDER_QUALITY", &value)?;
        }
        if let Some(value) = read_env("TUHFA_IMAGES_FETCH_TIMEOUT_SECS") {
            self.images.fetch_timeout_secs = parse_u64("TUHFA_IMAGES_FETCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TUHFA_IMAGES_FALLBACK_URL") {
            self.images.fallback_url = Some(value);
        }
        if let Some(value) = read_env("TUHFA_IMAGES_USER_AGENT") {
            self.images.user_agent = value;
        }

        if let Some(value) = read_env("TUHFA_ASSISTANT_ANALYSIS_DELAY_MS") {
            self.assistant.analysis_delay_ms =
                parse_u64("TUHFA_ASSISTANT_ANALYSIS_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("TUHFA_ASSISTANT_MAX_SUGGESTIONS") {
            self.assistant.max_suggestions = parse_usize("TUHFA_ASSISTANT_MAX_SUGGESTIONS", &value)?;
        }
        if let Some(value) = read_env("TUHFA_ASSISTANT_FALLBACK_SUGGESTIONS") {
            self.assistant.fallback_suggestions =
                parse_usize("TUHFA_ASSISTANT_FALLBACK_SUGGESTIONS", &value)?;
        }

        if let Some(value) = read_env("TUHFA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TUHFA_SERVER_PORT") {
            self.server.port = parse_u16("TUHFA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("TUHFA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TUHFA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("TUHFA_LOGGING_LEVEL").or_else(|| read_env("TUHFA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("TUHFA_LOGGING_FORMAT").or_else(|| read_env("TUHFA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.catalog.data_dir = Some(data_dir);
        }
        if let Some(cdn_host) = overrides.cdn_host {
            self.images.cdn_host = cdn_host;
        }
        if let Some(image_quality) = overrides.image_quality {
            self.images.default_quality = image_quality;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_images(&self.images)?;
        validate_assistant(&self.assistant)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_images(images: &ImageConfig) -> Result<(), ConfigError> {
    let host = images.cdn_host.trim();
    if host.is_empty() || host.contains('/') || host.contains("://") {
        return Err(ConfigError::Validation(
            "images.cdn_host must be a bare host name such as `images.pexels.com`".to_string(),
        ));
    }

    if !(1..=100).contains(&images.default_quality) {
        return Err(ConfigError::Validation(
            "images.default_quality must be in range 1..=100".to_string(),
        ));
    }
    if !(1..=100).contains(&images.placeholder_quality) {
        return Err(ConfigError::Validation(
            "images.placeholder_quality must be in range 1..=100".to_string(),
        ));
    }

    if !(1..=3).contains(&images.device_pixel_ratio) {
        return Err(ConfigError::Validation(
            "images.device_pixel_ratio must be in range 1..=3".to_string(),
        ));
    }

    if images.placeholder_width == 0 {
        return Err(ConfigError::Validation(
            "images.placeholder_width must be greater than zero".to_string(),
        ));
    }

    if images.fetch_timeout_secs == 0 || images.fetch_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "images.fetch_timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if let Some(fallback_url) = &images.fallback_url {
        if !fallback_url.starts_with("http://") && !fallback_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "images.fallback_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if assistant.max_suggestions == 0 {
        return Err(ConfigError::Validation(
            "assistant.max_suggestions must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.trim().parse::<u8>().map_err(|_| invalid_override(key, value))
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    images: Option<ImagesPatch>,
    assistant: Option<AssistantPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ImagesPatch {
    cdn_host: Option<String>,
    default_quality: Option<u8>,
    device_pixel_ratio: Option<u8>,
    placeholder_width: Option<u32>,
    placeholder_quality: Option<u8>,
    fetch_timeout_secs: Option<u64>,
    fallback_url: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantPatch {
    analysis_delay_ms: Option<u64>,
    max_suggestions: Option<usize>,
    fallback_suggestions: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
