use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;
use tuhfa_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in effective_values(&config) {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

type Entry = (&'static str, String, &'static [&'static str]);

fn effective_values(config: &AppConfig) -> Vec<Entry> {
    let images = &config.images;
    let assistant = &config.assistant;
    let server = &config.server;

    vec![
        entry(
            "catalog.data_dir",
            config
                .catalog
                .data_dir
                .as_deref()
                .map_or_else(|| "<bundled>".to_string(), |dir| dir.display().to_string()),
            &["TUHFA_CATALOG_DATA_DIR"],
        ),
        entry("images.cdn_host", images.cdn_host.clone(), &["TUHFA_IMAGES_CDN_HOST"]),
        entry(
            "images.default_quality",
            images.default_quality.to_string(),
            &["TUHFA_IMAGES_DEFAULT_QUALITY"],
        ),
        entry(
            "images.device_pixel_ratio",
            images.device_pixel_ratio.to_string(),
            &["TUHFA_IMAGES_DEVICE_PIXEL_RATIO"],
        ),
        entry(
            "images.placeholder_width",
            images.placeholder_width.to_string(),
            &["TUHFA_IMAGES_PLACEHOLDER_WIDTH"],
        ),
        entry(
            "images.placeholder_quality",
            images.placeholder_quality.to_string(),
            &["TUHFA_IMAGES_PLACEHOLDER_QUALITY"],
        ),
        entry(
            "images.fetch_timeout_secs",
            images.fetch_timeout_secs.to_string(),
            &["TUHFA_IMAGES_FETCH_TIMEOUT_SECS"],
        ),
        entry(
            "images.fallback_url",
            images.fallback_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["TUHFA_IMAGES_FALLBACK_URL"],
        ),
        entry("images.user_agent", images.user_agent.clone(), &["TUHFA_IMAGES_USER_AGENT"]),
        entry(
            "assistant.analysis_delay_ms",
            assistant.analysis_delay_ms.to_string(),
            &["TUHFA_ASSISTANT_ANALYSIS_DELAY_MS"],
        ),
        entry(
            "assistant.max_suggestions",
            assistant.max_suggestions.to_string(),
            &["TUHFA_ASSISTANT_MAX_SUGGESTIONS"],
        ),
        entry(
            "assistant.fallback_suggestions",
            assistant.fallback_suggestions.to_string(),
            &["TUHFA_ASSISTANT_FALLBACK_SUGGESTIONS"],
        ),
        entry("server.bind_address", server.bind_address.clone(), &["TUHFA_SERVER_BIND_ADDRESS"]),
        entry("server.port", server.port.to_string(), &["TUHFA_SERVER_PORT"]),
        entry(
            "server.graceful_shutdown_secs",
            server.graceful_shutdown_secs.to_string(),
            &["TUHFA_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["TUHFA_LOGGING_LEVEL", "TUHFA_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            config.logging.format.as_str().to_string(),
            &["TUHFA_LOGGING_FORMAT", "TUHFA_LOG_FORMAT"],
        ),
    ]
}

fn entry(key_path: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    (key_path, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
