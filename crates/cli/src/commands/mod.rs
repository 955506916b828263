pub mod catalog;
pub mod config;
pub mod doctor;
pub mod image_url;
pub mod suggest;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct CommandData<'a, T: Serialize> {
    command: &'a str,
    status: &'a str,
    data: &'a T,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    /// Successful run whose structured result goes under `data`.
    pub fn data<T: Serialize>(command: &str, data: &T) -> Self {
        let payload = CommandData { command, status: "ok", data };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }
}

fn serialize_payload<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Config or catalog problems shared by the commands that need both.
pub(crate) fn load_runtime(
    command: &str,
) -> Result<(tuhfa_core::AppConfig, tuhfa_core::Catalog), CommandResult> {
    use tuhfa_core::config::LoadOptions;

    let config = tuhfa_core::AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), 2)
    })?;
    let catalog = tuhfa_core::Catalog::load(config.catalog.data_dir.as_deref())
        .map_err(|error| CommandResult::failure(command, "catalog_load", error.to_string(), 3))?;
    Ok((config, catalog))
}
