use std::env;
use std::fs;
use std::path::Path;

use leadbridge_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

struct ConfigField {
    key: &'static str,
    env_key: &'static str,
    value: String,
}

impl ConfigField {
    fn new(key: &'static str, env_key: &'static str, value: impl Into<String>) -> Self {
        Self { key, env_key, value: value.into() }
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            Some(field.env_key),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let unset = || "<unset>".to_string();
    vec![
        ConfigField::new("crm.url", "LEADBRIDGE_CRM_URL", config.crm.url.as_str()),
        ConfigField::new("crm.database", "LEADBRIDGE_CRM_DATABASE", config.crm.database.as_str()),
        ConfigField::new("crm.username", "LEADBRIDGE_CRM_USERNAME", config.crm.username.as_str()),
        ConfigField::new(
            "crm.password",
            "LEADBRIDGE_CRM_PASSWORD",
            redact_secret(config.crm.password.expose_secret()),
        ),
        ConfigField::new(
            "crm.timeout_secs",
            "LEADBRIDGE_CRM_TIMEOUT_SECS",
            config.crm.timeout_secs.to_string(),
        ),
        ConfigField::new(
            "crm.lead_model",
            "LEADBRIDGE_CRM_LEAD_MODEL",
            config.crm.lead_model.as_str(),
        ),
        ConfigField::new(
            "crm.default_team_id",
            "LEADBRIDGE_CRM_DEFAULT_TEAM_ID",
            config.crm.default_team_id.to_string(),
        ),
        ConfigField::new(
            "crm.default_stage",
            "LEADBRIDGE_CRM_DEFAULT_STAGE",
            config.crm.default_stage.as_str(),
        ),
        ConfigField::new(
            "server.bind_address",
            "LEADBRIDGE_SERVER_BIND_ADDRESS",
            config.server.bind_address.as_str(),
        ),
        ConfigField::new("server.port", "LEADBRIDGE_SERVER_PORT", config.server.port.to_string()),
        ConfigField::new(
            "server.graceful_shutdown_secs",
            "LEADBRIDGE_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        ConfigField::new(
            "quotation.validity_days",
            "LEADBRIDGE_QUOTATION_VALIDITY_DAYS",
            config.quotation.validity_days.to_string(),
        ),
        ConfigField::new(
            "quotation.tax_rate",
            "LEADBRIDGE_QUOTATION_TAX_RATE",
            config.quotation.tax_rate.to_string(),
        ),
        ConfigField::new(
            "quotation.company_name",
            "LEADBRIDGE_QUOTATION_COMPANY_NAME",
            config.quotation.company_name.as_str(),
        ),
        ConfigField::new(
            "quotation.template_dir",
            "LEADBRIDGE_QUOTATION_TEMPLATE_DIR",
            config
                .quotation
                .template_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "<embedded>".to_string()),
        ),
        ConfigField::new(
            "render.wkhtmltopdf_path",
            "LEADBRIDGE_RENDER_WKHTMLTOPDF_PATH",
            config.render.wkhtmltopdf_path.clone().unwrap_or_else(|| "<PATH lookup>".to_string()),
        ),
        ConfigField::new(
            "render.timeout_secs",
            "LEADBRIDGE_RENDER_TIMEOUT_SECS",
            config.render.timeout_secs.to_string(),
        ),
        ConfigField::new(
            "notify.organization_url",
            "LEADBRIDGE_NOTIFY_ORGANIZATION_URL",
            config.notify.organization_url.clone().unwrap_or_else(unset),
        ),
        ConfigField::new(
            "notify.timeout_secs",
            "LEADBRIDGE_NOTIFY_TIMEOUT_SECS",
            config.notify.timeout_secs.to_string(),
        ),
        ConfigField::new(
            "logging.level",
            "LEADBRIDGE_LOGGING_LEVEL",
            config.logging.level.as_str(),
        ),
        ConfigField::new(
            "logging.format",
            "LEADBRIDGE_LOGGING_FORMAT",
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
