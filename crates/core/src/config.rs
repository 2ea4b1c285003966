use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub crm: CrmConfig,
    pub server: ServerConfig,
    pub quotation: QuotationConfig,
    pub render: RenderConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: SecretString,
    pub timeout_secs: u64,
    pub lead_model: String,
    pub default_team_id: i64,
    pub default_stage: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct QuotationConfig {
    pub validity_days: u32,
    pub tax_rate: Decimal,
    pub company_name: String,
    pub template_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub wkhtmltopdf_path: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub organization_url: Option<String>,
    pub timeout_secs: u64,
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
    pub crm_url: Option<String>,
    pub crm_database: Option<String>,
    pub crm_username: Option<String>,
    pub crm_password: Option<String>,
    pub server_port: Option<u16>,
    pub wkhtmltopdf_path: Option<String>,
    pub notify_organization_url: Option<String>,
    pub log_level: Option<String>,
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

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["leadbridge.toml", "config/leadbridge.toml"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            crm: CrmConfig {
                url: "http://localhost:8069".to_string(),
                database: String::new(),
                username: String::new(),
                password: String::new().into(),
                timeout_secs: 30,
                lead_model: "crm.lead".to_string(),
                default_team_id: 1,
                default_stage: "New".to_string(),
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 5000,
                graceful_shutdown_secs: 15,
            },
            quotation: QuotationConfig {
                validity_days: 15,
                tax_rate: Decimal::ZERO,
                company_name: "Leadbridge".to_string(),
                template_dir: None,
            },
            render: RenderConfig { wkhtmltopdf_path: None, timeout_secs: 60 },
            notify: NotifyConfig { organization_url: None, timeout_secs: 10 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LogFormat {
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(crm) = patch.crm {
            if let Some(url) = crm.url {
                self.crm.url = url;
            }
            if let Some(database) = crm.database {
                self.crm.database = database;
            }
            if let Some(username) = crm.username {
                self.crm.username = username;
            }
            if let Some(crm_password_value) = crm.password {
                self.crm.password = secret_value(crm_password_value);
            }
            if let Some(timeout_secs) = crm.timeout_secs {
                self.crm.timeout_secs = timeout_secs;
            }
            if let Some(lead_model) = crm.lead_model {
                self.crm.lead_model = lead_model;
            }
            if let Some(default_team_id) = crm.default_team_id {
                self.crm.default_team_id = default_team_id;
            }
            if let Some(default_stage) = crm.default_stage {
                self.crm.default_stage = default_stage;
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

        if let Some(quotation) = patch.quotation {
            if let Some(validity_days) = quotation.validity_days {
                self.quotation.validity_days = validity_days;
            }
            if let Some(tax_rate) = quotation.tax_rate {
                self.quotation.tax_rate = tax_rate;
            }
            if let Some(company_name) = quotation.company_name {
                self.quotation.company_name = company_name;
            }
            if let Some(template_dir) = quotation.template_dir {
                self.quotation.template_dir = Some(template_dir);
            }
        }

        if let Some(render) = patch.render {
            if let Some(wkhtmltopdf_path) = render.wkhtmltopdf_path {
                self.render.wkhtmltopdf_path = Some(wkhtmltopdf_path);
            }
            if let Some(timeout_secs) = render.timeout_secs {
                self.render.timeout_secs = timeout_secs;
            }
        }

        if let Some(notify) = patch.notify {
            if let Some(organization_url) = notify.organization_url {
                self.notify.organization_url = Some(organization_url);
            }
            if let Some(timeout_secs) = notify.timeout_secs {
                self.notify.timeout_secs = timeout_secs;
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
        if let Some(value) = read_env("LEADBRIDGE_CRM_URL") {
            self.crm.url = value;
        }
        if let Some(value) = read_env("LEADBRIDGE_CRM_DATABASE") {
            self.crm.database = value;
        }
        if let Some(value) = read_env("LEADBRIDGE_CRM_USERNAME") {
            self.crm.username = value;
        }
        if let Some(value) = read_env("LEADBRIDGE_CRM_PASSWORD") {
            self.crm.password = secret_value(value);
        }
        if let Some(value) = read_env("LEADBRIDGE_CRM_TIMEOUT_SECS") {
            self.crm.timeout_secs = parse_env("LEADBRIDGE_CRM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LEADBRIDGE_CRM_LEAD_MODEL") {
            self.crm.lead_model = value;
        }
        if let Some(value) = read_env("LEADBRIDGE_CRM_DEFAULT_TEAM_ID") {
            self.crm.default_team_id = parse_env("LEADBRIDGE_CRM_DEFAULT_TEAM_ID", &value)?;
        }
        if let Some(value) = read_env("LEADBRIDGE_CRM_DEFAULT_STAGE") {
            self.crm.default_stage = value;
        }

        if let Some(value) = read_env("LEADBRIDGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("LEADBRIDGE_SERVER_PORT") {
            self.server.port = parse_env("LEADBRIDGE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("LEADBRIDGE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("LEADBRIDGE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADBRIDGE_QUOTATION_VALIDITY_DAYS") {
            self.quotation.validity_days =
                parse_env("LEADBRIDGE_QUOTATION_VALIDITY_DAYS", &value)?;
        }
        if let Some(value) = read_env("LEADBRIDGE_QUOTATION_TAX_RATE") {
            self.quotation.tax_rate = parse_env("LEADBRIDGE_QUOTATION_TAX_RATE", &value)?;
        }
        if let Some(value) = read_env("LEADBRIDGE_QUOTATION_COMPANY_NAME") {
            self.quotation.company_name = value;
        }
        if let Some(value) = read_env("LEADBRIDGE_QUOTATION_TEMPLATE_DIR") {
            self.quotation.template_dir = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("LEADBRIDGE_RENDER_WKHTMLTOPDF_PATH") {
            self.render.wkhtmltopdf_path = Some(value);
        }
        if let Some(value) = read_env("LEADBRIDGE_RENDER_TIMEOUT_SECS") {
            self.render.timeout_secs = parse_env("LEADBRIDGE_RENDER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADBRIDGE_NOTIFY_ORGANIZATION_URL") {
            self.notify.organization_url = Some(value);
        }
        if let Some(value) = read_env("LEADBRIDGE_NOTIFY_TIMEOUT_SECS") {
            self.notify.timeout_secs = parse_env("LEADBRIDGE_NOTIFY_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("LEADBRIDGE_LOGGING_LEVEL").or_else(|| read_env("LEADBRIDGE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEADBRIDGE_LOGGING_FORMAT").or_else(|| read_env("LEADBRIDGE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.crm_url {
            self.crm.url = url;
        }
        if let Some(database) = overrides.crm_database {
            self.crm.database = database;
        }
        if let Some(username) = overrides.crm_username {
            self.crm.username = username;
        }
        if let Some(password) = overrides.crm_password {
            self.crm.password = secret_value(password);
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(wkhtmltopdf_path) = overrides.wkhtmltopdf_path {
            self.render.wkhtmltopdf_path = Some(wkhtmltopdf_path);
        }
        if let Some(organization_url) = overrides.notify_organization_url {
            self.notify.organization_url = Some(organization_url);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_crm(&self.crm)?;
        validate_server(&self.server)?;
        validate_quotation(&self.quotation)?;
        validate_render(&self.render)?;
        validate_notify(&self.notify)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).find(|path| path.exists())
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

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_timeout(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_crm(crm: &CrmConfig) -> Result<(), ConfigError> {
    if !is_http_url(crm.url.trim()) {
        return Err(ConfigError::Validation(
            "crm.url must start with http:// or https://".to_string(),
        ));
    }
    if crm.database.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crm.database is required (set LEADBRIDGE_CRM_DATABASE)".to_string(),
        ));
    }
    if crm.username.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crm.username is required (set LEADBRIDGE_CRM_USERNAME)".to_string(),
        ));
    }
    if crm.password.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "crm.password is required (set LEADBRIDGE_CRM_PASSWORD)".to_string(),
        ));
    }
    validate_timeout("crm.timeout_secs", crm.timeout_secs)?;
    if crm.lead_model.trim().is_empty() {
        return Err(ConfigError::Validation("crm.lead_model must not be empty".to_string()));
    }
    if crm.default_team_id <= 0 {
        return Err(ConfigError::Validation(
            "crm.default_team_id must be greater than zero".to_string(),
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

fn validate_quotation(quotation: &QuotationConfig) -> Result<(), ConfigError> {
    if quotation.validity_days == 0 || quotation.validity_days > 3650 {
        return Err(ConfigError::Validation(
            "quotation.validity_days must be in range 1..=3650".to_string(),
        ));
    }
    if quotation.tax_rate < Decimal::ZERO || quotation.tax_rate > Decimal::ONE {
        return Err(ConfigError::Validation(
            "quotation.tax_rate must be a fraction in range 0..=1".to_string(),
        ));
    }
    Ok(())
}

fn validate_render(render: &RenderConfig) -> Result<(), ConfigError> {
    validate_timeout("render.timeout_secs", render.timeout_secs)?;
    if let Some(path) = &render.wkhtmltopdf_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "render.wkhtmltopdf_path must not be blank when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_notify(notify: &NotifyConfig) -> Result<(), ConfigError> {
    validate_timeout("notify.timeout_secs", notify.timeout_secs)?;
    if let Some(url) = &notify.organization_url {
        if !is_http_url(url.trim()) {
            return Err(ConfigError::Validation(
                "notify.organization_url must start with http:// or https://".to_string(),
            ));
        }
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

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    crm: Option<CrmPatch>,
    server: Option<ServerPatch>,
    quotation: Option<QuotationPatch>,
    render: Option<RenderPatch>,
    notify: Option<NotifyPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    url: Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: Option<u64>,
    lead_model: Option<String>,
    default_team_id: Option<i64>,
    default_stage: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotationPatch {
    validity_days: Option<u32>,
    tax_rate: Option<Decimal>,
    company_name: Option<String>,
    template_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderPatch {
    wkhtmltopdf_path: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifyPatch {
    organization_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const CRM_VARS: [&str; 3] =
        ["LEADBRIDGE_CRM_DATABASE", "LEADBRIDGE_CRM_USERNAME", "LEADBRIDGE_CRM_PASSWORD"];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn set_crm_credentials() {
        env::set_var("LEADBRIDGE_CRM_DATABASE", "odoo-test");
        env::set_var("LEADBRIDGE_CRM_USERNAME", "bot@example.com");
        env::set_var("LEADBRIDGE_CRM_PASSWORD", "pw-from-env");
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ODOO_PASSWORD", "interpolated-secret");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("leadbridge.toml");
            fs::write(
                &path,
                r#"
[crm]
url = "https://odoo.example.com"
database = "prod"
username = "bot@example.com"
password = "${TEST_ODOO_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.crm.password.expose_secret() == "interpolated-secret",
                "password should be interpolated from environment",
            )?;
            ensure(config.crm.url == "https://odoo.example.com", "crm url should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_ODOO_PASSWORD"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_crm_credentials();
        env::set_var("LEADBRIDGE_CRM_URL", "https://from-env.example.com");
        env::set_var("LEADBRIDGE_QUOTATION_TAX_RATE", "0.08");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("leadbridge.toml");
            fs::write(
                &path,
                r#"
[crm]
url = "https://from-file.example.com"
database = "from-file"

[quotation]
validity_days = 30

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    server_port: Some(7001),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.crm.url == "https://from-env.example.com",
                "env crm url should win over file",
            )?;
            ensure(config.crm.database == "odoo-test", "env database should win over file")?;
            ensure(config.quotation.validity_days == 30, "file validity days should apply")?;
            ensure(
                config.quotation.tax_rate == Decimal::new(8, 2),
                "tax rate should parse from env",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.port == 7001, "override port should win")?;
            Ok(())
        })();

        clear_vars(&CRM_VARS);
        clear_vars(&["LEADBRIDGE_CRM_URL", "LEADBRIDGE_QUOTATION_TAX_RATE"]);
        result
    }

    #[test]
    fn defaults_keep_quotations_tax_free_for_fifteen_days() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_crm_credentials();

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.quotation.validity_days == 15, "default validity is 15 days")?;
            ensure(config.quotation.tax_rate.is_zero(), "default tax rate is zero")?;
            ensure(config.crm.timeout_secs == 30, "default crm timeout is 30s")?;
            ensure(config.crm.lead_model == "crm.lead", "default lead model is crm.lead")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&CRM_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_without_crm_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&CRM_VARS);

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => {
                return Err("expected validation failure but config load succeeded".to_string())
            }
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("crm.database")
        );
        ensure(has_message, "validation failure should mention crm.database")
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_crm_credentials();
        env::set_var("LEADBRIDGE_CRM_TIMEOUT_SECS", "soon");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override to fail".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "LEADBRIDGE_CRM_TIMEOUT_SECS", "error should name the env key")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&CRM_VARS);
        clear_vars(&["LEADBRIDGE_CRM_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn unbounded_crm_timeout_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_crm_credentials();
        env::set_var("LEADBRIDGE_CRM_TIMEOUT_SECS", "0");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected zero timeout to fail validation".to_string()),
            Err(ConfigError::Validation(message)) => {
                ensure(message.contains("crm.timeout_secs"), "message should name the key")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&CRM_VARS);
        clear_vars(&["LEADBRIDGE_CRM_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_crm_credentials();

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("pw-from-env"), "debug output should not contain password")
        })();

        clear_vars(&CRM_VARS);
        result
    }
}
