use std::env;
use std::sync::{Mutex, OnceLock};

use leadbridge_cli::commands::{config, doctor};
use serde_json::Value;

const VALID_CRM: [(&str, &str); 4] = [
    ("LEADBRIDGE_CRM_URL", "http://127.0.0.1:1"),
    ("LEADBRIDGE_CRM_DATABASE", "leads"),
    ("LEADBRIDGE_CRM_USERNAME", "bot@example.com"),
    ("LEADBRIDGE_CRM_PASSWORD", "hunter2"),
];

#[test]
fn config_returns_validation_failure_without_a_database() {
    with_env(&[("LEADBRIDGE_CRM_USERNAME", "bot@example.com")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().is_some_and(|message| message.contains("crm")));
    });
}

#[test]
fn config_attributes_sources_and_redacts_the_password() {
    let mut vars = VALID_CRM.to_vec();
    vars.push(("LEADBRIDGE_SERVER_PORT", "9090"));

    with_env(&vars, || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        let output = result.output;
        assert!(output.starts_with("effective config"));
        assert!(output.contains("- server.port = 9090 (source: env (LEADBRIDGE_SERVER_PORT))"));
        assert!(output.contains("- crm.password = <redacted>"));
        assert!(!output.contains("hunter2"), "password leaked: {output}");
        assert!(output.contains("- quotation.validity_days = 15 (source: default)"));
    });
}

#[test]
fn doctor_json_reports_each_failed_check() {
    let mut vars = VALID_CRM.to_vec();
    vars.push(("LEADBRIDGE_RENDER_WKHTMLTOPDF_PATH", "/nonexistent/leadbridge/wkhtmltopdf"));
    vars.push(("LEADBRIDGE_CRM_TIMEOUT_SECS", "2"));

    with_env(&vars, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");

        let checks = payload["checks"].as_array().expect("checks array");
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("renderer_availability"), "fail");
        assert_eq!(status_of("crm_authentication"), "fail");
    });
}

#[test]
fn doctor_skips_network_checks_when_config_fails() {
    with_env(&[], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] renderer_availability"));
        assert!(result.output.contains("- [skip] crm_authentication"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys: Vec<String> =
        env::vars().map(|(key, _)| key).filter(|key| key.starts_with("LEADBRIDGE_")).collect();
    let previous_values: Vec<(String, String)> = keys
        .iter()
        .filter_map(|key| env::var(key).ok().map(|value| (key.clone(), value)))
        .collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, _) in vars {
        env::remove_var(key);
    }
    for (key, value) in previous_values {
        env::set_var(key, value);
    }
}
