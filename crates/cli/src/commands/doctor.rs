use leadbridge_core::config::{AppConfig, LoadOptions};
use leadbridge_crm::{CrmGateway, OdooClient};
use serde::Serialize;

use crate::commands::CommandResult;

const DEFAULT_CONVERTER: &str = "wkhtmltopdf";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_renderer(&config));
            checks.push(check_crm_authentication(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["renderer_availability", "crm_authentication"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_renderer(config: &AppConfig) -> DoctorCheck {
    let requested = config.render.wkhtmltopdf_path.as_deref().unwrap_or(DEFAULT_CONVERTER);

    match which::which(requested) {
        Ok(path) => DoctorCheck {
            name: "renderer_availability",
            status: CheckStatus::Pass,
            details: format!("found converter at `{}`", path.display()),
        },
        Err(error) => DoctorCheck {
            name: "renderer_availability",
            status: CheckStatus::Fail,
            details: format!("`{requested}` not found: {error}"),
        },
    }
}

fn check_crm_authentication(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "crm_authentication",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let client = OdooClient::from_config(&config.crm)
            .map_err(|error| format!("failed to build crm client: {error}"))?;
        let uid = client
            .authenticate()
            .await
            .map_err(|error| format!("login against `{}` failed: {error}", client.endpoint()))?;
        Ok::<i64, String>(uid)
    });

    match result {
        Ok(uid) => DoctorCheck {
            name: "crm_authentication",
            status: CheckStatus::Pass,
            details: format!(
                "authenticated as uid {uid} on `{}` ({})",
                config.crm.url, config.crm.database
            ),
        },
        Err(error) => {
            DoctorCheck { name: "crm_authentication", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
