//! Quotation rendering: Tera markup, then HTML to PDF through a [`PdfConverter`].
//!
//! Templates are loaded from `quotation.template_dir` when configured; anything missing
//! there falls back to the copies embedded in the binary. Template names end in `.html`
//! so Tera autoescapes every interpolated value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leadbridge_core::config::AppConfig;
use leadbridge_core::domain::quotation::QuotationDocument;
use leadbridge_core::errors::RenderError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const QUOTATION_TEMPLATE: &str = "quotation.html";
pub const RFQ_FORM_TEMPLATE: &str = "rfq_form.html";

const EMBEDDED_TEMPLATES: [(&str, &str); 2] = [
    (QUOTATION_TEMPLATE, include_str!("../../../templates/quotation.html")),
    (RFQ_FORM_TEMPLATE, include_str!("../../../templates/rfq_form.html")),
];

/// Register custom Tera filters used by the templates.
///
/// - `money`: decimal text or number rounded half away from zero to 2 places, e.g. `total | money`
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(raw) => Decimal::from_str(raw.trim())
            .map_err(|error| tera::Error::msg(format!("money filter: `{raw}`: {error}")))?,
        tera::Value::Number(number) => Decimal::from_str(&number.to_string())
            .map_err(|error| tera::Error::msg(format!("money filter: {number}: {error}")))?,
        tera::Value::Null => Decimal::ZERO,
        other => return Err(tera::Error::msg(format!("money filter cannot format {other}"))),
    };
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Ok(tera::Value::String(format!("{rounded:.2}")))
}

/// Flattens Tera's error chain; the top-level message alone rarely names the cause.
fn template_error(error: tera::Error) -> RenderError {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    RenderError::Template(message)
}

pub fn load_templates(template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut tera = match template_dir {
        Some(dir) => {
            let pattern = format!("{}/**/*.html", dir.display());
            Tera::new(&pattern).map_err(template_error)?
        }
        None => Tera::default(),
    };
    register_template_filters(&mut tera);

    for (name, body) in EMBEDDED_TEMPLATES {
        if tera.get_template_names().any(|loaded| loaded == name) {
            debug!(template = name, "using template from template_dir");
            continue;
        }
        tera.add_raw_template(name, body).map_err(template_error)?;
    }
    Ok(tera)
}

#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(&self, html: &str) -> Result<Vec<u8>, RenderError>;

    /// Whether `convert` can run at all; used by health checks.
    fn is_available(&self) -> bool;

    fn describe(&self) -> String;
}

/// Shells out to `wkhtmltopdf` with A4 pages and 10mm margins.
#[derive(Clone, Debug)]
pub struct Wkhtmltopdf {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl Wkhtmltopdf {
    /// Resolves the configured path (or `wkhtmltopdf` on `PATH`). A missing binary is
    /// not an error here; conversions fail with `ConverterUnavailable` instead.
    pub fn locate(configured: Option<&str>, timeout_secs: u64) -> Self {
        let binary = which::which(configured.unwrap_or("wkhtmltopdf")).ok();
        match &binary {
            Some(path) => info!(path = %path.display(), "wkhtmltopdf found"),
            None => warn!(
                event_name = "system.render.converter_missing",
                configured = configured.unwrap_or("wkhtmltopdf"),
                "wkhtmltopdf not found - quotation requests will fail until it is installed"
            ),
        }
        Self { binary, timeout: Duration::from_secs(timeout_secs) }
    }

    async fn run(
        &self,
        binary: &Path,
        html_path: &Path,
        pdf_path: &Path,
    ) -> Result<Vec<u8>, RenderError> {
        let mut command = Command::new(binary);
        command
            .args(["--quiet", "--page-size", "A4"])
            .args(["--margin-top", "10mm", "--margin-bottom", "10mm"])
            .args(["--margin-left", "10mm", "--margin-right", "10mm"])
            .args(["--encoding", "utf-8"])
            .arg(html_path)
            .arg(pdf_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => output?,
            Err(_) => return Err(RenderError::Timeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Conversion(format!(
                "wkhtmltopdf exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(pdf_path).await?;
        if bytes.is_empty() {
            return Err(RenderError::Conversion("wkhtmltopdf produced an empty file".to_string()));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl PdfConverter for Wkhtmltopdf {
    async fn convert(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let binary = self.binary.as_deref().ok_or(RenderError::ConverterUnavailable)?;

        let token = Uuid::new_v4();
        let temp_dir = std::env::temp_dir();
        let html_path = temp_dir.join(format!("leadbridge_{token}.html"));
        let pdf_path = temp_dir.join(format!("leadbridge_{token}.pdf"));

        tokio::fs::write(&html_path, html).await?;
        let result = self.run(binary, &html_path, &pdf_path).await;

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;
        result
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn describe(&self) -> String {
        match &self.binary {
            Some(path) => format!("wkhtmltopdf at {}", path.display()),
            None => "wkhtmltopdf not found".to_string(),
        }
    }
}

/// Values for the RFQ entry page.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RfqFormPage {
    pub lead_id: i64,
    pub project_name: String,
    pub project_description: String,
    pub project_category: String,
}

pub struct PdfGenerator {
    tera: Tera,
    converter: Arc<dyn PdfConverter>,
    company_name: String,
}

impl PdfGenerator {
    pub fn new(
        tera: Tera,
        converter: Arc<dyn PdfConverter>,
        company_name: impl Into<String>,
    ) -> Self {
        Self { tera, converter, company_name: company_name.into() }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RenderError> {
        let tera = load_templates(config.quotation.template_dir.as_deref())?;
        let converter = Wkhtmltopdf::locate(
            config.render.wkhtmltopdf_path.as_deref(),
            config.render.timeout_secs,
        );
        Ok(Self::new(tera, Arc::new(converter), config.quotation.company_name.clone()))
    }

    pub fn converter(&self) -> Arc<dyn PdfConverter> {
        Arc::clone(&self.converter)
    }

    pub fn render_html(&self, document: &QuotationDocument) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("quotation", document);
        context.insert("company_name", &self.company_name);
        context.insert("show_tax", &!document.tax().is_zero());

        self.tera.render(QUOTATION_TEMPLATE, &context).map_err(template_error)
    }

    pub async fn render_pdf(&self, document: &QuotationDocument) -> Result<Vec<u8>, RenderError> {
        let html = self.render_html(document)?;
        self.converter.convert(&html).await
    }

    pub fn render_rfq_form(&self, page: &RfqFormPage) -> Result<String, RenderError> {
        let mut context = Context::from_serialize(page).map_err(template_error)?;
        context.insert("company_name", &self.company_name);
        self.tera.render(RFQ_FORM_TEMPLATE, &context).map_err(template_error)
    }
}
