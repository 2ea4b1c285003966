use std::sync::Arc;

use leadbridge_core::config::AppConfig;
use leadbridge_core::errors::RenderError;
use leadbridge_crm::{CrmError, CrmGateway, OdooClient};
use thiserror::Error;
use tracing::{info, warn};

use crate::notify::{NotifyError, OrganizationNotifier};
use crate::pdf::PdfGenerator;

pub struct Application {
    pub config: AppConfig,
    pub gateway: Arc<dyn CrmGateway>,
    pub generator: Arc<PdfGenerator>,
    pub notifier: Option<Arc<OrganizationNotifier>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("crm client could not be created: {0}")]
    CrmClient(#[source] CrmError),
    #[error("crm authentication failed at startup: {0}")]
    CrmAuthentication(#[source] CrmError),
    #[error("quotation templates could not be loaded: {0}")]
    Templates(#[source] RenderError),
    #[error("organization notifier could not be created: {0}")]
    Notifier(#[source] NotifyError),
}

/// Connects to the CRM and logs in before anything is served.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        crm_url = %config.crm.url,
        "starting application bootstrap"
    );

    let client = OdooClient::from_config(&config.crm).map_err(BootstrapError::CrmClient)?;
    let uid = client.authenticate().await.map_err(BootstrapError::CrmAuthentication)?;
    info!(
        event_name = "system.bootstrap.crm_authenticated",
        correlation_id = "bootstrap",
        uid,
        database = %config.crm.database,
        "crm session established"
    );

    assemble_application(config, Arc::new(client))
}

/// Builds everything that does not need the network around an existing gateway.
pub fn assemble_application(
    config: AppConfig,
    gateway: Arc<dyn CrmGateway>,
) -> Result<Application, BootstrapError> {
    let generator = PdfGenerator::from_config(&config).map_err(BootstrapError::Templates)?;
    let converter = generator.converter();
    if !converter.is_available() {
        warn!(
            event_name = "system.bootstrap.renderer_unavailable",
            correlation_id = "bootstrap",
            renderer = %converter.describe(),
            "pdf converter unavailable; quotation requests will fail"
        );
    }

    let notifier = OrganizationNotifier::from_config(&config.notify)
        .map_err(BootstrapError::Notifier)?
        .map(Arc::new);
    if let Some(notifier) = &notifier {
        info!(
            event_name = "system.bootstrap.notifier_enabled",
            correlation_id = "bootstrap",
            url = %notifier.url(),
            "organization notifier enabled"
        );
    }

    Ok(Application { config, gateway, generator: Arc::new(generator), notifier })
}
