//! RFQ submission pipeline: validate, fill client gaps from the CRM, price, render,
//! then attach the PDF to the lead and note it in chatter.
//!
//! Only validation and rendering can fail a submission. Once the PDF exists the
//! caller always gets it; CRM attachment problems are reported on the outcome.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use leadbridge_core::domain::client::{ClientDetails, ClientInfo};
use leadbridge_core::domain::quotation::{QuotationDocument, QuotationNumber};
use leadbridge_core::domain::record::RecordId;
use leadbridge_core::errors::ApplicationError;
use leadbridge_core::rfq::{
    assemble, normalize, parse_expiration_date, QuotationNumberSource, QuotationPolicy,
    QuotationRequest, RfqForm,
};
use leadbridge_crm::{AttachmentPublisher, AttachmentRef, LeadRepository, PublishError};
use tracing::{error, info, warn};

use crate::pdf::PdfGenerator;

pub struct QuotationService {
    leads: LeadRepository,
    publisher: AttachmentPublisher,
    generator: Arc<PdfGenerator>,
    policy: QuotationPolicy,
    numbers: Arc<dyn QuotationNumberSource>,
}

#[derive(Debug)]
pub struct QuotationOutcome {
    pub pdf_bytes: Vec<u8>,
    pub filename: String,
    pub quotation_number: QuotationNumber,
    pub record_id: RecordId,
    pub document: QuotationDocument,
    /// Client fields exactly as submitted, before CRM or placeholder fill.
    pub submitted_client: ClientDetails,
    pub publish: Result<AttachmentRef, PublishError>,
    pub annotated: bool,
}

impl QuotationOutcome {
    pub fn attachment(&self) -> Option<AttachmentRef> {
        self.publish.as_ref().ok().copied()
    }
}

impl QuotationService {
    pub fn new(
        leads: LeadRepository,
        publisher: AttachmentPublisher,
        generator: Arc<PdfGenerator>,
        policy: QuotationPolicy,
        numbers: Arc<dyn QuotationNumberSource>,
    ) -> Self {
        Self { leads, publisher, generator, policy, numbers }
    }

    pub async fn submit(
        &self,
        form: RfqForm,
        correlation_id: &str,
    ) -> Result<QuotationOutcome, ApplicationError> {
        self.submit_on(form, Local::now().date_naive(), correlation_id).await
    }

    pub async fn submit_on(
        &self,
        form: RfqForm,
        today: NaiveDate,
        correlation_id: &str,
    ) -> Result<QuotationOutcome, ApplicationError> {
        let submission = form.validate().map_err(|validation| {
            warn!(
                event_name = "rfq.submission.rejected",
                correlation_id,
                error = %validation,
                "rfq submission rejected"
            );
            ApplicationError::from(validation)
        })?;
        let record_id = submission.target_record_id;

        let crm_client = if submission.client.is_complete() {
            None
        } else {
            match self.leads.client_details(record_id).await {
                Ok(details) => details,
                Err(crm_error) => {
                    warn!(
                        event_name = "rfq.client_lookup.failed",
                        correlation_id,
                        record_id = %record_id,
                        error = %crm_error,
                        "could not read client details from crm, using placeholders"
                    );
                    None
                }
            }
        };
        let client = ClientInfo::resolve(&submission.client, crm_client.as_ref());

        let rows = normalize(&submission.rows);
        if rows.truncated_rows > 0 {
            warn!(
                event_name = "rfq.rows.truncated",
                correlation_id,
                record_id = %record_id,
                dropped = rows.truncated_rows,
                "line item columns had different lengths; extra values ignored"
            );
        }
        if !rows.fallback_rows.is_empty() {
            warn!(
                event_name = "rfq.rows.defaulted",
                correlation_id,
                record_id = %record_id,
                rows = ?rows.fallback_rows,
                "unparseable quantity or price replaced with defaults"
            );
        }

        let expiration_override =
            submission.expiration_date.as_deref().and_then(|raw| match parse_expiration_date(raw) {
                Some(date) => Some(date),
                None => {
                    warn!(
                        event_name = "rfq.expiration.ignored",
                        correlation_id,
                        record_id = %record_id,
                        expiration_date = raw,
                        "unrecognised expiration date, using the default validity"
                    );
                    None
                }
            });

        let document = assemble(
            QuotationRequest {
                quotation_number: self.numbers.next_number(),
                issue_date: today,
                expiration_override,
                client,
                project: submission.project,
                line_items: rows.items,
            },
            &self.policy,
        );
        let quotation_number = document.quotation_number().clone();

        let pdf_bytes = self.generator.render_pdf(&document).await.map_err(|render| {
            error!(
                event_name = "rfq.render.failed",
                correlation_id,
                record_id = %record_id,
                quotation_number = %quotation_number,
                error = %render,
                "quotation pdf could not be generated"
            );
            ApplicationError::from(render)
        })?;

        let filename =
            document_filename(document.project().name.as_deref(), &quotation_number, record_id);

        let publish = self.publisher.publish(&pdf_bytes, &filename, record_id).await;
        let annotated = match &publish {
            Ok(attachment) => {
                let note = chatter_note(&document);
                match self.publisher.annotate(record_id, *attachment, &note).await {
                    Ok(_) => true,
                    Err(annotate_error) => {
                        warn!(
                            event_name = "rfq.annotate.failed",
                            correlation_id,
                            record_id = %record_id,
                            attachment_id = %attachment,
                            error = %annotate_error,
                            "pdf attached but the chatter note could not be posted"
                        );
                        false
                    }
                }
            }
            Err(publish_error) => {
                error!(
                    event_name = "rfq.publish.failed",
                    correlation_id,
                    record_id = %record_id,
                    quotation_number = %quotation_number,
                    error = %publish_error,
                    "pdf could not be attached to the crm record"
                );
                false
            }
        };

        info!(
            event_name = "rfq.quotation.rendered",
            correlation_id,
            record_id = %record_id,
            quotation_number = %quotation_number,
            line_items = document.line_items().len(),
            total = %document.total(),
            attached = publish.is_ok(),
            annotated,
            "quotation generated"
        );

        Ok(QuotationOutcome {
            pdf_bytes,
            filename,
            quotation_number,
            record_id,
            document,
            submitted_client: submission.client,
            publish,
            annotated,
        })
    }
}

/// `RFQ_<project>_<record>.pdf`, with anything outside `[A-Za-z0-9]` replaced by `_`.
/// Falls back to the quotation number when there is no usable project name.
pub fn document_filename(
    project_name: Option<&str>,
    quotation_number: &QuotationNumber,
    record_id: RecordId,
) -> String {
    let slug = project_name
        .map(str::trim)
        .filter(|name| name.chars().any(|ch| ch.is_ascii_alphanumeric()))
        .map(|name| {
            name.chars().map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' }).collect()
        })
        .unwrap_or_else(|| quotation_number.as_str().replace('-', "_"));
    format!("RFQ_{slug}_{record_id}.pdf")
}

fn chatter_note(document: &QuotationDocument) -> String {
    let subject = document
        .project()
        .name
        .as_deref()
        .unwrap_or_else(|| document.quotation_number().as_str());
    format!(
        "<p>RFQ PDF generated for <b>{}</b> (quotation {}, total {:.2}).</p>",
        tera::escape_html(subject),
        document.quotation_number(),
        document.total(),
    )
}
