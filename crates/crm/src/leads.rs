use std::sync::Arc;

use leadbridge_core::config::CrmConfig;
use leadbridge_core::domain::client::ClientDetails;
use leadbridge_core::domain::lead::LeadDraft;
use leadbridge_core::domain::record::RecordId;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::gateway::{CrmError, CrmGateway, RecordValues};
use crate::query::SearchDomain;

pub const STAGE_MODEL: &str = "crm.stage";
pub const PROJECT_NAME_FIELD: &str = "x_studio_project_name_1";
pub const PROJECT_DESCRIPTION_FIELD: &str = "x_studio_project_description_1";
pub const PROJECT_CATEGORY_FIELD: &str = "x_studio_project_category_1";

const CLIENT_FIELDS: [&str; 6] =
    ["partner_name", "contact_name", "street", "city", "email_from", "phone"];
const PROJECT_FIELDS: [&str; 4] =
    ["name", PROJECT_NAME_FIELD, PROJECT_DESCRIPTION_FIELD, PROJECT_CATEGORY_FIELD];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadSettings {
    pub lead_model: String,
    pub default_team_id: i64,
    pub default_stage: String,
}

impl From<&CrmConfig> for LeadSettings {
    fn from(config: &CrmConfig) -> Self {
        Self {
            lead_model: config.lead_model.clone(),
            default_team_id: config.default_team_id,
            default_stage: config.default_stage.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeadOutcome {
    Created(RecordId),
    Duplicate(RecordId),
}

impl LeadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Duplicate(_) => "duplicate",
        }
    }

    pub fn record_id(&self) -> RecordId {
        match self {
            Self::Created(id) | Self::Duplicate(id) => *id,
        }
    }
}

/// Project fields of a lead, as filled in by the CRM's custom studio fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub id: RecordId,
    pub name: Option<String>,
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_category: Option<String>,
}

/// Lead/opportunity queries against the configured lead model.
#[derive(Clone)]
pub struct LeadRepository {
    gateway: Arc<dyn CrmGateway>,
    settings: LeadSettings,
}

impl LeadRepository {
    pub fn new(gateway: Arc<dyn CrmGateway>, settings: LeadSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn lead_model(&self) -> &str {
        &self.settings.lead_model
    }

    /// Creates an opportunity unless one with the same email already exists.
    pub async fn intake(&self, draft: &LeadDraft) -> Result<LeadOutcome, CrmError> {
        if let Some(email) = draft.email.as_deref() {
            if let Some(existing) = self.find_by_email(email).await?.first().copied() {
                warn!(
                    event_name = "lead.intake.duplicate",
                    record_id = %existing,
                    lead_name = %draft.name,
                    "lead with this email already exists"
                );
                return Ok(LeadOutcome::Duplicate(existing));
            }
        }

        let stage_id = self.stage_id(&self.settings.default_stage).await?;
        let record_id = self.create_opportunity(draft, stage_id).await?;
        info!(
            event_name = "lead.intake.created",
            record_id = %record_id,
            lead_type = %draft.lead_type,
            "opportunity created"
        );
        Ok(LeadOutcome::Created(record_id))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Vec<RecordId>, CrmError> {
        let domain = SearchDomain::new().eq("email_from", email);
        self.gateway.search(&self.settings.lead_model, &domain, None).await
    }

    pub async fn stage_id(&self, stage_name: &str) -> Result<Option<RecordId>, CrmError> {
        let domain = SearchDomain::new().eq("name", stage_name);
        let ids = self.gateway.search(STAGE_MODEL, &domain, Some(1)).await?;
        Ok(ids.first().copied())
    }

    pub async fn create_opportunity(
        &self,
        draft: &LeadDraft,
        stage_id: Option<RecordId>,
    ) -> Result<RecordId, CrmError> {
        let mut values = RecordValues::new();
        values.insert("name".to_string(), Value::from(draft.name.as_str()));
        values.insert("description".to_string(), Value::from(draft.description.as_str()));
        values.insert("type".to_string(), Value::from("opportunity"));
        values.insert("team_id".to_string(), Value::from(self.settings.default_team_id));
        for (field, value) in
            [("email_from", &draft.email), ("phone", &draft.phone), ("city", &draft.city)]
        {
            if let Some(value) = value {
                values.insert(field.to_string(), Value::from(value.as_str()));
            }
        }
        if let Some(stage_id) = stage_id {
            values.insert("stage_id".to_string(), Value::from(stage_id.0));
        }

        self.gateway.create(&self.settings.lead_model, values).await
    }

    /// Contact details stored on the lead, used to fill gaps in a submitted form.
    pub async fn client_details(&self, id: RecordId) -> Result<Option<ClientDetails>, CrmError> {
        let rows = self.gateway.read(&self.settings.lead_model, &[id], &CLIENT_FIELDS).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let address = [text_field(row, "street"), text_field(row, "city")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Some(ClientDetails {
            name: text_field(row, "partner_name").or_else(|| text_field(row, "contact_name")),
            address: (!address.is_empty()).then_some(address),
            email: text_field(row, "email_from"),
            phone: text_field(row, "phone"),
        }))
    }

    pub async fn find_project(
        &self,
        name: &str,
        description: &str,
        category: &str,
    ) -> Result<Option<ProjectRecord>, CrmError> {
        let domain = SearchDomain::new()
            .eq(PROJECT_NAME_FIELD, name)
            .eq(PROJECT_DESCRIPTION_FIELD, description)
            .eq(PROJECT_CATEGORY_FIELD, category);
        let ids = self.gateway.search(&self.settings.lead_model, &domain, Some(1)).await?;
        let Some(first) = ids.first().copied() else {
            return Ok(None);
        };

        let rows = self.gateway.read(&self.settings.lead_model, &[first], &PROJECT_FIELDS).await?;
        Ok(rows.first().map(|row| ProjectRecord {
            id: first,
            name: text_field(row, "name"),
            project_name: text_field(row, PROJECT_NAME_FIELD),
            project_description: text_field(row, PROJECT_DESCRIPTION_FIELD),
            project_category: text_field(row, PROJECT_CATEGORY_FIELD),
        }))
    }

    /// True when a lead in a stage named like "won" exists, optionally matching `name`.
    pub async fn won_lead_exists(&self, name: Option<&str>) -> Result<bool, CrmError> {
        let mut domain = SearchDomain::new().ilike("stage_id.name", "won");
        if let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) {
            domain = domain.ilike("name", name);
        }
        let ids = self.gateway.search(&self.settings.lead_model, &domain, Some(1)).await?;
        Ok(!ids.is_empty())
    }
}

/// Unset CRM fields come back as `false`; only non-blank text counts.
fn text_field(row: &RecordValues, field: &str) -> Option<String> {
    row.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use leadbridge_core::domain::lead::{LeadDraft, LeadFields};
    use leadbridge_core::domain::record::RecordId;
    use serde_json::{json, Value};

    use super::{LeadOutcome, LeadRepository, LeadSettings, STAGE_MODEL};
    use crate::gateway::RecordValues;
    use crate::memory::{CrmMethod, InMemoryCrm};

    fn values(value: Value) -> RecordValues {
        value.as_object().cloned().expect("object literal")
    }

    fn settings() -> LeadSettings {
        LeadSettings {
            lead_model: "crm.lead".to_string(),
            default_team_id: 1,
            default_stage: "New".to_string(),
        }
    }

    fn draft(email: Option<&str>) -> LeadDraft {
        let mut pairs = vec![("firstname", "Ada"), ("lastname", "Lovelace"), ("city", "London")];
        if let Some(email) = email {
            pairs.push(("email", email));
        }
        LeadDraft::from_fields(&pairs.into_iter().collect::<LeadFields>(), Some("IQL"))
    }

    #[tokio::test]
    async fn intake_creates_an_opportunity_in_the_default_stage() {
        let crm = Arc::new(InMemoryCrm::new());
        let stage = crm.insert(STAGE_MODEL, values(json!({"name": "New"}))).await;
        let repository = LeadRepository::new(crm.clone(), settings());

        let outcome = repository.intake(&draft(Some("ada@example.com"))).await.expect("intake");

        let LeadOutcome::Created(id) = outcome.clone() else {
            panic!("expected a created lead, got {outcome:?}");
        };
        let stored = crm.record("crm.lead", id).await.expect("stored lead");
        assert_eq!(stored.get("name"), Some(&json!("Ada Lovelace")));
        assert_eq!(stored.get("type"), Some(&json!("opportunity")));
        assert_eq!(stored.get("team_id"), Some(&json!(1)));
        assert_eq!(stored.get("stage_id"), Some(&json!(stage.0)));
        assert_eq!(stored.get("email_from"), Some(&json!("ada@example.com")));
        assert_eq!(stored.get("description"), Some(&json!("Lead from HubSpot (IQL)")));
    }

    #[tokio::test]
    async fn existing_email_is_not_created_again() {
        let crm = Arc::new(InMemoryCrm::new());
        let existing =
            crm.insert("crm.lead", values(json!({"email_from": "ada@example.com"}))).await;
        let repository = LeadRepository::new(crm.clone(), settings());

        let outcome = repository.intake(&draft(Some("ada@example.com"))).await.expect("intake");

        assert_eq!(outcome, LeadOutcome::Duplicate(existing));
        assert_eq!(crm.count_calls("crm.lead", CrmMethod::Create).await, 0);
    }

    #[tokio::test]
    async fn leads_without_email_skip_deduplication() {
        let crm = Arc::new(InMemoryCrm::new());
        let repository = LeadRepository::new(crm.clone(), settings());

        let outcome = repository.intake(&draft(None)).await.expect("intake");

        assert_eq!(outcome.as_str(), "created");
        assert_eq!(crm.count_calls("crm.lead", CrmMethod::Search).await, 0);
        let stored = crm.record("crm.lead", outcome.record_id()).await.expect("stored");
        assert!(stored.get("stage_id").is_none());
        assert!(stored.get("email_from").is_none());
    }

    #[tokio::test]
    async fn client_details_combine_street_and_city() {
        let crm = Arc::new(InMemoryCrm::new());
        let id = crm
            .insert(
                "crm.lead",
                values(json!({
                    "contact_name": "Ada Lovelace",
                    "street": "12 St James's Square",
                    "city": "London",
                    "email_from": false,
                    "phone": "555-0100",
                })),
            )
            .await;
        let repository = LeadRepository::new(crm, settings());

        let details = repository.client_details(id).await.expect("read").expect("lead exists");

        assert_eq!(details.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(details.address.as_deref(), Some("12 St James's Square, London"));
        assert_eq!(details.email, None);
        assert_eq!(details.phone.as_deref(), Some("555-0100"));
    }

    #[tokio::test]
    async fn client_details_of_unknown_lead_is_none() {
        let repository = LeadRepository::new(Arc::new(InMemoryCrm::new()), settings());
        assert_eq!(repository.client_details(RecordId(77)).await.expect("read"), None);
    }

    #[tokio::test]
    async fn project_lookup_requires_all_three_fields_to_match() {
        let crm = Arc::new(InMemoryCrm::new());
        let id = crm
            .insert(
                "crm.lead",
                values(json!({
                    "name": "Roof job",
                    "x_studio_project_name_1": "Solar Roof",
                    "x_studio_project_description_1": "10kW array",
                    "x_studio_project_category_1": "Residential",
                })),
            )
            .await;
        let repository = LeadRepository::new(crm, settings());

        let found = repository
            .find_project("Solar Roof", "10kW array", "Residential")
            .await
            .expect("lookup")
            .expect("project");
        assert_eq!(found.id, id);
        assert_eq!(found.name.as_deref(), Some("Roof job"));
        assert_eq!(found.project_category.as_deref(), Some("Residential"));

        let missing = repository
            .find_project("Solar Roof", "10kW array", "Commercial")
            .await
            .expect("lookup");
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn won_check_filters_by_stage_and_optional_name() {
        let crm = Arc::new(InMemoryCrm::new());
        crm.insert("crm.lead", values(json!({"name": "Solar Roof", "stage_id": [4, "Won"]})))
            .await;
        crm.insert("crm.lead", values(json!({"name": "Wind Farm", "stage_id": [1, "New"]})))
            .await;
        let repository = LeadRepository::new(crm, settings());

        assert!(repository.won_lead_exists(None).await.expect("search"));
        assert!(repository.won_lead_exists(Some("solar")).await.expect("search"));
        assert!(!repository.won_lead_exists(Some("Wind")).await.expect("search"));
    }
}
