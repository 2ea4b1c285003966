use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use leadbridge_core::domain::record::RecordId;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::gateway::{ChatterMessage, CrmError, CrmGateway, RecordValues};
use crate::query::{Condition, Operator, SearchDomain};

/// Model name that `authenticate` failures are registered under.
pub const AUTH_MODEL: &str = "res.users";
const MEMORY_UID: i64 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CrmMethod {
    Authenticate,
    Search,
    Read,
    Create,
    Write,
    MessagePost,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrmCall {
    pub method: CrmMethod,
    pub model: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub id: i64,
    pub model: String,
    pub record_id: RecordId,
    pub message: ChatterMessage,
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<String, BTreeMap<i64, RecordValues>>,
    messages: Vec<PostedMessage>,
    calls: Vec<CrmCall>,
    failures: HashMap<(String, CrmMethod), CrmError>,
    last_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// CRM held in process memory. Records every call and can be told to fail.
#[derive(Default)]
pub struct InMemoryCrm {
    state: RwLock<MemoryState>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record without logging a call.
    pub async fn insert(&self, model: &str, mut values: RecordValues) -> RecordId {
        let mut state = self.state.write().await;
        let id = state.next_id();
        values.insert("id".to_string(), Value::from(id));
        state.records.entry(model.to_string()).or_default().insert(id, values);
        RecordId(id)
    }

    /// Every later `method` call on `model` fails with `error` until cleared.
    pub async fn fail_on(&self, model: &str, method: CrmMethod, error: CrmError) {
        self.state.write().await.failures.insert((model.to_string(), method), error);
    }

    pub async fn fail_authentication(&self, error: CrmError) {
        self.fail_on(AUTH_MODEL, CrmMethod::Authenticate, error).await;
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    pub async fn calls(&self) -> Vec<CrmCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn count_calls(&self, model: &str, method: CrmMethod) -> usize {
        let state = self.state.read().await;
        state.calls.iter().filter(|call| call.method == method && call.model == model).count()
    }

    pub async fn records(&self, model: &str) -> Vec<RecordValues> {
        let state = self.state.read().await;
        state.records.get(model).map(|rows| rows.values().cloned().collect()).unwrap_or_default()
    }

    pub async fn record(&self, model: &str, id: RecordId) -> Option<RecordValues> {
        let state = self.state.read().await;
        state.records.get(model).and_then(|rows| rows.get(&id.0)).cloned()
    }

    pub async fn messages(&self) -> Vec<PostedMessage> {
        self.state.read().await.messages.clone()
    }

    async fn begin(&self, model: &str, method: CrmMethod) -> Result<(), CrmError> {
        let mut state = self.state.write().await;
        state.calls.push(CrmCall { method, model: model.to_string() });
        match state.failures.get(&(model.to_string(), method)) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CrmGateway for InMemoryCrm {
    async fn authenticate(&self) -> Result<i64, CrmError> {
        self.begin(AUTH_MODEL, CrmMethod::Authenticate).await?;
        Ok(MEMORY_UID)
    }

    async fn search(
        &self,
        model: &str,
        domain: &SearchDomain,
        limit: Option<u32>,
    ) -> Result<Vec<RecordId>, CrmError> {
        self.begin(model, CrmMethod::Search).await?;
        let state = self.state.read().await;
        let Some(rows) = state.records.get(model) else {
            return Ok(Vec::new());
        };

        let limit = limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(rows
            .iter()
            .filter(|(_, values)| domain.conditions().iter().all(|c| matches(values, c)))
            .map(|(id, _)| RecordId(*id))
            .take(limit)
            .collect())
    }

    async fn read(
        &self,
        model: &str,
        ids: &[RecordId],
        fields: &[&str],
    ) -> Result<Vec<RecordValues>, CrmError> {
        self.begin(model, CrmMethod::Read).await?;
        let state = self.state.read().await;
        let Some(rows) = state.records.get(model) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| rows.get(&id.0))
            .map(|values| {
                if fields.is_empty() {
                    return values.clone();
                }
                let mut projected = RecordValues::new();
                projected.insert("id".to_string(), values.get("id").cloned().unwrap_or_default());
                for field in fields {
                    // unset fields read back as `false`, as the real server does
                    let value = values.get(*field).cloned().unwrap_or(Value::Bool(false));
                    projected.insert((*field).to_string(), value);
                }
                projected
            })
            .collect())
    }

    async fn create(&self, model: &str, mut values: RecordValues) -> Result<RecordId, CrmError> {
        self.begin(model, CrmMethod::Create).await?;
        let mut state = self.state.write().await;
        let id = state.next_id();
        values.insert("id".to_string(), Value::from(id));
        state.records.entry(model.to_string()).or_default().insert(id, values);
        Ok(RecordId(id))
    }

    async fn write(
        &self,
        model: &str,
        ids: &[RecordId],
        values: RecordValues,
    ) -> Result<bool, CrmError> {
        self.begin(model, CrmMethod::Write).await?;
        let mut state = self.state.write().await;
        let rows = state.records.entry(model.to_string()).or_default();
        if let Some(missing) = ids.iter().find(|id| !rows.contains_key(&id.0)) {
            return Err(missing_record(model, *missing));
        }

        for id in ids {
            if let Some(row) = rows.get_mut(&id.0) {
                row.extend(values.clone());
            }
        }
        Ok(true)
    }

    async fn message_post(
        &self,
        model: &str,
        id: RecordId,
        message: &ChatterMessage,
    ) -> Result<i64, CrmError> {
        self.begin(model, CrmMethod::MessagePost).await?;
        let mut state = self.state.write().await;
        let exists = state.records.get(model).is_some_and(|rows| rows.contains_key(&id.0));
        if !exists {
            return Err(missing_record(model, id));
        }

        let message_id = state.next_id();
        state.messages.push(PostedMessage {
            id: message_id,
            model: model.to_string(),
            record_id: id,
            message: message.clone(),
        });
        Ok(message_id)
    }
}

fn missing_record(model: &str, id: RecordId) -> CrmError {
    CrmError::Remote { code: 200, message: format!("record {model}({id}) does not exist") }
}

fn matches(values: &RecordValues, condition: &Condition) -> bool {
    let actual = lookup(values, &condition.field);
    match condition.operator {
        Operator::Eq => actual.is_some_and(|actual| same_value(actual, &condition.value)),
        Operator::Ilike => contains_ignoring_case(actual, &condition.value),
    }
}

/// Resolves `field` or `relation.subfield`. Many-to-one values are `[id, display_name]`.
fn lookup<'a>(values: &'a RecordValues, field: &str) -> Option<&'a Value> {
    let Some((relation, subfield)) = field.split_once('.') else {
        return values.get(field);
    };
    match values.get(relation)? {
        Value::Object(related) => related.get(subfield),
        Value::Array(pair) if pair.len() == 2 => match subfield {
            "id" => pair.first(),
            "name" | "display_name" => pair.get(1),
            _ => None,
        },
        _ => None,
    }
}

fn same_value(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    // a many-to-one compares equal to its id
    matches!(actual, Value::Array(pair) if pair.len() == 2 && pair.first() == Some(expected))
}

fn contains_ignoring_case(actual: Option<&Value>, pattern: &Value) -> bool {
    let (Some(Value::String(actual)), Some(pattern)) = (actual, pattern.as_str()) else {
        return false;
    };
    actual.to_lowercase().contains(&pattern.to_lowercase())
}
