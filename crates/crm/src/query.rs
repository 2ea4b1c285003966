use serde::ser::{Serialize, SerializeSeq, SerializeTuple, Serializer};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ilike,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ilike => "ilike",
        }
    }
}

/// One `(field, operator, value)` filter triple.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut triple = serializer.serialize_tuple(3)?;
        triple.serialize_element(&self.field)?;
        triple.serialize_element(self.operator.as_str())?;
        triple.serialize_element(&self.value)?;
        triple.end()
    }
}

/// Conditions joined with logical AND. Serializes as `[[field, op, value], ...]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchDomain {
    conditions: Vec<Condition>,
}

impl SearchDomain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions.push(Condition { field: field.into(), operator, value: value.into() });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Operator::Eq, value)
    }

    pub fn ilike(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Operator::Ilike, value)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl Serialize for SearchDomain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.conditions.len()))?;
        for condition in &self.conditions {
            seq.serialize_element(condition)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Operator, SearchDomain};

    #[test]
    fn domain_serializes_as_list_of_triples() {
        let domain = SearchDomain::new()
            .ilike("stage_id.name", "won")
            .eq("team_id", 1)
            .with("name", Operator::Ilike, "roof");

        let value = serde_json::to_value(&domain).expect("serialize");

        assert_eq!(
            value,
            json!([
                ["stage_id.name", "ilike", "won"],
                ["team_id", "=", 1],
                ["name", "ilike", "roof"]
            ])
        );
    }

    #[test]
    fn empty_domain_matches_everything() {
        let domain = SearchDomain::new();
        assert!(domain.is_empty());
        assert_eq!(serde_json::to_value(&domain).expect("serialize"), json!([]));
    }
}
