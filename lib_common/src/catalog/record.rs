//! # Projected Record
//!
//! A full PokeAPI record carries dozens of fields; only `id`, `name` and
//! `abilities` are persisted.

use crate::errors::IngestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The reduced record written to storage. Field order here is the field
/// order of the stored JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedRecord {
    /// Catalog identifier, the numeric sort key of stored objects.
    pub id: u64,
    /// Record name, the second half of the object key.
    pub name: String,
    /// Ability entries, kept verbatim.
    pub abilities: Vec<Value>,
}

/// Reduces a full catalog record to `{id, name, abilities}`.
///
/// # Errors
/// `IngestError::MalformedRecord` if the input is not an object or a
/// projected field is missing or has the wrong type.
pub fn project(record: &Value) -> Result<ProjectedRecord, IngestError> {
    let malformed = IngestError::MalformedRecord;
    let obj = record
        .as_object()
        .ok_or_else(|| malformed("record is not a JSON object".to_string()))?;

    let id = match obj.get("id") {
        Some(v) => v
            .as_u64()
            .ok_or_else(|| malformed(format!("field 'id' is not a non-negative integer: {}", v)))?,
        None => return Err(malformed("missing field 'id'".to_string())),
    };

    let name = match obj.get("name") {
        Some(Value::String(s)) if s.is_empty() => {
            return Err(malformed("field 'name' is empty".to_string()))
        }
        Some(Value::String(s)) => s.clone(),
        Some(v) => return Err(malformed(format!("field 'name' is not a string: {}", v))),
        None => return Err(malformed("missing field 'name'".to_string())),
    };

    let abilities = match obj.get("abilities") {
        Some(Value::Array(items)) => items.clone(),
        Some(v) => return Err(malformed(format!("field 'abilities' is not an array: {}", v))),
        None => return Err(malformed("missing field 'abilities'".to_string())),
    };

    Ok(ProjectedRecord { id, name, abilities })
}

/// `project`, plus a check that the record is the one that was asked for.
///
/// # Errors
/// `IngestError::MalformedRecord` when the record's own `id` differs from
/// `requested_id`.
pub fn project_requested(
    record: &Value,
    requested_id: u64,
) -> Result<ProjectedRecord, IngestError> {
    let projected = project(record)?;
    if projected.id != requested_id {
        return Err(IngestError::MalformedRecord(format!(
            "requested record {} but the catalog returned record {}",
            requested_id, projected.id
        )));
    }
    Ok(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn venusaur() -> Value {
        json!({
            "id": 3,
            "name": "venusaur",
            "abilities": [
                {
                    "ability": {"name": "overgrow", "url": "https://pokeapi.co/api/v2/ability/65/"},
                    "is_hidden": false,
                    "slot": 1
                },
                {
                    "ability": {
                        "name": "chlorophyll",
                        "url": "https://pokeapi.co/api/v2/ability/34/"
                    },
                    "is_hidden": true,
                    "slot": 3
                }
            ],
            "base_experience": 263,
            "height": 20,
            "moves": [{"move": {"name": "swords-dance"}}],
            "sprites": {"front_default": "https://example.invalid/3.png"},
            "weight": 1000
        })
    }

    #[test]
    fn keeps_exactly_the_projected_fields() {
        let projected = project(&venusaur()).unwrap();
        let v = serde_json::to_value(&projected).unwrap();
        let mut keys: Vec<&String> = v.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["abilities", "id", "name"]);
        assert_eq!(projected.id, 3);
        assert_eq!(projected.name, "venusaur");
        assert_eq!(projected.abilities.len(), 2);
        assert_eq!(projected.abilities[1]["ability"]["name"], "chlorophyll");
    }

    #[test]
    fn serialized_form_parses_back_to_the_same_record() {
        let projected = project(&venusaur()).unwrap();
        let text = serde_json::to_string(&projected).unwrap();
        let parsed: ProjectedRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, projected);
    }

    #[test]
    fn projecting_a_projection_is_a_no_op() {
        let once = project(&venusaur()).unwrap();
        let twice = project(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_or_mistyped_fields_are_malformed() {
        let cases = [
            json!({"name": "x", "abilities": []}),
            json!({"id": 1, "abilities": []}),
            json!({"id": 1, "name": "x"}),
            json!({"id": "1", "name": "x", "abilities": []}),
            json!({"id": -1, "name": "x", "abilities": []}),
            json!({"id": 1, "name": 7, "abilities": []}),
            json!({"id": 1, "name": "x", "abilities": {}}),
            json!([1, 2, 3]),
        ];
        for case in cases {
            let err = project(&case).unwrap_err();
            assert_eq!(err.kind(), "MalformedRecord", "input {}", case);
        }
    }

    #[test]
    fn empty_name_is_malformed() {
        let err = project(&json!({"id": 3, "name": "", "abilities": []})).unwrap_err();
        assert_eq!(err, IngestError::MalformedRecord("field 'name' is empty".into()));
    }

    #[test]
    fn record_must_be_the_one_requested() {
        assert_eq!(project_requested(&venusaur(), 3).unwrap().id, 3);

        let err = project_requested(&venusaur(), 4).unwrap_err();
        assert_eq!(err.kind(), "MalformedRecord");
        assert!(err.to_string().contains("requested record 4"));
    }
}
