use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned by the remote system. Never generated client-side.
pub type RecordId = i64;

/// Field values of a record without its identifier, as sent on create/update.
pub type Fields = Map<String, Value>;

/// An opaque resource row: the distinguished `id` plus whatever other fields
/// the resource carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == "id" {
            return None;
        }
        self.fields.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattened_fields() {
        let record: Record =
            serde_json::from_value(json!({"id": 7, "name": "Acme", "active": true})).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.get("name"), Some(&json!("Acme")));
        assert!(!record.fields.contains_key("id"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back, json!({"id": 7, "name": "Acme", "active": true}));
    }

    #[test]
    fn test_missing_id_rejected() {
        let err = serde_json::from_value::<Record>(json!({"name": "no id"}));
        assert!(err.is_err());
    }
}
