//! The hobby aggregate and the request payloads that mutate it.
//!
//! A [`Hobby`] owns its [`Category`]s, and each category owns its schema and
//! [`Item`]s. These are snapshots of what the backend returned; the client
//! never patches them locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  record::Record,
  schema::{CategorySchema, FieldDefinition},
};

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// One user-entered record in a category. `data` is kept exactly as the
/// backend stored it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub id:         String,
  #[serde(default)]
  pub data:       Map<String, Value>,
  #[serde(with = "timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(with = "timestamp")]
  pub updated_at: DateTime<Utc>,
}

/// A named collection of schema-conforming items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub name:       String,
  pub schema:     CategorySchema,
  #[serde(default)]
  pub items:      Vec<Item>,
  #[serde(with = "timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(with = "timestamp")]
  pub updated_at: DateTime<Utc>,
}

impl Category {
  pub fn item(&self, id: &str) -> Option<&Item> {
    self.items.iter().find(|i| i.id == id)
  }
}

/// The root aggregate: a user-named pursuit grouping categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hobby {
  pub id:          String,
  /// The owning user.
  pub user_id:     String,
  pub name:        String,
  pub description: Option<String>,
  #[serde(default)]
  pub categories:  Vec<Category>,
  #[serde(with = "timestamp")]
  pub created_at:  DateTime<Utc>,
  #[serde(with = "timestamp")]
  pub updated_at:  DateTime<Utc>,
}

impl Hobby {
  pub fn category(&self, name: &str) -> Option<&Category> {
    self.categories.iter().find(|c| c.name == name)
  }

  /// Total number of items across all categories.
  pub fn item_count(&self) -> usize {
    self.categories.iter().map(|c| c.items.len()).sum()
  }
}

/// Backend timestamps are UTC but may arrive without an offset
/// (`2024-01-01T12:00:00.123000`). Both forms are accepted; output is RFC 3339.
mod timestamp {
  use chrono::{DateTime, NaiveDateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
      return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
      .map(|naive| naive.and_utc())
      .map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// Body of `POST /hobbies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHobby {
  pub name:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Body of `PUT /hobbies/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HobbyPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Body of `POST /hobbies/{id}/categories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
  pub name:   String,
  pub fields: Vec<FieldDefinition>,
}

impl From<CategorySchema> for NewCategory {
  fn from(schema: CategorySchema) -> Self {
    Self { name: schema.category_name, fields: schema.fields }
  }
}

/// Body of `PUT /hobbies/{id}/categories/{name}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fields: Option<Vec<FieldDefinition>>,
}

/// Body of the item create and update endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
  pub data: Map<String, Value>,
}

impl From<&Record> for ItemPayload {
  fn from(record: &Record) -> Self { Self { data: record.to_json() } }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::schema::FieldType;

  #[test]
  fn deserialises_backend_hobby() {
    let body = json!({
      "id": "507f1f77bcf86cd799439011",
      "user_id": "507f1f77bcf86cd799439012",
      "name": "Slingshot",
      "description": null,
      "categories": [{
        "name": "Latex",
        "schema": {
          "category_name": "Latex",
          "fields": [{ "name": "Brand", "field_type": "text", "required": true }]
        },
        "items": [{
          "id": "a1",
          "data": { "Brand": "Snipersling" },
          "created_at": "2024-01-01T00:00:00Z",
          "updated_at": "2024-01-01T00:00:00Z"
        }],
        "created_at": "2024-01-01T00:00:00.123000",
        "updated_at": "2024-01-01T00:00:00"
      }],
      "created_at": "2024-01-01T00:00:00Z",
      "updated_at": "2024-01-01T00:00:00Z"
    });

    let hobby: Hobby = serde_json::from_value(body).unwrap();
    let latex = hobby.category("Latex").unwrap();
    assert_eq!(latex.schema.fields[0].field_type, FieldType::Text);
    assert_eq!(latex.item("a1").unwrap().data["Brand"], "Snipersling");
    assert_eq!(hobby.item_count(), 1);
    assert_eq!(latex.items[0].created_at.timestamp_subsec_millis(), 123);
    assert_eq!(hobby.created_at, latex.items[0].updated_at);
  }

  #[test]
  fn patches_omit_absent_fields() {
    let patch = HobbyPatch { name: Some("Knitting".into()), description: None };
    assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "name": "Knitting" }));
    assert_eq!(
      serde_json::to_value(CategoryPatch::default()).unwrap(),
      json!({})
    );
  }
}
