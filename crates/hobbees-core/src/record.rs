//! Record values: what a validated item holds, and what a user typed.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

// ─── Validated values ────────────────────────────────────────────────────────

/// A typed value that passed its field's rule.
///
/// Serialises to the plain JSON the backend stores: strings, numbers,
/// booleans, ISO dates (`YYYY-MM-DD`) and `null` for [`FieldValue::Empty`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Text(String),
  Number(f64),
  Date(NaiveDate),
  Boolean(bool),
  /// An optional number or date left blank.
  Empty,
}

impl Serialize for FieldValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Text(s) => serializer.serialize_str(s),
      Self::Number(n) => serializer.serialize_f64(*n),
      Self::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
      Self::Boolean(b) => serializer.serialize_bool(*b),
      Self::Empty => serializer.serialize_unit(),
    }
  }
}

impl From<&FieldValue> for Value {
  fn from(v: &FieldValue) -> Self {
    match v {
      FieldValue::Text(s) => Value::String(s.clone()),
      FieldValue::Number(n) => {
        serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number)
      }
      FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
      FieldValue::Boolean(b) => Value::Bool(*b),
      FieldValue::Empty => Value::Null,
    }
  }
}

/// A validated item payload: exactly one value per schema field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
  pub fn get(&self, field: &str) -> Option<&FieldValue> { self.0.get(field) }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub(crate) fn insert(&mut self, field: String, value: FieldValue) {
    self.0.insert(field, value);
  }

  /// The JSON object sent as an item's `data`.
  pub fn to_json(&self) -> Map<String, Value> {
    self
      .0
      .iter()
      .map(|(k, v)| (k.clone(), Value::from(v)))
      .collect()
  }
}

// ─── Raw input ───────────────────────────────────────────────────────────────

/// What the user supplied for one form field, before coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Input {
  /// Nothing entered (or an unchecked box).
  #[default]
  Empty,
  Text(String),
  Number(f64),
  Flag(bool),
}

impl Input {
  pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }

  /// The string shown in a text box for this input.
  pub fn display(&self) -> String {
    match self {
      Self::Empty => String::new(),
      Self::Text(s) => s.clone(),
      Self::Number(n) => n.to_string(),
      Self::Flag(b) => b.to_string(),
    }
  }
}

impl From<&Value> for Input {
  /// Compound values (arrays, objects) are captured as their JSON text.
  fn from(v: &Value) -> Self {
    match v {
      Value::Null => Self::Empty,
      Value::Bool(b) => Self::Flag(*b),
      Value::Number(n) => n.as_f64().map_or(Self::Text(n.to_string()), Self::Number),
      Value::String(s) => Self::Text(s.clone()),
      other => Self::Text(other.to_string()),
    }
  }
}
