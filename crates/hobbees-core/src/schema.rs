//! Category schemas: the user-defined field lists that describe items.
//!
//! A schema is authored through a [`SchemaBuilder`] draft and frozen by
//! [`SchemaBuilder::finalize`]. Once a category is created from it, a schema
//! is never mutated in place; changes produce a new [`CategorySchema`].

use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

// ─── Field types ─────────────────────────────────────────────────────────────

/// The declared type of a field, as stored on the wire.
///
/// Unknown type strings are preserved verbatim in [`FieldType::Unrecognized`]
/// so they survive a round trip. They validate with the text rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
  Text,
  Number,
  Date,
  Boolean,
  Unrecognized(String),
}

/// The closed set of validation rules a field can be checked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRule {
  Text,
  Number,
  Date,
  Boolean,
}

impl FieldType {
  /// The rule this type validates with. Unrecognized types degrade to text.
  pub fn rule(&self) -> FieldRule {
    match self {
      Self::Text | Self::Unrecognized(_) => FieldRule::Text,
      Self::Number => FieldRule::Number,
      Self::Date => FieldRule::Date,
      Self::Boolean => FieldRule::Boolean,
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Text => "text",
      Self::Number => "number",
      Self::Date => "date",
      Self::Boolean => "boolean",
      Self::Unrecognized(s) => s,
    }
  }
}

impl From<String> for FieldType {
  fn from(s: String) -> Self {
    match s.as_str() {
      "text" => Self::Text,
      "number" => Self::Number,
      "date" => Self::Date,
      "boolean" => Self::Boolean,
      _ => Self::Unrecognized(s),
    }
  }
}

impl From<FieldType> for String {
  fn from(t: FieldType) -> Self {
    match t {
      FieldType::Unrecognized(s) => s,
      other => other.as_str().to_owned(),
    }
  }
}

impl FromStr for FieldType {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self::from(s.to_ascii_lowercase()))
  }
}

impl fmt::Display for FieldType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Display for FieldRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Text => "text",
      Self::Number => "number",
      Self::Date => "date",
      Self::Boolean => "boolean",
    })
  }
}

// ─── Definitions ─────────────────────────────────────────────────────────────

/// One named, typed field of a category schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
  pub name:       String,
  pub field_type: FieldType,
  #[serde(default)]
  pub required:   bool,
}

impl FieldDefinition {
  pub fn new(
    name: impl Into<String>,
    field_type: FieldType,
    required: bool,
  ) -> Self {
    Self { name: name.into(), field_type, required }
  }
}

/// The ordered field list owned by a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySchema {
  pub category_name: String,
  pub fields:        Vec<FieldDefinition>,
}

impl CategorySchema {
  /// Look up a field definition by name.
  pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
    self.fields.iter().find(|f| f.name == name)
  }

  pub fn field_names(&self) -> impl Iterator<Item = &str> {
    self.fields.iter().map(|f| f.name.as_str())
  }

  /// Check the schema invariants: a non-blank category name, at least one
  /// field, no blank and no duplicate field names.
  pub fn validate(&self) -> Result<(), SchemaError> {
    if self.category_name.trim().is_empty() {
      return Err(SchemaError::BlankCategoryName);
    }
    validate_fields(&self.fields)
  }
}

fn validate_fields(fields: &[FieldDefinition]) -> Result<(), SchemaError> {
  if fields.is_empty() {
    return Err(SchemaError::NoFields);
  }
  let mut seen = HashSet::new();
  for field in fields {
    if field.name.trim().is_empty() {
      return Err(SchemaError::BlankFieldName);
    }
    if !seen.insert(field.name.as_str()) {
      return Err(SchemaError::DuplicateField(field.name.clone()));
    }
  }
  Ok(())
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// A mutable draft of a schema, edited field by field before submission.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
  category_name: String,
  fields:        Vec<FieldDefinition>,
}

impl SchemaBuilder {
  pub fn new(category_name: impl Into<String>) -> Self {
    Self { category_name: category_name.into(), fields: Vec::new() }
  }

  /// Append a field to the draft. Blank names are rejected immediately and
  /// leave the draft unchanged; duplicates are caught by [`Self::finalize`].
  pub fn define_field(
    &mut self,
    name: impl Into<String>,
    field_type: FieldType,
    required: bool,
  ) -> Result<&FieldDefinition, SchemaError> {
    let name = name.into();
    if name.trim().is_empty() {
      return Err(SchemaError::BlankFieldName);
    }
    self.fields.push(FieldDefinition::new(name, field_type, required));
    Ok(&self.fields[self.fields.len() - 1])
  }

  /// Builder-style variant of [`Self::define_field`].
  pub fn with_field(
    mut self,
    name: impl Into<String>,
    field_type: FieldType,
    required: bool,
  ) -> Result<Self, SchemaError> {
    self.define_field(name, field_type, required)?;
    Ok(self)
  }

  /// Remove the draft field at `index`, if any.
  pub fn remove_field(&mut self, index: usize) -> Option<FieldDefinition> {
    (index < self.fields.len()).then(|| self.fields.remove(index))
  }

  pub fn fields(&self) -> &[FieldDefinition] { &self.fields }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  /// Freeze the draft into a usable schema.
  pub fn finalize(self) -> Result<CategorySchema, SchemaError> {
    let schema = CategorySchema {
      category_name: self.category_name,
      fields:        self.fields,
    };
    schema.validate()?;
    Ok(schema)
  }
}
