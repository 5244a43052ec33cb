//! Dynamic forms generated from a [`CategorySchema`].
//!
//! A [`Form`] holds one [`Input`] per schema field, pre-filled from an
//! existing item when editing. [`Form::submit`] runs every field through its
//! rule and either yields a [`Record`] keyed by exactly the schema's field
//! names or a [`FormErrors`] map. Forms never persist anything themselves.
//!
//! | Rule      | Blank input                    | Coercion failure |
//! |-----------|--------------------------------|------------------|
//! | `text`    | `Required` if required, else `""` | never         |
//! | `number`  | `Required` if required, else `null` | `Type`      |
//! | `date`    | `Required` if required, else `null` | `Type`      |
//! | `boolean` | `false`, even when required    | `Type`           |

use std::borrow::Borrow;

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

use crate::{
  error::{FieldError, FormErrors},
  record::{FieldValue, Input, Record},
  schema::{CategorySchema, FieldDefinition, FieldRule},
};

// ─── Coercion rules ──────────────────────────────────────────────────────────

/// Validate a single input against its field definition.
pub fn coerce(
  field: &FieldDefinition,
  input: &Input,
) -> Result<FieldValue, FieldError> {
  let rule = field.field_type.rule();
  let mismatch = || FieldError::Type { expected: rule, input: input.display() };
  let blank = || {
    if field.required {
      Err(FieldError::Required)
    } else {
      Ok(FieldValue::Empty)
    }
  };

  match rule {
    FieldRule::Text => match input {
      Input::Text(s) if field.required && s.trim().is_empty() => {
        Err(FieldError::Required)
      }
      Input::Empty if field.required => Err(FieldError::Required),
      Input::Empty => Ok(FieldValue::Text(String::new())),
      other => Ok(FieldValue::Text(other.display())),
    },

    FieldRule::Number => match input {
      Input::Empty => blank(),
      Input::Text(s) if s.trim().is_empty() => blank(),
      Input::Text(s) => s
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(FieldValue::Number)
        .ok_or_else(mismatch),
      Input::Number(n) if n.is_finite() => Ok(FieldValue::Number(*n)),
      Input::Number(_) | Input::Flag(_) => Err(mismatch()),
    },

    FieldRule::Date => match input {
      Input::Empty => blank(),
      Input::Text(s) if s.trim().is_empty() => blank(),
      Input::Text(s) => parse_date(s.trim())
        .map(FieldValue::Date)
        .ok_or_else(mismatch),
      Input::Number(_) | Input::Flag(_) => Err(mismatch()),
    },

    // An unchecked box is a valid `false`, so booleans are never "missing".
    FieldRule::Boolean => match input {
      Input::Empty => Ok(FieldValue::Boolean(false)),
      Input::Flag(b) => Ok(FieldValue::Boolean(*b)),
      Input::Text(s) => parse_bool(s).map(FieldValue::Boolean).ok_or_else(mismatch),
      Input::Number(n) if *n == 0.0 => Ok(FieldValue::Boolean(false)),
      Input::Number(n) if *n == 1.0 => Ok(FieldValue::Boolean(true)),
      Input::Number(_) => Err(mismatch()),
    },
  }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
}

fn parse_bool(s: &str) -> Option<bool> {
  match s.trim().to_ascii_lowercase().as_str() {
    "" | "false" | "no" | "off" | "0" => Some(false),
    "true" | "yes" | "on" | "1" => Some(true),
    _ => None,
  }
}

/// Validate an arbitrary JSON object against `schema`.
///
/// Keys that are not schema fields are dropped; missing keys are treated as
/// blank input.
pub fn validate_record(
  schema: &CategorySchema,
  data: &Map<String, Value>,
) -> Result<Record, FormErrors> {
  for key in data.keys().filter(|k| schema.field(k).is_none()) {
    tracing::debug!(
      category = %schema.category_name,
      field = %key,
      "dropping value for unknown field"
    );
  }

  coerce_all(schema.fields.iter().map(|field| {
    (field, data.get(&field.name).map(Input::from).unwrap_or_default())
  }))
}

/// Coerce each `(field, input)` pair, collecting every failure.
fn coerce_all<'a, I: Borrow<Input>>(
  pairs: impl IntoIterator<Item = (&'a FieldDefinition, I)>,
) -> Result<Record, FormErrors> {
  let mut record = Record::default();
  let mut errors = FormErrors::new();
  for (field, input) in pairs {
    match coerce(field, input.borrow()) {
      Ok(value) => record.insert(field.name.clone(), value),
      Err(e) => errors.insert(field.name.clone(), e),
    }
  }
  if errors.is_empty() { Ok(record) } else { Err(errors) }
}

// ─── Form ────────────────────────────────────────────────────────────────────

/// Whether a form creates a new item or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
  Add,
  Edit { item_id: String },
}

/// One input slot of a [`Form`].
#[derive(Debug, Clone)]
pub struct FormField {
  pub definition: FieldDefinition,
  /// The value the field was rendered with.
  pub initial:    Input,
  pub input:      Input,
}

/// An editable form generated from a category schema.
#[derive(Debug, Clone)]
pub struct Form {
  schema: CategorySchema,
  mode:   FormMode,
  fields: Vec<FormField>,
}

impl Form {
  /// Build a form for `schema`, pre-filling inputs from `defaults`.
  /// Default keys that are not schema fields are ignored.
  pub fn render(
    schema: &CategorySchema,
    defaults: Option<&Map<String, Value>>,
    mode: FormMode,
  ) -> Self {
    let fields = schema
      .fields
      .iter()
      .map(|definition| {
        let initial = defaults
          .and_then(|d| d.get(&definition.name))
          .map(Input::from)
          .unwrap_or_default();
        FormField {
          definition: definition.clone(),
          input:      initial.clone(),
          initial,
        }
      })
      .collect();

    Self { schema: schema.clone(), mode, fields }
  }

  pub fn schema(&self) -> &CategorySchema { &self.schema }

  pub fn mode(&self) -> &FormMode { &self.mode }

  pub fn fields(&self) -> &[FormField] { &self.fields }

  /// Heading shown above the inputs, e.g. `"Add Yarn"`.
  pub fn title(&self) -> String {
    let verb = match self.mode {
      FormMode::Add => "Add",
      FormMode::Edit { .. } => "Edit",
    };
    format!("{verb} {}", self.schema.category_name)
  }

  pub fn submit_label(&self) -> &'static str {
    match self.mode {
      FormMode::Add => "Add",
      FormMode::Edit { .. } => "Update",
    }
  }

  pub fn input(&self, name: &str) -> Option<&Input> {
    self
      .fields
      .iter()
      .find(|f| f.definition.name == name)
      .map(|f| &f.input)
  }

  /// Replace the input of field `name`.
  pub fn set(&mut self, name: &str, input: Input) -> Result<(), FieldError> {
    let field = self
      .fields
      .iter_mut()
      .find(|f| f.definition.name == name)
      .ok_or(FieldError::UnknownField)?;
    field.input = input;
    Ok(())
  }

  /// True once any input differs from the value it was rendered with.
  pub fn is_dirty(&self) -> bool {
    self.fields.iter().any(|f| f.input != f.initial)
  }

  /// Run every field's rule and collect all failures.
  pub fn validate(&self) -> FormErrors { self.submit().err().unwrap_or_default() }

  /// Validate all fields and produce the record to save.
  pub fn submit(&self) -> Result<Record, FormErrors> {
    coerce_all(self.fields.iter().map(|f| (&f.definition, &f.input)))
  }
}
