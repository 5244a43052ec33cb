//! Command-line grammar shared by one-shot invocations and the shell.

use std::str::FromStr;

use clap::{Parser, Subcommand};
use hobbees_core::schema::{FieldDefinition, FieldType};

// ─── Commands ─────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
  /// Create an account and log into it.
  Register {
    username: String,
    email:    String,
    /// Prompted for on stdin when omitted.
    #[arg(long, env = "HOBBEES_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },

  /// Log in and remember the session.
  Login {
    username: String,
    /// Prompted for on stdin when omitted.
    #[arg(long, env = "HOBBEES_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },

  /// Forget the stored session.
  Logout,

  /// Show the logged-in user.
  Whoami,

  /// List, show and manage hobbies.
  #[command(subcommand)]
  Hobby(HobbyCommand),

  /// Manage the categories of a hobby.
  #[command(subcommand)]
  Category(CategoryCommand),

  /// Manage the items of a category.
  #[command(subcommand)]
  Item(ItemCommand),

  /// Interactive shell with an edit mode.
  Shell,
}

impl Command {
  /// Whether the command changes or deletes stored data.
  pub fn is_mutation(&self) -> bool {
    match self {
      Self::Hobby(cmd) => !matches!(cmd, HobbyCommand::List | HobbyCommand::Show { .. }),
      Self::Category(_) | Self::Item(_) => true,
      _ => false,
    }
  }
}

/// `HOBBY` arguments accept either the hobby id or its name (case-insensitive).
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum HobbyCommand {
  List,
  /// Print a hobby with its categories and items.
  Show { hobby: String },
  Create {
    name:        String,
    #[arg(long)]
    description: Option<String>,
  },
  Update {
    hobby:       String,
    #[arg(long)]
    name:        Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Delete a hobby with all of its categories and items.
  Delete { hobby: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CategoryCommand {
  /// Define a category, e.g. `Yarn Brand:text:required InStock:boolean`.
  Add {
    hobby:  String,
    name:   String,
    #[arg(required = true, value_name = "NAME:TYPE[:required]")]
    fields: Vec<FieldSpec>,
  },
  /// Rename a category or replace its fields. Existing items are not migrated.
  Update {
    hobby:    String,
    category: String,
    #[arg(long)]
    name:     Option<String>,
    #[arg(long = "field", value_name = "NAME:TYPE[:required]")]
    fields:   Vec<FieldSpec>,
  },
  /// Delete a category and all of its items.
  Delete { hobby: String, category: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ItemCommand {
  Add {
    hobby:    String,
    category: String,
    #[arg(value_name = "NAME=VALUE")]
    values:   Vec<Assignment>,
  },
  /// Change some fields of an item; the others keep their current values.
  Edit {
    hobby:    String,
    category: String,
    item:     String,
    #[arg(value_name = "NAME=VALUE")]
    values:   Vec<Assignment>,
  },
  Delete {
    hobby:    String,
    category: String,
    item:     String,
  },
}

// ─── Shell ────────────────────────────────────────────────────────────────────

/// One line typed at the shell prompt.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
  #[command(subcommand)]
  pub command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ShellCommand {
  #[command(flatten)]
  Run(Command),
  /// Enter edit mode; required before changing anything.
  Edit,
  /// Leave edit mode, confirming if a form has unsaved input.
  Done,
  /// Make a hobby current for `form`.
  Open { hobby: String },
  /// Start a form on the current hobby: new item, or edit ITEM.
  Form {
    category: String,
    item:     Option<String>,
  },
  /// Fill inputs of the open form.
  Set {
    #[arg(required = true, value_name = "NAME=VALUE")]
    values: Vec<Assignment>,
  },
  /// Submit the open form.
  Save,
  /// Discard the open form.
  Cancel,
  #[command(alias = "quit")]
  Exit,
}

// ─── Argument values ──────────────────────────────────────────────────────────

/// A field definition written as `name:type[:required]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec(pub FieldDefinition);

impl FromStr for FieldSpec {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut parts = s.split(':');
    let name = parts.next().unwrap_or_default().trim();
    let ty = parts
      .next()
      .ok_or_else(|| format!("expected NAME:TYPE[:required], got {s:?}"))?;
    let required = match parts.next().map(str::trim) {
      None | Some("optional") => false,
      Some("required" | "req") => true,
      Some(other) => return Err(format!("expected `required`, got {other:?}")),
    };
    if parts.next().is_some() {
      return Err(format!("too many `:` in {s:?}"));
    }
    if name.is_empty() {
      return Err("field name must not be blank".into());
    }

    let field_type = FieldType::from_str(ty.trim()).unwrap_or(FieldType::Text);
    if let FieldType::Unrecognized(t) = &field_type {
      return Err(format!(
        "unknown field type {t:?}; expected text, number, date or boolean"
      ));
    }
    Ok(Self(FieldDefinition::new(name, field_type, required)))
  }
}

/// An item value written as `Name=value`. The value may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
  pub field: String,
  pub value: String,
}

impl FromStr for Assignment {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (field, value) = s
      .split_once('=')
      .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    if field.trim().is_empty() {
      return Err(format!("missing field name in {s:?}"));
    }
    Ok(Self { field: field.trim().to_owned(), value: value.to_owned() })
  }
}

/// Split a shell line into words. Single and double quotes group words, and
/// a backslash escapes the next character outside single quotes.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
  let mut words = Vec::new();
  let mut current = String::new();
  let mut in_word = false;
  let mut quote: Option<char> = None;
  let mut chars = line.chars();

  while let Some(c) = chars.next() {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some('"') | None, '\\') => {
        let escaped = chars.next().ok_or("trailing backslash")?;
        current.push(escaped);
        in_word = true;
      }
      (Some(_), c) => current.push(c),
      (None, '"' | '\'') => {
        quote = Some(c);
        in_word = true;
      }
      (None, c) if c.is_whitespace() => {
        if in_word {
          words.push(std::mem::take(&mut current));
          in_word = false;
        }
      }
      (None, c) => {
        current.push(c);
        in_word = true;
      }
    }
  }

  if quote.is_some() {
    return Err("unterminated quote".into());
  }
  if in_word {
    words.push(current);
  }
  Ok(words)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_specs() {
    let spec: FieldSpec = "Brand:text:required".parse().unwrap();
    assert_eq!(spec.0, FieldDefinition::new("Brand", FieldType::Text, true));

    let spec: FieldSpec = "Purchased:Date".parse().unwrap();
    assert_eq!(spec.0, FieldDefinition::new("Purchased", FieldType::Date, false));

    assert!("Brand".parse::<FieldSpec>().is_err());
    assert!(":text".parse::<FieldSpec>().is_err());
    assert!("Brand:colour".parse::<FieldSpec>().is_err());
    assert!("Brand:text:maybe".parse::<FieldSpec>().is_err());
  }

  #[test]
  fn assignments() {
    let a: Assignment = "Brand=Lion Brand".parse().unwrap();
    assert_eq!(a, Assignment { field: "Brand".into(), value: "Lion Brand".into() });

    let a: Assignment = "Note=".parse().unwrap();
    assert_eq!(a.value, "");

    let a: Assignment = "Formula=a=b".parse().unwrap();
    assert_eq!(a.value, "a=b");

    assert!("Brand".parse::<Assignment>().is_err());
    assert!("=x".parse::<Assignment>().is_err());
  }

  #[test]
  fn splits_quoted_words() {
    assert_eq!(
      split_words(r#"item add Knitting "Yarn Stash" 'Brand=Red Heart' Note=a\ b"#).unwrap(),
      ["item", "add", "Knitting", "Yarn Stash", "Brand=Red Heart", "Note=a b"]
    );
    assert_eq!(split_words("  ").unwrap(), Vec::<String>::new());
    assert_eq!(split_words(r#"set Note="""#).unwrap(), ["set", "Note="]);
    assert!(split_words("open \"Knitting").is_err());
  }

  #[test]
  fn shell_lines_parse_commands_and_extras() {
    let line = ShellLine::try_parse_from(["item", "delete", "Knitting", "Yarn", "abc"]).unwrap();
    assert!(matches!(line.command, ShellCommand::Run(Command::Item(ItemCommand::Delete { .. }))));

    let line = ShellLine::try_parse_from(["form", "Yarn"]).unwrap();
    assert_eq!(line.command, ShellCommand::Form { category: "Yarn".into(), item: None });

    let line = ShellLine::try_parse_from(["quit"]).unwrap();
    assert_eq!(line.command, ShellCommand::Exit);
  }

  #[test]
  fn mutations() {
    assert!(!Command::Hobby(HobbyCommand::List).is_mutation());
    assert!(Command::Hobby(HobbyCommand::Delete { hobby: "x".into() }).is_mutation());
    assert!(
      Command::Category(CategoryCommand::Delete { hobby: "x".into(), category: "y".into() })
        .is_mutation()
    );
    assert!(!Command::Whoami.is_mutation());
  }
}
