//! Account types exchanged with the authentication endpoints.

use serde::{Deserialize, Serialize};

/// The authenticated user's profile (`GET /auth/me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:        String,
  pub username:  String,
  pub email:     String,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool { true }

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
  pub username: String,
  pub email:    String,
  pub password: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
  pub username: String,
  pub password: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
  pub access_token: String,
  #[serde(default = "default_token_type")]
  pub token_type:   String,
}

fn default_token_type() -> String { "bearer".to_owned() }
