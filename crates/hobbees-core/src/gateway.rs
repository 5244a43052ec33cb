//! The Remote Persistence Gateway traits.
//!
//! The gateway is the backend of record. Implementations translate each call
//! into a request and map failures onto [`crate::Error`]; they own no
//! business logic. `hobbees-client` implements these over HTTP and
//! [`crate::memory::MemoryGateway`] in process.

use std::future::Future;

use crate::{
  Result,
  hobby::{CategoryPatch, Hobby, HobbyPatch, ItemPayload, NewCategory, NewHobby},
  user::{AuthToken, Login, Registration, User},
};

// ─── Hobbies ─────────────────────────────────────────────────────────────────

/// Hobby, category and item persistence for the current user.
///
/// Every mutation of a category or item returns the updated [`Hobby`].
/// Callers nonetheless re-fetch before displaying it.
pub trait HobbyGateway: Send + Sync {
  /// `GET /hobbies`
  fn list_hobbies(&self) -> impl Future<Output = Result<Vec<Hobby>>> + Send;

  /// `GET /hobbies/{id}`
  fn get_hobby(
    &self,
    hobby_id: &str,
  ) -> impl Future<Output = Result<Hobby>> + Send;

  /// `POST /hobbies`
  fn create_hobby(
    &self,
    body: &NewHobby,
  ) -> impl Future<Output = Result<Hobby>> + Send;

  /// `PUT /hobbies/{id}`
  fn update_hobby(
    &self,
    hobby_id: &str,
    body: &HobbyPatch,
  ) -> impl Future<Output = Result<Hobby>> + Send;

  /// `DELETE /hobbies/{id}`; removes every category and item with it.
  fn delete_hobby(
    &self,
    hobby_id: &str,
  ) -> impl Future<Output = Result<()>> + Send;

  // ── Categories ────────────────────────────────────────────────────────

  /// `POST /hobbies/{id}/categories`
  fn add_category(
    &self,
    hobby_id: &str,
    body: &NewCategory,
  ) -> impl Future<Output = Result<Hobby>> + Send;

  /// `PUT /hobbies/{id}/categories/{name}`
  fn update_category(
    &self,
    hobby_id: &str,
    category: &str,
    body: &CategoryPatch,
  ) -> impl Future<Output = Result<Hobby>> + Send;

  /// `DELETE /hobbies/{id}/categories/{name}`. The backend cascades to the
  /// category's items.
  fn delete_category(
    &self,
    hobby_id: &str,
    category: &str,
  ) -> impl Future<Output = Result<Hobby>> + Send;

  // ── Items ─────────────────────────────────────────────────────────────

  /// `POST /hobbies/{id}/categories/{name}/items`
  fn add_item(
    &self,
    hobby_id: &str,
    category: &str,
    body: &ItemPayload,
  ) -> impl Future<Output = Result<Hobby>> + Send;

  /// `PUT /hobbies/{id}/categories/{name}/items/{item_id}`
  fn update_item(
    &self,
    hobby_id: &str,
    category: &str,
    item_id: &str,
    body: &ItemPayload,
  ) -> impl Future<Output = Result<Hobby>> + Send;

  /// `DELETE /hobbies/{id}/categories/{name}/items/{item_id}`
  fn delete_item(
    &self,
    hobby_id: &str,
    category: &str,
    item_id: &str,
  ) -> impl Future<Output = Result<Hobby>> + Send;
}

// ─── Authentication ──────────────────────────────────────────────────────────

/// Account endpoints. These are the only calls that do not need a session.
pub trait AuthGateway: Send + Sync {
  /// `POST /auth/register`
  fn register(
    &self,
    body: &Registration,
  ) -> impl Future<Output = Result<User>> + Send;

  /// `POST /auth/login`
  fn login(
    &self,
    body: &Login,
  ) -> impl Future<Output = Result<AuthToken>> + Send;

  /// `GET /auth/me`, bearing `token`.
  fn current_user(
    &self,
    token: &str,
  ) -> impl Future<Output = Result<User>> + Send;
}
