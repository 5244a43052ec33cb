//! An in-process gateway that behaves like the HobBees backend.
//!
//! Used by tests and for offline demos. State lives behind an `Arc`, so
//! clones (including those made by [`MemoryGateway::with_token`]) share one
//! backend. Every served call is counted; see [`MemoryGateway::calls`].

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  gateway::{AuthGateway, HobbyGateway},
  hobby::{
    Category, CategoryPatch, Hobby, HobbyPatch, Item, ItemPayload, NewCategory,
    NewHobby,
  },
  schema::{CategorySchema, FieldRule},
  user::{AuthToken, Login, Registration, User},
};

#[derive(Default)]
struct State {
  /// Registered accounts with their plaintext passwords.
  users:   Vec<(User, String)>,
  /// Issued token → user id.
  tokens:  HashMap<String, String>,
  hobbies: Vec<Hobby>,
}

#[derive(Clone, Default)]
pub struct MemoryGateway {
  state: Arc<Mutex<State>>,
  calls: Arc<AtomicUsize>,
  token: Option<String>,
}

fn new_id() -> String { Uuid::new_v4().simple().to_string() }

fn bad_request(detail: impl Into<String>) -> Error {
  Error::Remote { status: 400, detail: detail.into() }
}

fn hobby_not_found() -> Error { Error::NotFound("Hobby not found".into()) }

fn category_not_found(name: &str) -> Error {
  Error::NotFound(format!("Category '{name}' not found"))
}

impl MemoryGateway {
  pub fn new() -> Self { Self::default() }

  /// A gateway bearing a token for a freshly registered user.
  pub fn signed_in(username: &str) -> Self {
    let gateway = Self::new();
    let user = User {
      id:        new_id(),
      username:  username.to_owned(),
      email:     format!("{username}@example.com"),
      is_active: true,
    };
    let token = new_id();
    {
      let mut state = gateway.lock();
      state.tokens.insert(token.clone(), user.id.clone());
      state.users.push((user, String::new()));
    }
    gateway.with_token(token)
  }

  /// A handle onto the same backend that authenticates with `token`.
  pub fn with_token(&self, token: impl Into<String>) -> Self {
    Self {
      state: Arc::clone(&self.state),
      calls: Arc::clone(&self.calls),
      token: Some(token.into()),
    }
  }

  /// Number of calls served so far, across all handles.
  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  /// Invalidate every issued token.
  pub fn revoke_tokens(&self) { self.lock().tokens.clear(); }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Count the call and resolve the bearer token to a user id.
  fn begin(&self) -> Result<(MutexGuard<'_, State>, String)> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let state = self.lock();
    let user_id = self
      .token
      .as_ref()
      .and_then(|t| state.tokens.get(t))
      .cloned()
      .ok_or_else(|| Error::Unauthorized("Could not validate credentials".into()))?;
    Ok((state, user_id))
  }

  /// Apply `f` to one of the caller's hobbies and return the result.
  fn with_hobby<T>(
    &self,
    hobby_id: &str,
    f: impl FnOnce(&mut Hobby) -> Result<T>,
  ) -> Result<T> {
    let (mut state, user_id) = self.begin()?;
    let hobby = state
      .hobbies
      .iter_mut()
      .find(|h| h.id == hobby_id && h.user_id == user_id)
      .ok_or_else(hobby_not_found)?;
    f(hobby)
  }

  fn with_category(
    &self,
    hobby_id: &str,
    category: &str,
    f: impl FnOnce(&mut Category) -> Result<()>,
  ) -> Result<Hobby> {
    self.with_hobby(hobby_id, |hobby| {
      let target = hobby
        .categories
        .iter_mut()
        .find(|c| c.name == category)
        .ok_or_else(|| category_not_found(category))?;
      f(target)?;
      target.updated_at = Utc::now();
      hobby.updated_at = Utc::now();
      Ok(hobby.clone())
    })
  }
}

/// The backend's own, looser, item check: required keys present and JSON
/// types plausible. `null` is accepted for any field.
fn check_item(data: &Map<String, Value>, schema: &CategorySchema) -> Result<()> {
  for field in &schema.fields {
    match data.get(&field.name) {
      None if field.required => {
        return Err(bad_request(format!(
          "Required field '{}' is missing",
          field.name
        )));
      }
      None | Some(Value::Null) => {}
      Some(value) => {
        let ok = match field.field_type.rule() {
          FieldRule::Text | FieldRule::Date => value.is_string(),
          FieldRule::Number => value.is_number(),
          FieldRule::Boolean => value.is_boolean(),
        };
        if !ok {
          return Err(bad_request(format!(
            "Field '{}' has invalid type. Expected {}",
            field.name, field.field_type
          )));
        }
      }
    }
  }
  Ok(())
}

impl HobbyGateway for MemoryGateway {
  async fn list_hobbies(&self) -> Result<Vec<Hobby>> {
    let (state, user_id) = self.begin()?;
    Ok(
      state
        .hobbies
        .iter()
        .filter(|h| h.user_id == user_id)
        .cloned()
        .collect(),
    )
  }

  async fn get_hobby(&self, hobby_id: &str) -> Result<Hobby> {
    self.with_hobby(hobby_id, |hobby| Ok(hobby.clone()))
  }

  async fn create_hobby(&self, body: &NewHobby) -> Result<Hobby> {
    let (mut state, user_id) = self.begin()?;
    if body.name.trim().is_empty() {
      return Err(bad_request("name must not be empty"));
    }
    let now = Utc::now();
    let hobby = Hobby {
      id: new_id(),
      user_id,
      name: body.name.clone(),
      description: body.description.clone(),
      categories: Vec::new(),
      created_at: now,
      updated_at: now,
    };
    state.hobbies.push(hobby.clone());
    Ok(hobby)
  }

  async fn update_hobby(&self, hobby_id: &str, body: &HobbyPatch) -> Result<Hobby> {
    self.with_hobby(hobby_id, |hobby| {
      if let Some(name) = &body.name {
        hobby.name = name.clone();
      }
      if let Some(description) = &body.description {
        hobby.description = Some(description.clone());
      }
      hobby.updated_at = Utc::now();
      Ok(hobby.clone())
    })
  }

  async fn delete_hobby(&self, hobby_id: &str) -> Result<()> {
    let (mut state, user_id) = self.begin()?;
    let before = state.hobbies.len();
    state
      .hobbies
      .retain(|h| !(h.id == hobby_id && h.user_id == user_id));
    if state.hobbies.len() == before {
      return Err(hobby_not_found());
    }
    Ok(())
  }

  async fn add_category(&self, hobby_id: &str, body: &NewCategory) -> Result<Hobby> {
    self.with_hobby(hobby_id, |hobby| {
      if hobby.category(&body.name).is_some() {
        return Err(bad_request(format!(
          "Category '{}' already exists",
          body.name
        )));
      }
      let now = Utc::now();
      hobby.categories.push(Category {
        name:       body.name.clone(),
        schema:     CategorySchema {
          category_name: body.name.clone(),
          fields:        body.fields.clone(),
        },
        items:      Vec::new(),
        created_at: now,
        updated_at: now,
      });
      hobby.updated_at = now;
      Ok(hobby.clone())
    })
  }

  async fn update_category(
    &self,
    hobby_id: &str,
    category: &str,
    body: &CategoryPatch,
  ) -> Result<Hobby> {
    self.with_hobby(hobby_id, |hobby| {
      if let Some(name) = body.name.as_deref()
        && name != category
        && hobby.category(name).is_some()
      {
        return Err(bad_request(format!("Category '{name}' already exists")));
      }
      let target = hobby
        .categories
        .iter_mut()
        .find(|c| c.name == category)
        .ok_or_else(|| category_not_found(category))?;
      if let Some(fields) = &body.fields {
        target.schema = CategorySchema {
          category_name: body.name.clone().unwrap_or_else(|| target.name.clone()),
          fields:        fields.clone(),
        };
      }
      if let Some(name) = &body.name {
        target.name = name.clone();
        target.schema.category_name = name.clone();
      }
      let now = Utc::now();
      target.updated_at = now;
      hobby.updated_at = now;
      Ok(hobby.clone())
    })
  }

  async fn delete_category(&self, hobby_id: &str, category: &str) -> Result<Hobby> {
    self.with_hobby(hobby_id, |hobby| {
      let before = hobby.categories.len();
      hobby.categories.retain(|c| c.name != category);
      if hobby.categories.len() == before {
        return Err(category_not_found(category));
      }
      hobby.updated_at = Utc::now();
      Ok(hobby.clone())
    })
  }

  async fn add_item(
    &self,
    hobby_id: &str,
    category: &str,
    body: &ItemPayload,
  ) -> Result<Hobby> {
    self.with_category(hobby_id, category, |target| {
      check_item(&body.data, &target.schema)?;
      let now = Utc::now();
      target.items.push(Item {
        id:         new_id(),
        data:       body.data.clone(),
        created_at: now,
        updated_at: now,
      });
      Ok(())
    })
  }

  async fn update_item(
    &self,
    hobby_id: &str,
    category: &str,
    item_id: &str,
    body: &ItemPayload,
  ) -> Result<Hobby> {
    self.with_category(hobby_id, category, |target| {
      let schema = target.schema.clone();
      let item = target
        .items
        .iter_mut()
        .find(|i| i.id == item_id)
        .ok_or_else(|| Error::NotFound("Item not found".into()))?;
      check_item(&body.data, &schema)?;
      item.data = body.data.clone();
      item.updated_at = Utc::now();
      Ok(())
    })
  }

  async fn delete_item(
    &self,
    hobby_id: &str,
    category: &str,
    item_id: &str,
  ) -> Result<Hobby> {
    self.with_category(hobby_id, category, |target| {
      let before = target.items.len();
      target.items.retain(|i| i.id != item_id);
      if target.items.len() == before {
        return Err(Error::NotFound("Item not found".into()));
      }
      Ok(())
    })
  }
}

impl AuthGateway for MemoryGateway {
  async fn register(&self, body: &Registration) -> Result<User> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let mut state = self.lock();
    if state.users.iter().any(|(u, _)| u.username == body.username) {
      return Err(bad_request("Username already registered"));
    }
    if state.users.iter().any(|(u, _)| u.email == body.email) {
      return Err(bad_request("Email already registered"));
    }
    let user = User {
      id:        new_id(),
      username:  body.username.clone(),
      email:     body.email.clone(),
      is_active: true,
    };
    state.users.push((user.clone(), body.password.clone()));
    Ok(user)
  }

  async fn login(&self, body: &Login) -> Result<AuthToken> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let mut state = self.lock();
    let user_id = state
      .users
      .iter()
      .find(|(u, p)| u.username == body.username && *p == body.password)
      .map(|(u, _)| u.id.clone())
      .ok_or_else(|| Error::Unauthorized("Incorrect username or password".into()))?;
    let token = new_id();
    state.tokens.insert(token.clone(), user_id);
    Ok(AuthToken { access_token: token, token_type: "bearer".into() })
  }

  async fn current_user(&self, token: &str) -> Result<User> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let state = self.lock();
    let user_id = state
      .tokens
      .get(token)
      .ok_or_else(|| Error::Unauthorized("Could not validate credentials".into()))?;
    state
      .users
      .iter()
      .find(|(u, _)| &u.id == user_id)
      .map(|(u, _)| u.clone())
      .ok_or_else(|| Error::Unauthorized("Could not validate credentials".into()))
  }
}
