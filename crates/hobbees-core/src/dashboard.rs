//! The hobby list shown after login.

use crate::{
  Error, Result,
  confirm::Confirm,
  error::{FieldError, FormErrors},
  gateway::HobbyGateway,
  hobby::{Hobby, HobbyPatch, NewHobby},
  view::HobbyView,
};

/// The current user's hobbies, refreshed from the gateway after every change.
///
/// A failed load keeps the previous list and records a single message in
/// [`HobbyList::error`].
pub struct HobbyList<G> {
  gateway: G,
  hobbies: Vec<Hobby>,
  error:   Option<String>,
}

fn blank_name() -> Error {
  let mut errors = FormErrors::new();
  errors.insert("name", FieldError::Required);
  errors.into()
}

impl<G: HobbyGateway> HobbyList<G> {
  pub fn new(gateway: G) -> Self {
    Self { gateway, hobbies: Vec::new(), error: None }
  }

  pub fn hobbies(&self) -> &[Hobby] { &self.hobbies }

  /// The message from the last failed load, if any.
  pub fn error(&self) -> Option<&str> { self.error.as_deref() }

  pub fn gateway(&self) -> &G { &self.gateway }

  /// Find a hobby by id, or by name ignoring case.
  pub fn find(&self, id_or_name: &str) -> Option<&Hobby> {
    self
      .hobbies
      .iter()
      .find(|h| h.id == id_or_name)
      .or_else(|| {
        self
          .hobbies
          .iter()
          .find(|h| h.name.eq_ignore_ascii_case(id_or_name))
      })
  }

  /// Replace the list with a fresh copy from the gateway.
  pub async fn load(&mut self) -> Result<&[Hobby]> {
    match self.gateway.list_hobbies().await {
      Ok(hobbies) => {
        self.hobbies = hobbies;
        self.error = None;
        Ok(&self.hobbies)
      }
      Err(e) => {
        self.error = Some(format!("Failed to fetch hobbies: {e}"));
        Err(e)
      }
    }
  }

  pub async fn create(&mut self, body: NewHobby) -> Result<Hobby> {
    if body.name.trim().is_empty() {
      return Err(blank_name());
    }
    let hobby = self.gateway.create_hobby(&body).await?;
    tracing::info!(hobby = %hobby.id, name = %hobby.name, "created hobby");
    self.load().await?;
    Ok(hobby)
  }

  pub async fn update(&mut self, hobby_id: &str, patch: HobbyPatch) -> Result<Hobby> {
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
      return Err(blank_name());
    }
    let hobby = self.gateway.update_hobby(hobby_id, &patch).await?;
    self.load().await?;
    Ok(hobby)
  }

  /// Delete a hobby with all of its categories and items.
  pub async fn delete(
    &mut self,
    hobby_id: &str,
    confirm: &mut impl Confirm,
  ) -> Result<()> {
    let label = self
      .find(hobby_id)
      .map_or_else(|| hobby_id.to_owned(), |h| h.name.clone());
    let prompt = format!("Are you sure you want to delete the hobby \"{label}\"?");
    if !confirm.confirm(&prompt) {
      return Err(Error::NotConfirmed);
    }
    self.gateway.delete_hobby(hobby_id).await?;
    tracing::info!(hobby = %hobby_id, "deleted hobby");
    self.load().await?;
    Ok(())
  }
}

impl<G: HobbyGateway + Clone> HobbyList<G> {
  /// Open a [`HobbyView`] on `hobby_id`, fetching a fresh snapshot.
  pub async fn open(&self, hobby_id: &str) -> Result<HobbyView<G>> {
    HobbyView::open(self.gateway.clone(), hobby_id).await
  }
}
