//! Session presence: who is logged in, and with which token.
//!
//! A [`SessionContext`] is created once at start-up, restored from a
//! [`CredentialStore`], and mutated only through its own methods. A session
//! counts as authenticated only when both a user profile and a token are
//! present.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  gateway::AuthGateway,
  user::{Login, Registration, User},
};

// ─── Credential storage ──────────────────────────────────────────────────────

/// What is persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
  pub token: String,
  pub user:  User,
}

/// Local storage for the session token and user profile.
pub trait CredentialStore {
  fn load(&self) -> Result<Option<StoredSession>>;
  fn save(&mut self, session: &StoredSession) -> Result<()>;
  fn clear(&mut self) -> Result<()>;
}

/// Keeps credentials in memory only; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentials {
  stored: Option<StoredSession>,
}

impl MemoryCredentials {
  pub fn with_session(session: StoredSession) -> Self {
    Self { stored: Some(session) }
  }
}

impl CredentialStore for MemoryCredentials {
  fn load(&self) -> Result<Option<StoredSession>> { Ok(self.stored.clone()) }

  fn save(&mut self, session: &StoredSession) -> Result<()> {
    self.stored = Some(session.clone());
    Ok(())
  }

  fn clear(&mut self) -> Result<()> {
    self.stored = None;
    Ok(())
  }
}

// ─── Session context ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SessionContext<S: CredentialStore> {
  store:   S,
  user:    Option<User>,
  token:   Option<String>,
  loading: bool,
}

impl<S: CredentialStore> SessionContext<S> {
  /// A fresh, unauthenticated context. Call [`Self::restore`] next.
  pub fn new(store: S) -> Self {
    Self { store, user: None, token: None, loading: true }
  }

  pub fn user(&self) -> Option<&User> { self.user.as_ref() }

  pub fn token(&self) -> Option<&str> { self.token.as_deref() }

  /// True until [`Self::restore`] has run.
  pub fn is_loading(&self) -> bool { self.loading }

  pub fn is_authenticated(&self) -> bool {
    self.user.is_some() && self.token.is_some()
  }

  pub fn store(&self) -> &S { &self.store }

  /// Resume a previously stored session and re-validate its token.
  ///
  /// A token the backend rejects clears the stored credentials. Other
  /// failures (e.g. the backend is unreachable) keep the stored session.
  pub async fn restore<A: AuthGateway>(&mut self, auth: &A) {
    let stored = match self.store.load() {
      Ok(stored) => stored,
      Err(error) => {
        tracing::warn!(%error, "could not read stored credentials");
        None
      }
    };

    if let Some(stored) = stored {
      self.token = Some(stored.token.clone());
      self.user = Some(stored.user);

      match auth.current_user(&stored.token).await {
        Ok(user) => {
          tracing::debug!(username = %user.username, "stored session is valid");
          self.persist(stored.token, user);
        }
        Err(error) if error.is_auth() => {
          tracing::warn!(%error, "stored token rejected, clearing session");
          self.logout();
        }
        Err(error) => {
          tracing::warn!(%error, "could not verify stored session");
        }
      }
    }

    self.loading = false;
  }

  /// Exchange a username and password for a token and load the profile.
  /// The session only changes once both calls succeed.
  pub async fn login<A: AuthGateway>(
    &mut self,
    auth: &A,
    username: &str,
    password: &str,
  ) -> Result<&User> {
    let token = auth
      .login(&Login {
        username: username.to_owned(),
        password: password.to_owned(),
      })
      .await?;
    let user = auth.current_user(&token.access_token).await?;

    self.store.save(&StoredSession {
      token: token.access_token.clone(),
      user:  user.clone(),
    })?;
    tracing::info!(username = %user.username, "logged in");
    self.token = Some(token.access_token);
    Ok(self.user.insert(user))
  }

  /// Create an account, then log into it.
  pub async fn register<A: AuthGateway>(
    &mut self,
    auth: &A,
    username: &str,
    email: &str,
    password: &str,
  ) -> Result<&User> {
    auth
      .register(&Registration {
        username: username.to_owned(),
        email:    email.to_owned(),
        password: password.to_owned(),
      })
      .await?;
    self.login(auth, username, password).await
  }

  /// Forget the session locally and in storage.
  pub fn logout(&mut self) {
    self.user = None;
    self.token = None;
    if let Err(error) = self.store.clear() {
      tracing::warn!(%error, "could not clear stored credentials");
    }
  }

  /// React to an error from any action. Authentication failures end the
  /// session; returns `true` if that happened.
  pub fn observe(&mut self, error: &Error) -> bool {
    if !error.is_auth() {
      return false;
    }
    tracing::warn!(%error, "credential rejected, logging out");
    self.logout();
    true
  }

  fn persist(&mut self, token: String, user: User) {
    let stored = StoredSession { token, user };
    if let Err(error) = self.store.save(&stored) {
      tracing::warn!(%error, "could not store refreshed profile");
    }
    self.token = Some(stored.token);
    self.user = Some(stored.user);
  }
}
