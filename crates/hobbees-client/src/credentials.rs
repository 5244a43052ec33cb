//! File-backed credential store.
//!
//! The session is kept as a small JSON document. On Unix the file is created
//! with mode `0600` and its directory with `0700`.

use std::{
  fs, io,
  path::{Path, PathBuf},
};

use hobbees_core::{
  Error, Result,
  session::{CredentialStore, StoredSession},
};

const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Persists the session token and user profile to a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentials {
  path: PathBuf,
}

impl FileCredentials {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  /// `$HOME/.config/hobbees/credentials.json`, or a path relative to the
  /// working directory when `HOME` is unset.
  pub fn default_path() -> PathBuf {
    let base = std::env::var_os("HOME")
      .map(PathBuf::from)
      .unwrap_or_default();
    base
      .join(".config")
      .join("hobbees")
      .join(CREDENTIALS_FILE_NAME)
  }

  pub fn path(&self) -> &Path { &self.path }
}

impl Default for FileCredentials {
  fn default() -> Self { Self::new(Self::default_path()) }
}

fn store_error(action: &str, path: &Path, e: impl std::fmt::Display) -> Error {
  Error::Credentials(format!("{action} {}: {e}", path.display()))
}

impl CredentialStore for FileCredentials {
  fn load(&self) -> Result<Option<StoredSession>> {
    let raw = match fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(store_error("read", &self.path, e)),
    };
    if raw.trim().is_empty() {
      return Ok(None);
    }
    serde_json::from_str(&raw)
      .map(Some)
      .map_err(|e| store_error("parse", &self.path, e))
  }

  fn save(&mut self, session: &StoredSession) -> Result<()> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).map_err(|e| store_error("mkdir", parent, e))?;
      #[cfg(unix)]
      {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
          tracing::warn!("failed to chmod 0700 {}: {e}", parent.display());
        }
      }
    }

    let json = serde_json::to_string_pretty(session)?;
    fs::write(&self.path, json).map_err(|e| store_error("write", &self.path, e))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
        .map_err(|e| store_error("chmod", &self.path, e))?;
    }

    tracing::debug!(path = %self.path.display(), "saved credentials");
    Ok(())
  }

  fn clear(&mut self) -> Result<()> {
    match fs::remove_file(&self.path) {
      Ok(()) => {
        tracing::debug!(path = %self.path.display(), "removed credentials");
        Ok(())
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(store_error("remove", &self.path, e)),
    }
  }
}

#[cfg(test)]
mod tests {
  use hobbees_core::user::User;
  use tempfile::TempDir;

  use super::*;

  fn session() -> StoredSession {
    StoredSession {
      token: "tok_abc123".into(),
      user:  User {
        id:        "u1".into(),
        username:  "alice".into(),
        email:     "alice@example.com".into(),
        is_active: true,
      },
    }
  }

  #[test]
  fn default_path_is_under_config_dir() {
    assert!(
      FileCredentials::default_path().ends_with(".config/hobbees/credentials.json")
    );
  }

  #[test]
  fn missing_file_is_no_session() {
    let tmp = TempDir::new().unwrap();
    let store = FileCredentials::new(tmp.path().join("credentials.json"));
    assert_eq!(store.load().unwrap(), None);
  }

  #[test]
  fn save_load_clear_cycle() {
    let tmp = TempDir::new().unwrap();
    let mut store = FileCredentials::new(tmp.path().join("nested/dir/credentials.json"));

    store.save(&session()).unwrap();
    assert_eq!(store.load().unwrap(), Some(session()));

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
      assert_eq!(mode, 0o600);
    }

    store.clear().unwrap();
    assert!(!store.path().exists());
    assert_eq!(store.load().unwrap(), None);
    // Clearing twice is fine.
    store.clear().unwrap();
  }

  #[test]
  fn corrupt_file_is_a_credentials_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("credentials.json");
    fs::write(&path, "{ not json").unwrap();
    let err = FileCredentials::new(&path).load().unwrap_err();
    assert!(matches!(err, Error::Credentials(_)));
  }

  #[test]
  fn whitespace_only_file_is_no_session() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("credentials.json");
    fs::write(&path, "  \n ").unwrap();
    assert_eq!(FileCredentials::new(&path).load().unwrap(), None);
  }
}
