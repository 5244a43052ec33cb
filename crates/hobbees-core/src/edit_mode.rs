//! The edit-mode toggle that gates destructive actions.
//!
//! ```text
//!   Viewing ──enter──▶ Editing { dirty: false }
//!   Editing ──set_dirty──▶ Editing { dirty }
//!   Editing { dirty: false } ──exit──▶ Viewing
//!   Editing { dirty: true }  ──exit + confirmed──▶ Viewing
//! ```

use crate::confirm::Confirm;

/// Prompt shown when leaving edit mode with unsaved changes.
pub const DISCARD_PROMPT: &str =
  "You have unsaved changes. Are you sure you want to exit edit mode?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
  #[default]
  Viewing,
  Editing { dirty: bool },
}

impl EditMode {
  pub fn is_editing(&self) -> bool { matches!(self, Self::Editing { .. }) }

  pub fn is_dirty(&self) -> bool {
    matches!(self, Self::Editing { dirty: true })
  }

  /// Enter edit mode with a clean slate. Already editing keeps the dirty
  /// flag, so unsaved changes still need confirming on exit.
  pub fn enter(&mut self) {
    if self.is_editing() {
      return;
    }
    tracing::debug!("entering edit mode");
    *self = Self::Editing { dirty: false };
  }

  /// Record whether there are unsaved changes. Ignored while viewing.
  pub fn set_dirty(&mut self, dirty: bool) {
    if let Self::Editing { dirty: d } = self {
      *d = dirty;
    }
  }

  /// Leave edit mode. A dirty editor only leaves if the user confirms the
  /// discard. Returns `true` if the mode is now [`EditMode::Viewing`].
  pub fn exit(&mut self, confirm: &mut impl Confirm) -> bool {
    match *self {
      Self::Viewing => true,
      Self::Editing { dirty: true } if !confirm.confirm(DISCARD_PROMPT) => {
        tracing::debug!("discard declined, staying in edit mode");
        false
      }
      Self::Editing { .. } => {
        tracing::debug!("leaving edit mode");
        *self = Self::Viewing;
        true
      }
    }
  }

  /// Flip between viewing and editing. Returns `true` if editing afterwards.
  pub fn toggle(&mut self, confirm: &mut impl Confirm) -> bool {
    if self.is_editing() {
      !self.exit(confirm)
    } else {
      self.enter();
      true
    }
  }
}
