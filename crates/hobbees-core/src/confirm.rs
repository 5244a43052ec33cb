//! The confirmation seam for irreversible actions.

/// Asks the user to approve an action. Returning `false` aborts it.
pub trait Confirm {
  fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
  fn confirm(&mut self, prompt: &str) -> bool { self(prompt) }
}

/// Approves everything without asking (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
  fn confirm(&mut self, _prompt: &str) -> bool { true }
}

/// Declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
  fn confirm(&mut self, _prompt: &str) -> bool { false }
}
