//! Core types and client-side state for the HobBees hobby tracker.
//!
//! Schemas, forms and the hobby aggregate live here, along with the session
//! and edit-mode state machines. The backend is only reached through the
//! [`gateway`] traits: `hobbees-client` implements them over HTTP and
//! [`memory::MemoryGateway`] in process.

pub mod confirm;
pub mod dashboard;
pub mod edit_mode;
pub mod error;
pub mod form;
pub mod gateway;
pub mod hobby;
pub mod memory;
pub mod record;
pub mod schema;
pub mod session;
pub mod user;
pub mod view;

pub use error::{Error, Result};
