//! HTTP gateway for the HobBees backend.
//!
//! [`ApiClient`] implements the `hobbees-core` gateway traits over the JSON
//! REST API mounted at `/api`. [`FileCredentials`] persists the session
//! token and profile between runs.

pub mod client;
pub mod credentials;

pub use client::{ApiClient, ApiConfig};
pub use credentials::FileCredentials;
