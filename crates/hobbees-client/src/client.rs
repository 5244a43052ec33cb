//! Async HTTP client wrapping the HobBees JSON API.

use std::time::Duration;

use hobbees_core::{
  Error, Result,
  gateway::{AuthGateway, HobbyGateway},
  hobby::{CategoryPatch, Hobby, HobbyPatch, ItemPayload, NewCategory, NewHobby},
  user::{AuthToken, Login, Registration, User},
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Connection settings for the HobBees API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Server root; the API lives under `<base_url>/api`.
  pub base_url: String,
  pub timeout:  Duration,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8000".to_owned(),
      timeout:  Duration::from_secs(30),
    }
  }
}

/// Async HTTP client for the HobBees REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base:   Url,
  token:  Option<String>,
}

impl std::fmt::Debug for ApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiClient")
      .field("base", &self.base.as_str())
      .field("authenticated", &self.token.is_some())
      .finish()
  }
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let base = Url::parse(&config.base_url).map_err(|e| {
      Error::Config(format!("invalid base URL {:?}: {e}", config.base_url))
    })?;
    if base.cannot_be_a_base() {
      return Err(Error::Config(format!(
        "invalid base URL {:?}",
        config.base_url
      )));
    }
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, base, token: None })
  }

  /// A clone that sends `token` as a bearer credential on every call.
  pub fn with_token(&self, token: impl Into<String>) -> Self {
    Self { token: Some(token.into()), ..self.clone() }
  }

  pub fn token(&self) -> Option<&str> { self.token.as_deref() }

  /// `<base>/api/<segments...>`, each segment percent-encoded.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().push("api").extend(segments);
    }
    url
  }

  fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
    let url = self.url(segments);
    tracing::debug!(%method, %url, "request");
    let req = self.client.request(method, url);
    match &self.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  async fn send(req: RequestBuilder) -> Result<Response> {
    let resp = req.send().await.map_err(transport)?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let error = status_error(status, &body);
    tracing::debug!(%status, %error, "request failed");
    Err(error)
  }

  async fn json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    Self::send(req).await?.json().await.map_err(transport)
  }

  async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    method: Method,
    segments: &[&str],
    body: Option<&B>,
  ) -> Result<T> {
    let req = self.request(method, segments);
    let req = match body {
      Some(body) => req.json(body),
      None => req,
    };
    Self::json(req).await
  }
}

fn transport(e: reqwest::Error) -> Error { Error::Network(e.to_string()) }

/// Map a non-success response onto the error taxonomy.
fn status_error(status: StatusCode, body: &str) -> Error {
  let detail = detail(body).unwrap_or_else(|| {
    status
      .canonical_reason()
      .unwrap_or("request failed")
      .to_owned()
  });
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(detail),
    StatusCode::NOT_FOUND => Error::NotFound(detail),
    _ => Error::Remote { status: status.as_u16(), detail },
  }
}

/// Extract the backend's `detail` message. Request validation failures carry
/// a list of `{loc, msg}` objects instead of a string.
fn detail(body: &str) -> Option<String> {
  let value: Value = serde_json::from_str(body).ok()?;
  match value.get("detail")? {
    Value::String(s) => Some(s.clone()),
    Value::Array(entries) => {
      let msgs: Vec<&str> = entries
        .iter()
        .filter_map(|e| e.get("msg").and_then(Value::as_str))
        .collect();
      (!msgs.is_empty()).then(|| msgs.join("; "))
    }
    other => Some(other.to_string()),
  }
}

// ─── Hobbies ──────────────────────────────────────────────────────────────────

impl HobbyGateway for ApiClient {
  async fn list_hobbies(&self) -> Result<Vec<Hobby>> {
    self.call::<(), _>(Method::GET, &["hobbies"], None).await
  }

  async fn get_hobby(&self, hobby_id: &str) -> Result<Hobby> {
    self
      .call::<(), _>(Method::GET, &["hobbies", hobby_id], None)
      .await
  }

  async fn create_hobby(&self, body: &NewHobby) -> Result<Hobby> {
    self.call(Method::POST, &["hobbies"], Some(body)).await
  }

  async fn update_hobby(&self, hobby_id: &str, body: &HobbyPatch) -> Result<Hobby> {
    self
      .call(Method::PUT, &["hobbies", hobby_id], Some(body))
      .await
  }

  /// Expects `204 No Content`.
  async fn delete_hobby(&self, hobby_id: &str) -> Result<()> {
    Self::send(self.request(Method::DELETE, &["hobbies", hobby_id])).await?;
    Ok(())
  }

  async fn add_category(&self, hobby_id: &str, body: &NewCategory) -> Result<Hobby> {
    self
      .call(Method::POST, &["hobbies", hobby_id, "categories"], Some(body))
      .await
  }

  async fn update_category(
    &self,
    hobby_id: &str,
    category: &str,
    body: &CategoryPatch,
  ) -> Result<Hobby> {
    self
      .call(
        Method::PUT,
        &["hobbies", hobby_id, "categories", category],
        Some(body),
      )
      .await
  }

  async fn delete_category(&self, hobby_id: &str, category: &str) -> Result<Hobby> {
    self
      .call::<(), _>(
        Method::DELETE,
        &["hobbies", hobby_id, "categories", category],
        None,
      )
      .await
  }

  async fn add_item(
    &self,
    hobby_id: &str,
    category: &str,
    body: &ItemPayload,
  ) -> Result<Hobby> {
    self
      .call(
        Method::POST,
        &["hobbies", hobby_id, "categories", category, "items"],
        Some(body),
      )
      .await
  }

  async fn update_item(
    &self,
    hobby_id: &str,
    category: &str,
    item_id: &str,
    body: &ItemPayload,
  ) -> Result<Hobby> {
    self
      .call(
        Method::PUT,
        &["hobbies", hobby_id, "categories", category, "items", item_id],
        Some(body),
      )
      .await
  }

  async fn delete_item(
    &self,
    hobby_id: &str,
    category: &str,
    item_id: &str,
  ) -> Result<Hobby> {
    self
      .call::<(), _>(
        Method::DELETE,
        &["hobbies", hobby_id, "categories", category, "items", item_id],
        None,
      )
      .await
  }
}

// ─── Auth ─────────────────────────────────────────────────────────────────────

impl AuthGateway for ApiClient {
  async fn register(&self, body: &Registration) -> Result<User> {
    self.call(Method::POST, &["auth", "register"], Some(body)).await
  }

  async fn login(&self, body: &Login) -> Result<AuthToken> {
    self.call(Method::POST, &["auth", "login"], Some(body)).await
  }

  async fn current_user(&self, token: &str) -> Result<User> {
    Self::json(self.with_token(token).request(Method::GET, &["auth", "me"])).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base: &str) -> ApiClient {
    ApiClient::new(ApiConfig { base_url: base.into(), ..ApiConfig::default() })
      .unwrap()
  }

  #[test]
  fn urls_are_rooted_at_api() {
    let c = client("http://localhost:8000");
    assert_eq!(
      c.url(&["hobbies", "abc"]).as_str(),
      "http://localhost:8000/api/hobbies/abc"
    );
    let c = client("https://example.com/hobbees/");
    assert_eq!(
      c.url(&["auth", "me"]).as_str(),
      "https://example.com/hobbees/api/auth/me"
    );
  }

  #[test]
  fn reserved_characters_are_percent_encoded() {
    let c = client("http://localhost:8000");
    let url = c.url(&["hobbies", "h1", "categories", "Nuts/Bolts #2?"]);
    assert_eq!(
      url.as_str(),
      "http://localhost:8000/api/hobbies/h1/categories/Nuts%2FBolts%20%232%3F"
    );
  }

  #[test]
  fn rejects_unusable_base_url() {
    for base_url in ["not a url", "mailto:someone@example.com"] {
      let err = ApiClient::new(ApiConfig { base_url: base_url.into(), ..ApiConfig::default() })
        .unwrap_err();
      assert!(matches!(err, Error::Config(_)), "{base_url}: {err:?}");
    }
  }

  #[test]
  fn status_mapping() {
    let body = r#"{"detail":"Hobby not found"}"#;
    assert!(matches!(
      status_error(StatusCode::NOT_FOUND, body),
      Error::NotFound(d) if d == "Hobby not found"
    ));
    assert!(status_error(StatusCode::UNAUTHORIZED, "").is_auth());
    assert!(status_error(StatusCode::FORBIDDEN, "").is_auth());
    assert!(matches!(
      status_error(StatusCode::BAD_REQUEST, r#"{"detail":"Category 'Yarn' already exists"}"#),
      Error::Remote { status: 400, detail } if detail.contains("already exists")
    ));
  }

  #[test]
  fn detail_from_validation_list() {
    let body = r#"{"detail":[{"loc":["body","name"],"msg":"field required"},{"msg":"too short"}]}"#;
    assert_eq!(detail(body).as_deref(), Some("field required; too short"));
    assert_eq!(detail("<html>oops</html>"), None);
  }
}
