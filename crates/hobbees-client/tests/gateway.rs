//! HTTP gateway tests against a mock HobBees backend.

use std::{net::TcpListener, time::Duration};

use hobbees_client::{ApiClient, ApiConfig};
use hobbees_core::{
  Error,
  gateway::{AuthGateway, HobbyGateway},
  hobby::{CategoryPatch, ItemPayload, NewHobby},
  session::{CredentialStore, MemoryCredentials, SessionContext, StoredSession},
  user::Login,
};
use serde_json::{Value, json};
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{body_json, header, method, path},
};

fn hobby_json(id: &str, name: &str) -> Value {
  json!({
    "id": id,
    "user_id": "u1",
    "name": name,
    "description": "Tracking equipment",
    "categories": [{
      "name": "Nuts/Bolts",
      "schema": {
        "category_name": "Nuts/Bolts",
        "fields": [
          { "name": "Size", "field_type": "number", "required": true },
          { "name": "Note", "field_type": "text" }
        ]
      },
      "items": [],
      "created_at": "2024-03-01T09:30:00.250000",
      "updated_at": "2024-03-01T09:30:00.250000"
    }],
    "created_at": "2024-03-01T09:00:00",
    "updated_at": "2024-03-01T09:30:00.250000"
  })
}

fn user_json() -> Value {
  json!({
    "id": "u1",
    "username": "alice",
    "email": "alice@example.com",
    "is_active": true
  })
}

async fn client(server: &MockServer) -> ApiClient {
  ApiClient::new(ApiConfig { base_url: server.uri(), ..ApiConfig::default() })
    .expect("client")
}

#[tokio::test]
async fn list_hobbies_sends_bearer_token() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/hobbies"))
    .and(header("Authorization", "Bearer tok123"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!([hobby_json("h1", "Workshop")])),
    )
    .expect(1)
    .mount(&server)
    .await;

  let api = client(&server).await.with_token("tok123");
  let hobbies = api.list_hobbies().await.expect("list");
  assert_eq!(hobbies.len(), 1);
  assert_eq!(hobbies[0].name, "Workshop");
  assert_eq!(hobbies[0].categories[0].schema.fields.len(), 2);
  assert!(!hobbies[0].categories[0].schema.fields[1].required);
}

#[tokio::test]
async fn create_hobby_posts_json_body() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/hobbies"))
    .and(body_json(json!({ "name": "Workshop" })))
    .respond_with(ResponseTemplate::new(201).set_body_json(hobby_json("h9", "Workshop")))
    .expect(1)
    .mount(&server)
    .await;

  let api = client(&server).await.with_token("t");
  let hobby = api
    .create_hobby(&NewHobby { name: "Workshop".into(), description: None })
    .await
    .expect("create");
  assert_eq!(hobby.id, "h9");
}

#[tokio::test]
async fn category_names_are_percent_encoded() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/hobbies/h1/categories/Nuts%2FBolts/items"))
    .and(body_json(json!({ "data": { "Size": 4.0, "Note": null } })))
    .respond_with(ResponseTemplate::new(201).set_body_json(hobby_json("h1", "Workshop")))
    .expect(1)
    .mount(&server)
    .await;

  let api = client(&server).await.with_token("t");
  let mut data = serde_json::Map::new();
  data.insert("Size".into(), json!(4.0));
  data.insert("Note".into(), Value::Null);
  api
    .add_item("h1", "Nuts/Bolts", &ItemPayload { data })
    .await
    .expect("add item");
}

#[tokio::test]
async fn update_category_sends_only_present_fields() {
  let server = MockServer::start().await;
  Mock::given(method("PUT"))
    .and(path("/api/hobbies/h1/categories/Latex"))
    .and(body_json(json!({ "name": "Rubber" })))
    .respond_with(ResponseTemplate::new(200).set_body_json(hobby_json("h1", "Workshop")))
    .expect(1)
    .mount(&server)
    .await;

  let api = client(&server).await.with_token("t");
  api
    .update_category("h1", "Latex", &CategoryPatch {
      name:   Some("Rubber".into()),
      fields: None,
    })
    .await
    .expect("update category");
}

#[tokio::test]
async fn delete_hobby_accepts_no_content() {
  let server = MockServer::start().await;
  Mock::given(method("DELETE"))
    .and(path("/api/hobbies/h1"))
    .respond_with(ResponseTemplate::new(204))
    .expect(1)
    .mount(&server)
    .await;

  let api = client(&server).await.with_token("t");
  api.delete_hobby("h1").await.expect("delete");
}

#[tokio::test]
async fn not_found_maps_to_not_found() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/hobbies/missing"))
    .respond_with(
      ResponseTemplate::new(404).set_body_json(json!({ "detail": "Hobby not found" })),
    )
    .mount(&server)
    .await;

  let api = client(&server).await.with_token("t");
  let err = api.get_hobby("missing").await.unwrap_err();
  assert!(matches!(err, Error::NotFound(ref d) if d == "Hobby not found"));
}

#[tokio::test]
async fn backend_rejection_keeps_status_and_detail() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/hobbies/h1/categories/Latex/items"))
    .respond_with(ResponseTemplate::new(400).set_body_json(
      json!({ "detail": "Required field 'Brand' is missing" }),
    ))
    .mount(&server)
    .await;

  let api = client(&server).await.with_token("t");
  let err = api
    .add_item("h1", "Latex", &ItemPayload { data: serde_json::Map::new() })
    .await
    .unwrap_err();
  match err {
    Error::Remote { status, detail } => {
      assert_eq!(status, 400);
      assert_eq!(detail, "Required field 'Brand' is missing");
    }
    other => panic!("expected remote error, got {other:?}"),
  }
}

/// A base URL on a local port that nothing is listening on.
fn closed_port_url() -> String {
  let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
  let port = listener.local_addr().expect("local addr").port();
  drop(listener);
  format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
  let api = ApiClient::new(ApiConfig {
    base_url: closed_port_url(),
    timeout:  Duration::from_secs(5),
  })
  .expect("client")
  .with_token("t");
  let err = api.list_hobbies().await.unwrap_err();
  assert!(matches!(err, Error::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn login_then_fetch_profile() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/auth/login"))
    .and(body_json(json!({ "username": "alice", "password": "pw" })))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({ "access_token": "jwt-1", "token_type": "bearer" })),
    )
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/api/auth/me"))
    .and(header("Authorization", "Bearer jwt-1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
    .expect(1)
    .mount(&server)
    .await;

  let api = client(&server).await;
  let mut session = SessionContext::new(MemoryCredentials::default());
  let user = session.login(&api, "alice", "pw").await.expect("login");
  assert_eq!(user.username, "alice");
  assert_eq!(session.token(), Some("jwt-1"));
  assert!(session.is_authenticated());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/auth/login"))
    .respond_with(
      ResponseTemplate::new(401)
        .set_body_json(json!({ "detail": "Incorrect username or password" })),
    )
    .mount(&server)
    .await;

  let api = client(&server).await;
  let err = api
    .login(&Login { username: "alice".into(), password: "nope".into() })
    .await
    .unwrap_err();
  assert!(err.is_auth());
  assert!(err.to_string().contains("Incorrect username or password"));
}

// ─── Session restore ─────────────────────────────────────────────────────────

fn stored_session() -> StoredSession {
  StoredSession {
    token: "jwt-old".into(),
    user:  serde_json::from_value(user_json()).expect("user"),
  }
}

#[tokio::test]
async fn restore_keeps_session_when_backend_is_unreachable() {
  let api = ApiClient::new(ApiConfig {
    base_url: closed_port_url(),
    timeout:  Duration::from_secs(5),
  })
  .expect("client");
  let mut session = SessionContext::new(MemoryCredentials::with_session(stored_session()));
  session.restore(&api).await;

  assert!(!session.is_loading());
  assert!(session.is_authenticated());
  assert_eq!(session.token(), Some("jwt-old"));
  assert_eq!(session.store().load().unwrap(), Some(stored_session()));
}

#[tokio::test]
async fn restore_keeps_session_on_server_error() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/auth/me"))
    .respond_with(ResponseTemplate::new(500))
    .expect(1)
    .mount(&server)
    .await;

  let api = client(&server).await;
  let mut session = SessionContext::new(MemoryCredentials::with_session(stored_session()));
  session.restore(&api).await;

  assert!(session.is_authenticated());
  assert_eq!(session.store().load().unwrap(), Some(stored_session()));
}

#[tokio::test]
async fn restore_clears_session_on_unauthorized() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/auth/me"))
    .and(header("Authorization", "Bearer jwt-old"))
    .respond_with(
      ResponseTemplate::new(401)
        .set_body_json(json!({ "detail": "Could not validate credentials" })),
    )
    .expect(1)
    .mount(&server)
    .await;

  let api = client(&server).await;
  let mut session = SessionContext::new(MemoryCredentials::with_session(stored_session()));
  session.restore(&api).await;

  assert!(!session.is_authenticated());
  assert!(session.token().is_none());
  assert_eq!(session.store().load().unwrap(), None);
}
