//! Integration tests for the maquinas API.
//!
//! These tests spin up a real server instance and make HTTP requests to verify
//! the complete request/response cycle.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

use maquinas_service::api::{AppState, create_router};
use maquinas_service::config::{
    AppConfig, AuthConfig, FileStorageConfig, StorageBackend, StorageConfig, UserCredentials,
};
use maquinas_service::storage::create_storage;

// ============================================================================
// Test Harness
// ============================================================================

const API_TOKEN: &str = "test_api_token_12345";
const USERNAME: &str = "planta";
const PASSWORD: &str = "s3creta";

/// Test server instance.
struct TestServer {
    addr: SocketAddr,
    client: Client,
    _temp_dir: Option<TempDir>,
}

impl TestServer {
    /// Server on the in-memory backend.
    async fn new() -> Self {
        Self::start(StorageConfig::default(), None).await
    }

    /// Server on the file backend in a temporary directory.
    async fn with_file_storage() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = StorageConfig {
            backend: StorageBackend::File,
            file: FileStorageConfig {
                data_dir: temp_dir.path().to_path_buf(),
            },
            ..Default::default()
        };
        Self::start(storage, Some(temp_dir)).await
    }

    async fn start(storage_config: StorageConfig, temp_dir: Option<TempDir>) -> Self {
        let config = AppConfig {
            storage: storage_config,
            auth: AuthConfig {
                api_token: API_TOKEN.to_string(),
                users: vec![UserCredentials {
                    username: USERNAME.to_string(),
                    password_hash: bcrypt::hash(PASSWORD, 4).expect("Failed to hash"),
                }],
                ..Default::default()
            },
            ..Default::default()
        };

        let storage = create_storage(&config.storage)
            .await
            .expect("Failed to create storage");

        let state = AppState::new(Arc::new(config), storage, None);
        let app = create_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        Self {
            addr,
            client: Client::new(),
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn authed(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(API_TOKEN)
    }

    async fn get(&self, path: &str) -> Response {
        self.authed(Method::GET, path)
            .send()
            .await
            .expect("Request failed")
    }

    async fn send_json(&self, method: Method, path: &str, body: &Value) -> Response {
        self.authed(method, path)
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.authed(Method::DELETE, path)
            .send()
            .await
            .expect("Request failed")
    }

    /// Create a machine and return its body.
    async fn create_machine(&self, name: &str) -> Value {
        let response = self
            .send_json(
                Method::POST,
                "/maquinas/",
                &json!({
                    "nombre": name,
                    "estado": "activa",
                    "ultima_fecha_mantenimiento": "2024-01-10"
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    /// Create a maintenance record and return its body.
    async fn create_maintenance(&self, machine_id: i64, kind: &str) -> Value {
        let response = self
            .send_json(
                Method::POST,
                "/mantenimientos/",
                &json!({ "maquina": machine_id, "fecha": "2024-02-01", "tipo": kind }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }
}

/// Error response structure.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: i32,
    #[allow(dead_code)]
    message: String,
    data: Value,
}

fn id_of(body: &Value) -> i64 {
    body["id"].as_i64().expect("body has an integer id")
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::new().await;
    let response = server.request(Method::GET, "/health").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let server = TestServer::new().await;
    let response = server.request(Method::GET, "/ready").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["ready"], true);
    assert_eq!(body["data"]["components"]["storage"], "memory");
}

#[tokio::test]
async fn test_metrics_endpoint_without_recorder() {
    let server = TestServer::new().await;
    let response = server.request(Method::GET, "/metrics").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = response.text().await.unwrap();
    assert!(text.contains("maquinas_up 1"));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let server = TestServer::new().await;
    let response = server.request(Method::GET, "/health").send().await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_resources_require_credentials() {
    let server = TestServer::new().await;

    for path in ["/", "/maquinas/", "/mantenimientos/", "/maquinas/1/"] {
        let response = server.request(Method::GET, path).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(response.headers()["www-authenticate"], "Bearer");

        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.code, 2001);
    }
}

#[tokio::test]
async fn test_rejected_write_touches_no_data() {
    let server = TestServer::new().await;

    let response = server
        .request(Method::POST, "/maquinas/")
        .bearer_auth("invalid_token")
        .json(&json!({
            "nombre": "Press-1",
            "estado": "activa",
            "ultima_fecha_mantenimiento": "2024-01-10"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let list: Vec<Value> = server.get("/maquinas/").await.json().await.unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn test_unauthenticated_updates_and_deletes_change_nothing() {
    let server = TestServer::new().await;
    let press = server.create_machine("Press-1").await;
    let record = server.create_maintenance(id_of(&press), "oil").await;

    let machine_path = format!("/maquinas/{}/", id_of(&press));
    let record_path = format!("/mantenimientos/{}/", id_of(&record));
    let attempts = [
        (Method::PUT, &machine_path, json!({
            "nombre": "Changed",
            "estado": "detenida",
            "ultima_fecha_mantenimiento": "2025-01-01"
        })),
        (Method::PATCH, &machine_path, json!({ "estado": "detenida" })),
        (Method::DELETE, &machine_path, json!({})),
        (Method::PUT, &record_path, json!({
            "maquina": id_of(&press),
            "fecha": "2025-01-01",
            "tipo": "changed"
        })),
        (Method::PATCH, &record_path, json!({ "tipo": "changed" })),
        (Method::DELETE, &record_path, json!({})),
    ];

    for (method, path, body) in attempts {
        for token in [None, Some("invalid_token")] {
            let mut request = server.request(method.clone(), path).json(&body);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {path}");
        }
    }

    let machine: Value = server.get(&machine_path).await.json().await.unwrap();
    assert_eq!(machine["nombre"], press["nombre"]);
    assert_eq!(machine["estado"], press["estado"]);
    assert_eq!(machine["mantenimientos"], json!([record]));

    let stored: Value = server.get(&record_path).await.json().await.unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_token_obtain_and_refresh() {
    let server = TestServer::new().await;

    let response = server
        .request(Method::POST, "/token/")
        .json(&json!({ "username": USERNAME, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let pair: Value = response.json().await.unwrap();
    let access = pair["access"].as_str().unwrap().to_string();
    let refresh = pair["refresh"].as_str().unwrap().to_string();

    // Access token opens resource routes
    let response = server
        .request(Method::GET, "/maquinas/")
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Refresh token does not
    let response = server
        .request(Method::GET, "/maquinas/")
        .bearer_auth(&refresh)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .request(Method::POST, "/token/refresh/")
        .json(&json!({ "refresh": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let renewed: Value = response.json().await.unwrap();
    assert_ne!(renewed["access"].as_str().unwrap(), access);
}

#[tokio::test]
async fn test_token_wrong_password() {
    let server = TestServer::new().await;

    let response = server
        .request(Method::POST, "/token/")
        .json(&json!({ "username": USERNAME, "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, 2003);
}

#[tokio::test]
async fn test_token_missing_fields() {
    let server = TestServer::new().await;

    let response = server
        .request(Method::POST, "/token/")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = response.json().await.unwrap();
    assert!(body.data.get("username").is_some());
    assert!(body.data.get("password").is_some());
}

// ============================================================================
// Machine Tests
// ============================================================================

#[tokio::test]
async fn test_create_machine_returns_record() {
    let server = TestServer::new().await;
    let body = server.create_machine("Press-1").await;

    assert!(body["id"].is_i64());
    assert_eq!(body["nombre"], "Press-1");
    assert_eq!(body["estado"], "activa");
    assert_eq!(body["ultima_fecha_mantenimiento"], "2024-01-10");
    assert_eq!(body["mantenimientos"], json!([]));
}

#[tokio::test]
async fn test_created_machine_is_retrievable() {
    let server = TestServer::new().await;
    let created = server.create_machine("Press-1").await;

    let response = server.get(&format!("/maquinas/{}/", id_of(&created))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Value = response.json().await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_machine_validation_errors() {
    let server = TestServer::new().await;

    let response = server
        .send_json(
            Method::POST,
            "/maquinas/",
            &json!({
                "nombre": "",
                "estado": "x".repeat(21),
                "ultima_fecha_mantenimiento": "10/01/2024"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, 3003);
    assert_eq!(body.data["nombre"], json!(["This field may not be blank."]));
    assert_eq!(
        body.data["estado"],
        json!(["Ensure this field has no more than 20 characters."])
    );
    assert_eq!(
        body.data["ultima_fecha_mantenimiento"],
        json!(["Date has wrong format. Use one of these formats instead: YYYY-MM-DD."])
    );
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let server = TestServer::new().await;

    let response = server
        .authed(Method::POST, "/maquinas/")
        .header("content-type", "application/json")
        .body("{\"nombre\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, 3001);
}

#[tokio::test]
async fn test_put_and_patch_machine() {
    let server = TestServer::new().await;
    let id = id_of(&server.create_machine("Press-1").await);
    let path = format!("/maquinas/{id}/");

    // PUT needs every field
    let response = server
        .send_json(Method::PUT, &path, &json!({ "estado": "detenida" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // PATCH changes only what is sent
    let response = server
        .send_json(Method::PATCH, &path, &json!({ "estado": "detenida" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let patched: Value = response.json().await.unwrap();
    assert_eq!(patched["estado"], "detenida");
    assert_eq!(patched["nombre"], "Press-1");

    let response = server
        .send_json(
            Method::PUT,
            &path,
            &json!({
                "nombre": "Press-2",
                "estado": "activa",
                "ultima_fecha_mantenimiento": "2024-03-15",
                "id": 999
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let replaced: Value = response.json().await.unwrap();
    assert_eq!(replaced["id"], id);
    assert_eq!(replaced["nombre"], "Press-2");
    assert_eq!(replaced["ultima_fecha_mantenimiento"], "2024-03-15");
}

#[tokio::test]
async fn test_unknown_and_non_numeric_ids_are_not_found() {
    let server = TestServer::new().await;

    for path in ["/maquinas/42/", "/maquinas/abc/", "/mantenimientos/7/"] {
        let response = server.get(path).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");

        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.code, 4001);
    }

    let response = server.delete("/maquinas/42/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_id_wins_over_unreadable_body() {
    let server = TestServer::new().await;
    let press = id_of(&server.create_machine("Press-1").await);

    for method in [Method::PUT, Method::PATCH] {
        for path in ["/maquinas/999/", "/mantenimientos/999/"] {
            let response = server
                .authed(method.clone(), path)
                .header("content-type", "application/json")
                .body("{not json")
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {path}");
        }

        // A known record still gets the body error
        let response = server
            .authed(method.clone(), &format!("/maquinas/{press}/"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.code, 3001);
    }
}

#[tokio::test]
async fn test_bare_and_trailing_slash_paths() {
    let server = TestServer::new().await;
    let id = id_of(&server.create_machine("Press-1").await);

    assert_eq!(server.get("/maquinas").await.status(), StatusCode::OK);
    assert_eq!(server.get("/maquinas/").await.status(), StatusCode::OK);
    assert_eq!(
        server.get(&format!("/maquinas/{id}")).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        server.get(&format!("/maquinas/{id}/")).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_api_root_lists_collections() {
    let server = TestServer::new().await;

    let response = server.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    let base = format!("http://{}", server.addr);
    assert_eq!(body["maquinas"], format!("{base}/maquinas/"));
    assert_eq!(body["mantenimientos"], format!("{base}/mantenimientos/"));
}

// ============================================================================
// Maintenance Tests
// ============================================================================

#[tokio::test]
async fn test_maintenance_appears_under_its_machine() {
    let server = TestServer::new().await;
    let press = id_of(&server.create_machine("Press-1").await);
    let lathe = id_of(&server.create_machine("Lathe-1").await);

    let record = server.create_maintenance(press, "lubrication").await;
    assert_eq!(record["maquina"], press);
    assert_eq!(record["fecha"], "2024-02-01");
    assert_eq!(record["tipo"], "lubrication");
    server.create_maintenance(lathe, "belts").await;

    let machine: Value = server
        .get(&format!("/maquinas/{press}/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(machine["mantenimientos"], json!([record]));

    let all: Vec<Value> = server.get("/mantenimientos/").await.json().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_maintenance_for_missing_machine_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .send_json(
            Method::POST,
            "/mantenimientos/",
            &json!({ "maquina": 99, "fecha": "2024-02-01", "tipo": "lubrication" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(
        body.data["maquina"],
        json!(["Invalid pk \"99\" - object does not exist."])
    );

    let all: Vec<Value> = server.get("/mantenimientos/").await.json().await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_missing_machine_reported_with_other_field_errors() {
    let server = TestServer::new().await;

    let response = server
        .send_json(
            Method::POST,
            "/mantenimientos/",
            &json!({ "maquina": 99, "fecha": "01/02/2024", "tipo": "lubrication" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(
        body.data["fecha"],
        json!(["Date has wrong format. Use one of these formats instead: YYYY-MM-DD."])
    );
    assert_eq!(
        body.data["maquina"],
        json!(["Invalid pk \"99\" - object does not exist."])
    );
}

#[tokio::test]
async fn test_put_maintenance() {
    let server = TestServer::new().await;
    let press = id_of(&server.create_machine("Press-1").await);
    let lathe = id_of(&server.create_machine("Lathe-1").await);
    let record = server.create_maintenance(press, "oil").await;
    let path = format!("/mantenimientos/{}/", id_of(&record));

    // Full replace can move the record to another machine
    let response = server
        .send_json(
            Method::PUT,
            &path,
            &json!({ "maquina": lathe, "fecha": "2024-03-01", "tipo": "belts" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let replaced: Value = response.json().await.unwrap();
    assert_eq!(replaced["id"], record["id"]);
    assert_eq!(replaced["maquina"], lathe);
    assert_eq!(replaced["fecha"], "2024-03-01");
    assert_eq!(replaced["tipo"], "belts");

    let old_owner: Value = server
        .get(&format!("/maquinas/{press}/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(old_owner["mantenimientos"], json!([]));
    let new_owner: Value = server
        .get(&format!("/maquinas/{lathe}/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(new_owner["mantenimientos"], json!([replaced]));

    // Missing fields
    let response = server
        .send_json(Method::PUT, &path, &json!({ "tipo": "x" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.data["maquina"], json!(["This field is required."]));
    assert_eq!(body.data["fecha"], json!(["This field is required."]));
    assert!(body.data.get("tipo").is_none());

    // Unknown machine
    let response = server
        .send_json(
            Method::PUT,
            &path,
            &json!({ "maquina": 404, "fecha": "2024-03-01", "tipo": "belts" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(
        body.data["maquina"],
        json!(["Invalid pk \"404\" - object does not exist."])
    );

    let stored: Value = server.get(&path).await.json().await.unwrap();
    assert_eq!(stored, replaced);
}

#[tokio::test]
async fn test_patch_and_delete_maintenance() {
    let server = TestServer::new().await;
    let press = id_of(&server.create_machine("Press-1").await);
    let id = id_of(&server.create_maintenance(press, "oil").await);
    let path = format!("/mantenimientos/{id}/");

    let response = server
        .send_json(Method::PATCH, &path, &json!({ "tipo": "filters" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let patched: Value = response.json().await.unwrap();
    assert_eq!(patched["tipo"], "filters");
    assert_eq!(patched["maquina"], press);

    let response = server.delete(&path).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(server.get(&path).await.status(), StatusCode::NOT_FOUND);

    let machine: Value = server
        .get(&format!("/maquinas/{press}/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(machine["mantenimientos"], json!([]));
}

// ============================================================================
// Cascade Delete Tests
// ============================================================================

async fn assert_cascade(server: &TestServer) {
    let press = id_of(&server.create_machine("Press-1").await);
    let lathe = id_of(&server.create_machine("Lathe-1").await);
    let owned = [
        id_of(&server.create_maintenance(press, "oil").await),
        id_of(&server.create_maintenance(press, "belts").await),
    ];
    let other = id_of(&server.create_maintenance(lathe, "filters").await);

    let response = server.delete(&format!("/maquinas/{press}/")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(
        server.get(&format!("/maquinas/{press}/")).await.status(),
        StatusCode::NOT_FOUND
    );
    for id in owned {
        assert_eq!(
            server.get(&format!("/mantenimientos/{id}/")).await.status(),
            StatusCode::NOT_FOUND
        );
    }
    assert_eq!(
        server.get(&format!("/mantenimientos/{other}/")).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_machine_delete_cascades() {
    let server = TestServer::new().await;
    assert_cascade(&server).await;
}

#[tokio::test]
async fn test_machine_delete_cascades_on_file_storage() {
    let server = TestServer::with_file_storage().await;
    assert_cascade(&server).await;
}
