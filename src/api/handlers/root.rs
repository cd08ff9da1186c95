//! API root view.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::HOST},
};
use serde_json::{Map, Value};

use crate::api::router::RESOURCE_PREFIXES;
use crate::api::state::AppState;

/// List every resource collection with its absolute URL.
///
/// URLs are built from the `Host` header, falling back to the configured
/// listen address when the client sent none.
pub async fn api_root(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map_or_else(
            || {
                let server = &state.config.server;
                format!("{}:{}", server.host, server.port)
            },
            ToString::to_string,
        );

    Json(Value::Object(collection_links(&host)))
}

fn collection_links(host: &str) -> Map<String, Value> {
    RESOURCE_PREFIXES
        .iter()
        .map(|prefix| {
            (
                (*prefix).to_string(),
                Value::String(format!("http://{host}/{prefix}/")),
            )
        })
        .collect()
}
