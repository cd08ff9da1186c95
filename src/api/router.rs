//! Router setup and configuration.

use axum::{
    Router, middleware,
    routing::{MethodRouter, get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::handlers::{health, machines, maintenances, root, token};
use crate::api::middleware::auth::require_auth;
use crate::api::state::AppState;

/// Machine collection prefix.
pub const MACHINES: &str = "maquinas";
/// Maintenance collection prefix.
pub const MAINTENANCES: &str = "mantenimientos";

/// Resource collections in the order the API root lists them.
pub const RESOURCE_PREFIXES: [&str; 2] = [MACHINES, MAINTENANCES];

/// Register a route under both its trailing-slash and bare path.
fn route_both(
    router: Router<AppState>,
    path: &str,
    method_router: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(&format!("{path}/"), method_router.clone())
        .route(path, method_router)
}

/// Register the collection and per-record routes of one resource.
fn resource(
    router: Router<AppState>,
    prefix: &str,
    collection: MethodRouter<AppState>,
    member: MethodRouter<AppState>,
) -> Router<AppState> {
    let router = route_both(router, &format!("/{prefix}"), collection);
    route_both(router, &format!("/{prefix}/{{id}}"), member)
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    // Health and metrics routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics));

    // Token routes (credentials in the body)
    let token_routes = route_both(Router::new(), "/token", post(token::obtain));
    let token_routes = route_both(token_routes, "/token/refresh", post(token::refresh));

    let resources = [
        (
            MACHINES,
            get(machines::list).post(machines::create),
            get(machines::retrieve)
                .put(machines::replace)
                .patch(machines::partial_update)
                .delete(machines::destroy),
        ),
        (
            MAINTENANCES,
            get(maintenances::list).post(maintenances::create),
            get(maintenances::retrieve)
                .put(maintenances::replace)
                .patch(maintenances::partial_update)
                .delete(maintenances::destroy),
        ),
    ];

    // Resource routes and API root (auth required)
    let api_routes = resources
        .into_iter()
        .fold(
            Router::new().route("/", get(root::api_root)),
            |router, (prefix, collection, member)| resource(router, prefix, collection, member),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Combine all routes
    Router::new()
        .merge(health_routes)
        .merge(token_routes)
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
