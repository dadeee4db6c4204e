pub mod auth;
pub mod cancellation;
pub mod health;
pub mod notification;
pub mod points;

use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_swagger_ui::SwaggerUi;

use crate::app_state::AppState;
use crate::middleware::auth::{jwt_middleware, rbac_middleware};

/// Every documented path, merged into one document.
pub fn api_doc() -> utoipa::openapi::OpenApi {
    auth::AuthDoc::openapi()
        .merge_from(cancellation::CancellationDoc::openapi())
        .merge_from(points::PointsDoc::openapi())
        .merge_from(notification::NotificationDoc::openapi())
}

/// Full HTTP surface over `state`.
pub fn router(state: AppState) -> Router {
    let doc = api_doc();
    let timeout = state.config.request_timeout;

    let public_routes = Router::new()
        .merge(health::health_routes())
        .merge(auth::auth_routes());

    // Layers run bottom-up: the token is checked before the account is loaded.
    let private_routes = Router::new()
        .merge(cancellation::cancellation_routes())
        .merge(points::points_routes())
        .merge(notification::notification_routes())
        .route_layer(from_fn_with_state(state.clone(), rbac_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_middleware));

    Router::new()
        .merge(public_routes)
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", doc.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/rapidoc.json", doc).path("/rapidoc"))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
