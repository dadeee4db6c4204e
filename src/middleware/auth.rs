use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::api::auth::Claims;
use crate::app_state::AppState;
use crate::db::models::user::User;
use crate::utils::api_response::ApiResponse;

/// RBAC permissions cache, keyed by user id
pub type PermissionCache = Arc<Cache<i32, UserPermissions>>;

pub fn create_permission_cache() -> PermissionCache {
    Arc::new(
        Cache::builder()
            .time_to_live(Duration::from_secs(600))
            .max_capacity(10_000)
            .build(),
    )
}

/// **JWT Middleware** (Handles Token Authentication)
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = req.headers().get(header::AUTHORIZATION).ok_or_else(|| {
        debug!("Missing Authorization header");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing Authorization header", None)
            .into_response()
    })?;

    let token_str = auth_header.to_str().map_err(|_| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid Authorization header format",
            None,
        )
        .into_response()
    })?;

    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
        .into_response()
    })?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("JWT decoding failed: {}", e);
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            Some(json!({ "error": e.to_string() })),
        )
        .into_response()
    })?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// What a signed-in account may do.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserPermissions {
    pub user_id: i32,
    pub username: String,
    pub global_role: String,
}

impl From<&User> for UserPermissions {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            global_role: user.role.clone(),
        }
    }
}

impl UserPermissions {
    /// Check if user is a system-wide administrator
    pub fn is_admin(&self) -> bool {
        self.global_role == "admin"
    }

    /// Client scope for reads: admins see everything, everyone else only their own rows.
    pub fn client_scope(&self) -> Option<i32> {
        (!self.is_admin()).then_some(self.user_id)
    }

    pub fn require_admin(&self) -> Result<(), ApiResponse<()>> {
        if self.is_admin() {
            return Ok(());
        }
        warn!(user_id = self.user_id, "admin-only operation refused");
        Err(ApiResponse::error(
            StatusCode::FORBIDDEN,
            "Only administrators can perform this action",
            Some(json!({ "code": "forbidden" })),
        ))
    }
}

/// **RBAC Middleware with `moka`**
///
/// Loads the account behind the token. Locked or deleted accounts are refused
/// even while their token is still valid.
pub async fn rbac_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = req.extensions().get::<Claims>().cloned().ok_or_else(|| {
        error!("Missing JWT claims in request");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing JWT claims in request", None)
            .into_response()
    })?;

    let user_id = claims.user_id().map_err(|e| e.into_response())?;

    if let Some(cached) = state.permission_cache.get(&user_id) {
        req.extensions_mut().insert(cached);
        return Ok(next.run(req).await);
    }

    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(|e| ApiResponse::<()>::from(e).into_response())?
        .ok_or_else(|| {
            warn!(user_id, "token refers to an unknown user");
            ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Unknown user", None).into_response()
        })?;

    if user.account_locked {
        warn!(user_id, "request from locked account");
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Account is locked. Contact your administrator.",
            None,
        )
        .into_response());
    }

    let permissions = UserPermissions::from(&user);
    state.permission_cache.insert(user_id, permissions.clone());

    req.extensions_mut().insert(permissions);
    Ok(next.run(req).await)
}
