use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::{Modify, OpenApi, ToSchema};

use crate::app_state::AppState;
use crate::config::Config;
use crate::db::models::user::{User, UserInfo};
use crate::utils::api_response::ApiResponse;

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

/// JWT Claims used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - User ID as String
    pub sub: String,
    /// The username of the authenticated user.
    pub username: String,
    /// the role assigned to the user
    pub role: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    /// Converts `sub` (user ID) to `i32`, or returns a descriptive error.
    pub fn user_id(&self) -> Result<i32, ApiResponse<()>> {
        self.sub.parse::<i32>().map_err(|_| {
            ApiResponse::error(
                StatusCode::BAD_REQUEST,
                "Invalid user ID format in token",
                None,
            )
        })
    }
}

/// Represents a request to log in
#[derive(Serialize, Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Represents a successful login response returning a jwt token.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Signs a token for `user` valid for the configured TTL.
pub fn issue_token(config: &Config, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.clone(),
        exp: (Utc::now().timestamp() as u64 + config.jwt_ttl.as_secs()) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Handles user login
///
/// # Returns
/// * `200 OK` - Returns a JWT token if authentication is successful.
/// * `401 Unauthorized` - If credentials are incorrect.
/// * `403 Forbidden` - If the account is locked.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body(content = LoginRequest, description = "User login details"),
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid username or password"),
        (status = 403, description = "Account is locked"),
        (status = 500, description = "Internal Server Error")
    )
)]
#[instrument(skip_all, fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiResponse<()>> {
    let invalid = || {
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Invalid username or password.", None)
    };

    let user = state
        .store
        .find_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| {
            warn!("Login attempt for unknown user");
            invalid()
        })?;

    // Deny login if the account is locked
    if user.account_locked {
        warn!("Login attempt for locked account");
        return Err(ApiResponse::error(
            StatusCode::FORBIDDEN,
            "Account is locked. Contact your administrator.",
            None,
        ));
    }

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!("Invalid password attempt");
            return Err(invalid());
        }
        Err(e) => {
            error!("Password verification error: {}", e);
            return Err(ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password verification failed",
                None,
            ));
        }
    }

    let token = issue_token(&state.config, &user).map_err(|e| {
        error!("Token generation failed: {}", e);
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Token generation failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    info!("Login successful");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Login successful",
        LoginResponse {
            token,
            user: UserInfo::from(&user),
        },
    ))
}

/// Registers the `bearerAuth` scheme the secured paths refer to.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(login),
    components(schemas(LoginRequest, LoginResponse, UserInfo)),
    tags((name = "Authentication", description = "Sign in and token issuance")),
    modifiers(&SecurityAddon)
)]
pub struct AuthDoc;
