use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::validate_required;
use super::{ApiError, ApiResponse, AppState};
use crate::domain::AccountId;
use crate::services::{
    AccountView, AuthSession, PendingTicket, RegistrationRequest, TokenPair, TokenType,
    VerifyRequest,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Serialize)]
pub struct RegistrationStarted {
    pub message: String,
    #[serde(flatten)]
    pub ticket: PendingTicket,
}

#[derive(Serialize)]
pub struct TokenStatus {
    pub valid: bool,
    pub account_id: AccountId,
    pub username: String,
    pub expires_at: i64,
}

/// Identity of the caller, inserted by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    pub id: AccountId,
    pub username: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <access token>`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let Some(token) = extract_bearer(&headers) else {
        return Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response());
    };

    let claims = state.shared.tokens.verify(&token, TokenType::Access)?;
    let id = claims.account_id()?;

    tracing::Span::current().record("account", id.value());
    request.extensions_mut().insert(CurrentAccount {
        id,
        username: claims.username,
    });

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Park the registration and send an OTP to the email
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegistrationRequest>,
) -> Result<Json<ApiResponse<RegistrationStarted>>, ApiError> {
    let ticket = state.shared.registration.begin(payload).await?;

    Ok(Json(ApiResponse::success(RegistrationStarted {
        message: "OTP sent to your email for verification".to_string(),
        ticket,
    })))
}

/// POST /auth/verify-otp
/// Complete a registration, returns the new account and its tokens
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthSession>>), ApiError> {
    let session = state.shared.registration.verify(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, ApiError> {
    let username = validate_required("Username", &payload.username)?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let session = state
        .shared
        .registration
        .login(username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(session)))
}

/// POST /auth/token/refresh
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    let refresh = validate_required("Refresh token", &payload.refresh)?;
    let pair = state.shared.registration.refresh(refresh).await?;
    Ok(Json(ApiResponse::success(pair)))
}

/// POST /auth/token/verify
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyTokenRequest>,
) -> Result<Json<ApiResponse<TokenStatus>>, ApiError> {
    let claims = state
        .shared
        .tokens
        .verify(payload.token.trim(), TokenType::Access)?;

    Ok(Json(ApiResponse::success(TokenStatus {
        valid: true,
        account_id: claims.account_id()?,
        username: claims.username,
        expires_at: claims.exp,
    })))
}

/// GET /profile
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<AccountView>>, ApiError> {
    let view = state.shared.registration.profile(current.id).await?;
    Ok(Json(ApiResponse::success(view)))
}
