//! services/api/src/web/auth.rs
//!
//! Authentication endpoints driving the two-step login protocol:
//! password first, then a time-based one-time code.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use diet_tracker_core::domain::Session;
use diet_tracker_core::gate::GateError;

use crate::web::middleware::AuthContext;
use crate::web::sessions::session_token;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Shown exactly once, on the first login of an account's lifetime.
#[derive(Serialize, ToSchema)]
pub struct EnrollmentPayload {
    /// otpauth:// URI for import into a standard authenticator.
    pub otpauth_url: String,
    /// The same URI rendered as a PNG QR code, base64-encoded.
    pub qr_png_base64: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<EnrollmentPayload>,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyResponse {
    pub phase: String,
    pub username: String,
    pub role: String,
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub username: String,
    pub role: String,
}

/// Maps a gate rejection to the HTTP response the caller sees. Store
/// failures are logged in full but reported generically.
fn gate_error_response(e: GateError) -> (StatusCode, String) {
    match e {
        GateError::InvalidCredentials
        | GateError::InvalidOneTimeCode
        | GateError::SessionExpired => (StatusCode::UNAUTHORIZED, e.to_string()),
        GateError::Store(inner) => {
            error!("credential store failure: {:?}", inner);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication error".to_string(),
            )
        }
        GateError::Enrollment(msg) => {
            error!("enrollment rendering failed: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication error".to_string(),
            )
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Verify the password and move to the code step
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Password verified; a one-time code is now expected", body = LoginResponse),
        (status = 401, description = "Invalid username or password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Run the password step of the gate on a fresh session
    let mut session = Session::new();
    state
        .gate
        .begin_login(&mut session, &req.username, &req.password)
        .await
        .map_err(gate_error_response)?;

    // 2. The enrollment payload is handed out only here, exactly once
    let enrollment = session.take_enrollment().map(|e| EnrollmentPayload {
        otpauth_url: e.otpauth_url,
        qr_png_base64: e.qr_png_base64,
    });

    // 3. Store the session under a fresh token
    let token = Uuid::new_v4().to_string();
    state.sessions.put(&token, session).await;

    // 4. Create session cookie
    let cookie = format!("session={}; HttpOnly; SameSite=Lax; Path=/", token);

    // 5. Return response with cookie
    let response = LoginResponse {
        phase: "awaiting_code".to_string(),
        enrollment,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/verify - Verify the time-based one-time code
#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Code verified; the session is authenticated", body = VerifyResponse),
        (status = 401, description = "Invalid code or no pending login"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Extract the session cookie
    let token = session_token(&headers)
        .map(str::to_string)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Rehydrate the pending session
    let mut session = state
        .sessions
        .get(&token)
        .await
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 3. Run the code step of the gate; a failed attempt keeps the session
    //    in its current phase
    match state.gate.verify_code(&mut session, &req.code, Utc::now()) {
        Ok(()) => {
            let response = VerifyResponse {
                phase: "authenticated".to_string(),
                username: session.username.clone().unwrap_or_default(),
                role: session.role.map(|r| r.to_string()).unwrap_or_default(),
            };
            state.sessions.put(&token, session).await;
            Ok(Json(response))
        }
        Err(e) => {
            state.sessions.put(&token, session).await;
            Err(gate_error_response(e))
        }
    }
}

/// POST /auth/logout - Logout and destroy the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Extract the session cookie
    let token = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Destroy the session
    state.sessions.remove(token).await;

    // 3. Clear cookie
    let cookie = "session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0";

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/me - The authenticated identity behind this session
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The current identity", body = MeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me_handler(Extension(ctx): Extension<AuthContext>) -> Json<MeResponse> {
    Json(MeResponse {
        username: ctx.username,
        role: ctx.role.to_string(),
    })
}
