//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use diet_tracker_core::domain::Role;
use std::sync::Arc;

use crate::web::sessions::session_token;
use crate::web::state::AppState;

/// The authenticated identity, inserted into request extensions for the
/// protected handlers to consume.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token: String,
    pub username: String,
    pub role: Role,
}

/// Middleware that rehydrates the session from the `session` cookie and runs
/// it through the gate.
///
/// An expired session is destroyed here, before any protected action can
/// execute. If the session is valid, an `AuthContext` is inserted into
/// request extensions for handlers to use; otherwise 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    // 1. Parse the session token from the cookie header
    let token = session_token(req.headers())
        .map(str::to_string)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Rehydrate the session
    let mut session = state
        .sessions
        .get(&token)
        .await
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 3. Let the gate decide; expired sessions are removed immediately
    if let Err(e) = state.gate.authorize(&mut session, Utc::now()) {
        state.sessions.remove(&token).await;
        return Err((StatusCode::UNAUTHORIZED, e.to_string()));
    }

    // 4. Insert the identity into request extensions
    let (Some(username), Some(role)) = (session.username.clone(), session.role) else {
        state.sessions.remove(&token).await;
        return Err((StatusCode::UNAUTHORIZED, "No session found".to_string()));
    };
    req.extensions_mut().insert(AuthContext {
        token,
        username,
        role,
    });

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
