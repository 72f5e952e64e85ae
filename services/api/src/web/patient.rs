//! services/api/src/web/patient.rs
//!
//! The patient surface: submit one daily entry to the shared sheet.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

use diet_tracker_core::domain::{DietEntry, Role};

use crate::web::middleware::AuthContext;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct EntryRequest {
    /// The day this entry describes; several entries may share one date.
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub sleep_hours: u32,
    pub sleep_minutes: u32,
    pub coffee_cups: u32,
    pub walking_km: f64,
    #[serde(default)]
    pub breakfast: String,
    #[serde(default)]
    pub snack: String,
    #[serde(default)]
    pub lunch: String,
    #[serde(default)]
    pub evening_snack: String,
    #[serde(default)]
    pub dinner: String,
    #[serde(default)]
    pub before_bed: String,
}

#[derive(Serialize, ToSchema)]
pub struct EntryResponse {
    pub status: String,
}

/// The input ranges of the submission form.
fn validate(req: &EntryRequest) -> Result<(), String> {
    if !(30.0..=300.0).contains(&req.weight_kg) {
        return Err("Weight must be between 30 and 300 kg".to_string());
    }
    if req.sleep_hours > 24 {
        return Err("Hours of sleep must be between 0 and 24".to_string());
    }
    if req.sleep_minutes > 59 {
        return Err("Minutes of sleep must be between 0 and 59".to_string());
    }
    if !(1..=10).contains(&req.coffee_cups) {
        return Err("Cups of coffee must be between 1 and 10".to_string());
    }
    if req.walking_km < 0.0 {
        return Err("Walking distance cannot be negative".to_string());
    }
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /entries - Append one daily entry
#[utoipa::path(
    post,
    path = "/entries",
    request_body = EntryRequest,
    responses(
        (status = 201, description = "Entry appended to the shared sheet", body = EntryResponse),
        (status = 400, description = "A field is outside the form's ranges"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a patient account"),
        (status = 500, description = "The entry store rejected the append")
    )
)]
pub async fn submit_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<EntryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Only patient accounts submit entries
    if ctx.role != Role::Patient {
        return Err((
            StatusCode::FORBIDDEN,
            "Only patient accounts can submit entries".to_string(),
        ));
    }

    // 2. Check the form ranges
    validate(&req).map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    // 3. Append exactly one row to the entry store
    let entry = DietEntry {
        date: req.date,
        weight_kg: req.weight_kg,
        sleep_hours: req.sleep_hours,
        sleep_minutes: req.sleep_minutes,
        coffee_cups: req.coffee_cups,
        walking_km: req.walking_km,
        breakfast: req.breakfast,
        snack: req.snack,
        lunch: req.lunch,
        evening_snack: req.evening_snack,
        dinner: req.dinner,
        before_bed: req.before_bed,
    };
    state.entries.append(&entry).await.map_err(|e| {
        error!("failed to append entry: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store the entry".to_string(),
        )
    })?;

    // 4. Fire the notification; failures are logged and swallowed, never
    //    surfaced to the patient
    if let Some(notifier) = &state.notifier {
        let body = format!(
            "A new diet entry has been submitted by {}. Please review it!",
            ctx.username
        );
        if let Err(e) = notifier.notify("New Diet Entry!", &body).await {
            warn!("submission notification failed: {:?}", e);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(EntryResponse {
            status: "Entry submitted successfully!".to_string(),
        }),
    ))
}
