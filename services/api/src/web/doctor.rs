//! services/api/src/web/doctor.rs
//!
//! The doctor surface: a read-only lookup over the shared sheet. The
//! doctor picks a date; the view shows the patient's most recent entry
//! for that date.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use diet_tracker_core::domain::{DietEntry, Role};
use diet_tracker_core::ports::PortError;

use crate::web::middleware::AuthContext;
use crate::web::state::AppState;

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct DatesResponse {
    /// Every date with at least one entry, newest first.
    pub dates: Vec<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub sleep_hours: u32,
    pub sleep_minutes: u32,
    pub coffee_cups: u32,
    pub walking_km: f64,
    pub breakfast: String,
    pub snack: String,
    pub lunch: String,
    pub evening_snack: String,
    pub dinner: String,
    pub before_bed: String,
}

impl From<DietEntry> for DaySummary {
    fn from(entry: DietEntry) -> Self {
        Self {
            date: entry.date,
            weight_kg: entry.weight_kg,
            sleep_hours: entry.sleep_hours,
            sleep_minutes: entry.sleep_minutes,
            coffee_cups: entry.coffee_cups,
            walking_km: entry.walking_km,
            breakfast: entry.breakfast,
            snack: entry.snack,
            lunch: entry.lunch,
            evening_snack: entry.evening_snack,
            dinner: entry.dinner,
            before_bed: entry.before_bed,
        }
    }
}

fn require_doctor(ctx: &AuthContext) -> Result<(), (StatusCode, String)> {
    if ctx.role != Role::Doctor {
        return Err((
            StatusCode::FORBIDDEN,
            "Only doctor accounts can view summaries".to_string(),
        ));
    }
    Ok(())
}

fn data_error(e: PortError) -> (StatusCode, String) {
    error!("failed to read the entry sheet: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "An error occurred while loading the data".to_string(),
    )
}

/// Every distinct entry date, newest first.
fn distinct_dates_newest_first(entries: &[DietEntry]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = entries.iter().map(|e| e.date).collect();
    dates.sort_unstable();
    dates.dedup();
    dates.reverse();
    dates
}

/// A date may repeat across rows; the last appended row is the current one.
fn latest_for_date(entries: &[DietEntry], date: NaiveDate) -> Option<&DietEntry> {
    entries.iter().rev().find(|e| e.date == date)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /summary/dates - The dates that have at least one entry
#[utoipa::path(
    get,
    path = "/summary/dates",
    responses(
        (status = 200, description = "Available dates, newest first", body = DatesResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a doctor account"),
        (status = 500, description = "The entry store could not be read")
    )
)]
pub async fn list_dates_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<DatesResponse>, (StatusCode, String)> {
    require_doctor(&ctx)?;

    let entries = state.entries.read_all().await.map_err(data_error)?;
    Ok(Json(DatesResponse {
        dates: distinct_dates_newest_first(&entries),
    }))
}

/// GET /summary/{date} - The most recent entry for one date
#[utoipa::path(
    get,
    path = "/summary/{date}",
    params(
        ("date" = String, Path, description = "The day to summarize, as YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "The most recent entry for that date", body = DaySummary),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a doctor account"),
        (status = 404, description = "No entries for that date"),
        (status = 500, description = "The entry store could not be read")
    )
)]
pub async fn day_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<DaySummary>, (StatusCode, String)> {
    require_doctor(&ctx)?;

    let entries = state.entries.read_all().await.map_err(data_error)?;
    let entry = latest_for_date(&entries, date)
        .ok_or((StatusCode::NOT_FOUND, format!("No entries for {}", date)))?;
    Ok(Json(DaySummary::from(entry.clone())))
}
