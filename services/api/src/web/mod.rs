pub mod auth;
pub mod doctor;
pub mod middleware;
pub mod patient;
pub mod sessions;
pub mod state;

pub use middleware::require_auth;

use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::verify_handler,
        auth::logout_handler,
        auth::me_handler,
        patient::submit_entry_handler,
        doctor::list_dates_handler,
        doctor::day_summary_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            auth::EnrollmentPayload,
            auth::VerifyRequest,
            auth::VerifyResponse,
            auth::MeResponse,
            patient::EntryRequest,
            patient::EntryResponse,
            doctor::DatesResponse,
            doctor::DaySummary,
        )
    ),
    tags(
        (name = "Diet Tracker API", description = "Two-factor gated daily diet tracking over a shared sheet.")
    )
)]
pub struct ApiDoc;
