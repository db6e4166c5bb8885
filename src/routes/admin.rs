use axum::{Router, extract::State, http::StatusCode, routing::post};

use crate::{services::public_service, state::SharedState};

/// Operational endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/admin/leaderboard/reset", post(reset_leaderboard))
}

#[utoipa::path(
    post,
    path = "/admin/leaderboard/reset",
    tag = "admin",
    responses((status = 204, description = "Leaderboard wiped"))
)]
/// Wipe the global leaderboard and persist the empty state.
pub async fn reset_leaderboard(State(state): State<SharedState>) -> StatusCode {
    public_service::reset_leaderboard(&state).await;
    StatusCode::NO_CONTENT
}
