use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Mount the interactive API explorer at `/docs`.
///
/// The raw OpenAPI document stays available at `/api-doc/openapi.json` for
/// clients that generate bindings from it.
pub fn router(state: SharedState) -> Router<SharedState> {
    let swagger = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());
    Router::from(swagger).with_state(state)
}
