use axum::Router;
use utoipa::{OpenApi, openapi::OpenApi as OpenApiDocument};
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Where the Swagger UI is mounted.
pub const DOCS_PATH: &str = "/docs";
/// Raw OpenAPI document fetched by the UI.
pub const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Match API document stamped with the running crate version.
pub fn api_document() -> OpenApiDocument {
    let mut document = ApiDoc::openapi();
    document.info.version = env!("CARGO_PKG_VERSION").to_owned();
    document
}

pub fn router(state: SharedState) -> Router<SharedState> {
    Router::from(SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, api_document())).with_state(state)
}
