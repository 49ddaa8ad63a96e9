//! Embedded OpenAPI document and Swagger UI page.
//!
//! Both assets are compiled into the binary; serving them never touches the
//! filesystem.

use axum::{
    http::header,
    response::{Html, IntoResponse},
};

/// Route the OpenAPI document is served from.
pub const SPEC_URL: &str = "/openapi.yaml";

/// Token in the Swagger template replaced by the document URL.
pub const SPEC_URL_PLACEHOLDER: &str = "{{SPEC_URL}}";

static OPENAPI_SPEC: &[u8] = include_bytes!("../../assets/openapi.yaml");
static SWAGGER_TEMPLATE: &str = include_str!("../../assets/swagger.html");

/// The embedded OpenAPI document, as YAML.
pub fn openapi_spec() -> &'static [u8] {
    OPENAPI_SPEC
}

/// The Swagger UI page pointing at `spec_url`.
pub fn swagger_html(spec_url: &str) -> String {
    SWAGGER_TEMPLATE.replace(SPEC_URL_PLACEHOLDER, spec_url)
}

/// `GET /openapi.yaml`
pub async fn serve_spec() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/yaml")], openapi_spec())
}

/// `GET /docs` and everything below it.
pub async fn serve_docs() -> Html<String> {
    Html(swagger_html(SPEC_URL))
}
