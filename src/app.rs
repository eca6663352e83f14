//! Application object: routes plus the cross-origin policy and request tracing.

use crate::config::CorsOrigins;
use crate::routes::common_routes;
use crate::state::AppState;
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Listed origins may send credentials with any method and header. Methods and headers are
/// mirrored from the preflight because a literal wildcard is not allowed alongside credentials.
/// This is wide open and should be narrowed before production.
pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::mirror_request(),
        CorsOrigins::List(list) => AllowOrigin::list(
            list.iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        ),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.backend_cors_origins);
    common_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
