use axum::{
    body::Body,
    http::{HeaderValue, Method, Request},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    handlers::{bookings, transitions, trip_records},
    middleware::{self as app_middleware, RequestId},
    state::AppState,
};

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(24 * 60 * 60))
}

pub fn build_app(state: AppState) -> Router {
    let booking_routes = Router::new()
        .route(
            "/api/{stage}/search-requests",
            get(bookings::search_requests),
        )
        .route(
            "/api/{stage}/create-request",
            post(bookings::create_request),
        )
        .route(
            "/api/{stage}/request/{trn_request_uid}",
            get(bookings::get_request),
        )
        .route(
            "/api/{stage}/request/{trn_request_uid}/action-logs",
            get(bookings::list_action_logs),
        )
        .route(
            "/api/{stage}/request/{trn_request_uid}/add-fuel",
            post(trip_records::add_fuel),
        )
        .route(
            "/api/{stage}/request/{trn_request_uid}/satisfaction-survey",
            post(trip_records::satisfaction_survey),
        );

    let transition_routes = Router::new()
        .route(
            "/api/{stage}/update-confirmed",
            put(transitions::update_confirmed),
        )
        .route(
            "/api/{stage}/update-verified",
            put(transitions::update_verified),
        )
        .route(
            "/api/{stage}/update-approved",
            put(transitions::update_approved),
        )
        .route(
            "/api/{stage}/update-rejected",
            put(transitions::update_rejected),
        )
        .route(
            "/api/{stage}/update-resubmitted",
            put(transitions::update_resubmitted),
        )
        .route(
            "/api/{stage}/update-key-handover",
            put(transitions::update_key_handover),
        )
        .route(
            "/api/{stage}/update-key-received",
            put(transitions::update_key_received),
        )
        .route(
            "/api/{stage}/update-vehicle-pickup",
            put(transitions::update_vehicle_pickup),
        )
        .route(
            "/api/{stage}/update-vehicle-returned",
            put(transitions::update_vehicle_returned),
        )
        .route(
            "/api/{stage}/update-return-accepted",
            put(transitions::update_return_accepted),
        )
        .route(
            "/api/{stage}/update-canceled",
            put(transitions::update_canceled),
        );

    let protected_routes = Router::new()
        .merge(booking_routes)
        .merge(transition_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth,
        ));

    let cors = cors_layer(&state.config);
    Router::new()
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        let request_id = req
                            .extensions()
                            .get::<RequestId>()
                            .map(|id| id.0.as_str())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http_request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id,
                        )
                    }),
                )
                .layer(axum_middleware::from_fn(app_middleware::log_error_responses))
                .layer(cors),
        )
        .with_state(state)
}
