use crate::{controller::health_check_controller, params, AppState};
use axum::{
    routing::{get, post},
    Router,
};

use crate::controller::{event_controller, sensor_controller, user_controller};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Sensor Telemetry API"
        ),
        paths(
            health_check_controller::health_check,
            sensor_controller::create,
            sensor_controller::index,
            sensor_controller::read,
            sensor_controller::history,
            sensor_controller::events,
            event_controller::create,
            user_controller::create,
            user_controller::sensors,
            user_controller::attach_sensor,
        ),
        components(
            schemas(
                domain::events::Model,
                domain::sensor_owners::Model,
                domain::sensor_type::SensorType,
                domain::sensors::Model,
                domain::users::Model,
                params::event::CreateParams,
                params::sensor::CreateParams,
                params::user::CreateParams,
                params::user::AttachSensorParams,
            )
        ),
        tags(
            (name = "sensor_telemetry", description = "Sensor registration, event reporting and live event subscriptions")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(sensor_routes(app_state.clone()))
        .merge(event_routes(app_state.clone()))
        .merge(user_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn sensor_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sensors", post(sensor_controller::create))
        .route("/sensors", get(sensor_controller::index))
        .route("/sensors/{sensor_id}", get(sensor_controller::read))
        .route(
            "/sensors/{sensor_id}/history",
            get(sensor_controller::history),
        )
        .route("/sensors/{sensor_id}/events", get(sensor_controller::events))
        .with_state(app_state)
}

fn event_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/events", post(event_controller::create))
        .with_state(app_state)
}

fn user_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/users", post(user_controller::create))
        .route("/users/{user_id}/sensors", get(user_controller::sensors))
        .route(
            "/users/{user_id}/sensors",
            post(user_controller::attach_sensor),
        )
        .with_state(app_state)
}
