use crate::{controller::ApiResponse, params::sensor::*, ws};
use crate::{AppState, Error};
use axum::extract::ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::{http::StatusCode, response::IntoResponse, Json};
use domain::{event as EventApi, events, sensor as SensorApi, sensors, Id};

use log::*;

/// REGISTER a new Sensor, or refresh the one already using the serial number
#[utoipa::path(
    post,
    path = "/sensors",
    request_body = CreateParams,
    responses(
        (status = 200, description = "Successfully registered a Sensor", body = sensors::Model),
        (status = 400, description = "Malformed request body"),
        (status = 422, description = "Invalid serial number or sensor type"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("REGISTER Sensor from: {params:?}");

    let sensor = SensorApi::register(&app_state.storage, params.into()).await?;

    debug!("Registered Sensor: {sensor:?}");

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), sensor)))
}

/// GET all Sensors
#[utoipa::path(
    get,
    path = "/sensors",
    responses(
        (status = 200, description = "Successfully retrieved all Sensors", body = [sensors::Model]),
    )
)]
pub async fn index(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let sensors = SensorApi::find_all(&app_state.storage).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), sensors)))
}

/// GET a particular Sensor specified by its id.
#[utoipa::path(
    get,
    path = "/sensors/{sensor_id}",
    params(
        ("sensor_id" = Id, Path, description = "Sensor id to retrieve")
    ),
    responses(
        (status = 200, description = "Successfully retrieved a certain Sensor by its id", body = sensors::Model),
        (status = 404, description = "Sensor not found"),
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(sensor_id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Sensor by id: {sensor_id}");

    let sensor = SensorApi::find_by_id(&app_state.storage, sensor_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), sensor)))
}

/// GET the events a Sensor reported within a time range
#[utoipa::path(
    get,
    path = "/sensors/{sensor_id}/history",
    params(
        ("sensor_id" = Id, Path, description = "Sensor id whose events to retrieve"),
        HistoryParams
    ),
    responses(
        (status = 200, description = "Events within the range, oldest first", body = [events::Model]),
        (status = 404, description = "Sensor not found"),
        (status = 422, description = "start_date is after end_date"),
    )
)]
pub async fn history(
    State(app_state): State<AppState>,
    Path(sensor_id): Path<Id>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "GET history of Sensor {sensor_id} from {} to {}",
        params.start_date, params.end_date
    );

    let events = EventApi::find_history(
        &app_state.storage,
        sensor_id,
        params.start_date,
        params.end_date,
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), events)))
}

/// SUBSCRIBE to a Sensor's events over a websocket
///
/// Sends the Sensor's last known event right away, then every new event as JSON text
/// messages, batched on the server's flush period.
#[utoipa::path(
    get,
    path = "/sensors/{sensor_id}/events",
    params(
        ("sensor_id" = Id, Path, description = "Sensor id to follow")
    ),
    responses(
        (status = 101, description = "Switched to the websocket protocol"),
        (status = 404, description = "Sensor not found"),
    )
)]
pub async fn events(
    State(app_state): State<AppState>,
    Path(sensor_id): Path<Id>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<impl IntoResponse, Error> {
    // Unknown sensors are reported before the upgrade is even considered
    SensorApi::find_by_id(&app_state.storage, sensor_id).await?;

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            debug!("Rejected event stream request for Sensor {sensor_id}: {rejection}");
            return Ok(rejection.into_response());
        }
    };

    Ok(upgrade
        .on_upgrade(move |socket| ws::handler::stream_events(app_state, sensor_id, socket))
        .into_response())
}
