use crate::{controller::ApiResponse, params::event::*};
use crate::{AppState, Error};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use domain::{event as EventApi, events};

use log::*;

/// REPORT a new Event from a Sensor and forward it to the Sensor's subscribers
#[utoipa::path(
    post,
    path = "/events",
    request_body = CreateParams,
    responses(
        (status = 200, description = "Successfully stored and broadcast the Event", body = events::Model),
        (status = 404, description = "No Sensor with that serial number"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    trace!("REPORT Event from: {params:?}");

    let event = EventApi::receive(
        &app_state.storage,
        &app_state.registry,
        params.into_reported_event(),
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), event)))
}
