use crate::{controller::ApiResponse, params::user::*};
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::{http::StatusCode, response::IntoResponse, Json};
use domain::{sensor_owners, sensors, user as UserApi, users, Id};

use log::*;

/// CREATE a new User
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateParams,
    responses(
        (status = 200, description = "Successfully created a new User", body = users::Model),
        (status = 422, description = "Empty user name"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("CREATE new User from: {params:?}");

    let user = UserApi::register(&app_state.storage, params.into()).await?;

    debug!("Newly created User {:?}", &user);

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), user)))
}

/// GET all Sensors owned by a User
#[utoipa::path(
    get,
    path = "/users/{user_id}/sensors",
    params(
        ("user_id" = Id, Path, description = "User id whose Sensors to retrieve")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the User's Sensors", body = [sensors::Model]),
        (status = 404, description = "User not found"),
    )
)]
pub async fn sensors(
    State(app_state): State<AppState>,
    Path(user_id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    let sensors = UserApi::find_sensors(&app_state.storage, user_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), sensors)))
}

/// ATTACH a Sensor to a User
#[utoipa::path(
    post,
    path = "/users/{user_id}/sensors",
    params(
        ("user_id" = Id, Path, description = "User id to attach the Sensor to")
    ),
    request_body = AttachSensorParams,
    responses(
        (status = 200, description = "Successfully attached the Sensor", body = sensor_owners::Model),
        (status = 404, description = "User or Sensor not found"),
    )
)]
pub async fn attach_sensor(
    State(app_state): State<AppState>,
    Path(user_id): Path<Id>,
    Json(params): Json<AttachSensorParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("ATTACH Sensor {} to User {user_id}", params.sensor_id);

    let binding = UserApi::attach_sensor(&app_state.storage, user_id, params.sensor_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), binding)))
}
