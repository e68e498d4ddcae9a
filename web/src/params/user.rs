use domain::{user::NewUser, Id};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = params::user::CreateParams)]
pub struct CreateParams {
    pub name: String,
}

impl From<CreateParams> for NewUser {
    fn from(params: CreateParams) -> Self {
        NewUser { name: params.name }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = params::user::AttachSensorParams)]
pub struct AttachSensorParams {
    pub sensor_id: Id,
}
