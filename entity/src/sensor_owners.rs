use crate::Id;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Binding of a sensor to the user that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::sensor_owners::Model)]
pub struct Model {
    pub user_id: Id,
    pub sensor_id: Id,
}
