use crate::Id;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::users::Model)]
pub struct Model {
    #[serde(skip_deserializing)]
    pub id: Id,

    pub name: String,
}
