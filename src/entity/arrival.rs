use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "arrival")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub route_id: i64,
    pub stop_id: i64,
    /// 1-based index of the course within its day type
    pub course: i32,
    /// Minutes since midnight, `None` when the course skips the stop
    pub time: Option<i32>,
    /// `ScheduleType` bits
    pub day_type: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::route_stop::Entity",
        from = "(Column::RouteId, Column::StopId)",
        to = "(super::route_stop::Column::RouteId, super::route_stop::Column::StopId)",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    RouteStop,
}

impl Related<super::route_stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RouteStop.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
