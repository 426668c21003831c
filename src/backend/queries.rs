use itertools::Itertools;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::Serialize;

use crate::{
    db::error::{DbError, DbResult},
    entity::{arrival, line, route, route_stop, stop},
    schedules::{ScheduleType, TimeOfDay},
    transit::{self, Line, VehicleKind},
};

/// A direction of a line, with its stops in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStops {
    pub direction: String,
    pub stops: Vec<transit::Stop>,
}

/// When one direction of a line calls at a stop on some type of day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledArrivals {
    pub line: Line,
    pub direction: String,
    pub times: Vec<TimeOfDay>,
}

#[derive(Debug, FromQueryResult)]
struct ArrivalRow {
    vehicle: i32,
    number: String,
    route_id: i64,
    direction: String,
    time: i32,
    day_type: i32,
}

#[derive(Debug, FromQueryResult)]
struct RouteStopRow {
    route_id: i64,
    direction: String,
    id: i64,
    name: String,
    description: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, FromQueryResult)]
struct LineRow {
    vehicle: i32,
    number: String,
}

impl TryFrom<LineRow> for Line {
    type Error = DbError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let vehicle = VehicleKind::try_from(row.vehicle)
            .map_err(|e| DbError::InvalidData(format!("line {}: {}", row.number, e)))?;
        Ok(Line::new(vehicle, row.number))
    }
}

impl From<stop::Model> for transit::Stop {
    fn from(model: stop::Model) -> Self {
        transit::Stop {
            id: model.id,
            name: model.name,
            description: model.description,
            latitude: model.latitude,
            longitude: model.longitude,
        }
    }
}

/// All lines, ordered by vehicle and number
pub async fn get_lines(db: &DatabaseConnection) -> DbResult<Vec<Line>> {
    use line::Column as l;

    let rows = line::Entity::find()
        .select_only()
        .columns([l::Vehicle, l::Number])
        .order_by_asc(l::Vehicle)
        .order_by_asc(l::Number)
        .into_model::<LineRow>()
        .all(db)
        .await?;

    rows.into_iter().map(Line::try_from).collect()
}

/// The directions of a line with their stops, or `None` for an unknown line
pub async fn get_routes(db: &DatabaseConnection, line: &Line) -> DbResult<Option<Vec<RouteStops>>> {
    let Some(line_model) = line::Entity::find()
        .filter(line::Column::Vehicle.eq(i32::from(line.vehicle)))
        .filter(line::Column::Number.eq(line.number.as_str()))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let rows = route_stop::Entity::find()
        .join(JoinType::InnerJoin, route_stop::Relation::Route.def())
        .join(JoinType::InnerJoin, route_stop::Relation::Stop.def())
        .filter(route::Column::LineId.eq(line_model.id))
        .order_by_asc(route::Column::Id)
        .order_by_asc(route_stop::Column::Position)
        .select_only()
        .column(route_stop::Column::RouteId)
        .column(route::Column::Direction)
        .columns([
            stop::Column::Id,
            stop::Column::Name,
            stop::Column::Description,
            stop::Column::Latitude,
            stop::Column::Longitude,
        ])
        .into_model::<RouteStopRow>()
        .all(db)
        .await?;

    let routes = rows
        .into_iter()
        .group_by(|row| (row.route_id, row.direction.clone()))
        .into_iter()
        .map(|((_, direction), rows)| RouteStops {
            direction,
            stops: rows
                .map(|row| transit::Stop {
                    id: row.id,
                    name: row.name,
                    description: row.description,
                    latitude: row.latitude,
                    longitude: row.longitude,
                })
                .collect(),
        })
        .collect();

    Ok(Some(routes))
}

pub async fn get_stop(db: &DatabaseConnection, id: i64) -> DbResult<Option<transit::Stop>> {
    let stop = stop::Entity::find_by_id(id).one(db).await?;
    Ok(stop.map(transit::Stop::from))
}

/// Lines which have a route through the stop
pub async fn get_stop_lines(db: &DatabaseConnection, id: i64) -> DbResult<Vec<Line>> {
    use line::Column as l;

    let rows = line::Entity::find()
        .join(JoinType::InnerJoin, line::Relation::Route.def())
        .join(JoinType::InnerJoin, route::Relation::RouteStop.def())
        .filter(route_stop::Column::StopId.eq(id))
        .select_only()
        .columns([l::Vehicle, l::Number])
        .distinct()
        .order_by_asc(l::Vehicle)
        .order_by_asc(l::Number)
        .into_model::<LineRow>()
        .all(db)
        .await?;

    rows.into_iter().map(Line::try_from).collect()
}

/// Timetabled calls at a stop on days of type `day`, per line and direction,
/// earliest first
pub async fn get_stop_schedule(
    db: &DatabaseConnection,
    id: i64,
    day: ScheduleType,
) -> DbResult<Vec<ScheduledArrivals>> {
    let rows = arrival::Entity::find()
        .join(JoinType::InnerJoin, arrival::Relation::RouteStop.def())
        .join(JoinType::InnerJoin, route_stop::Relation::Route.def())
        .join(JoinType::InnerJoin, route::Relation::Line.def())
        .filter(arrival::Column::StopId.eq(id))
        .filter(arrival::Column::Time.is_not_null())
        .order_by_asc(line::Column::Vehicle)
        .order_by_asc(line::Column::Number)
        .order_by_asc(route::Column::Id)
        .order_by_asc(arrival::Column::Time)
        .select_only()
        .columns([line::Column::Vehicle, line::Column::Number])
        .column(route::Column::Direction)
        .columns([arrival::Column::RouteId, arrival::Column::Time, arrival::Column::DayType])
        .into_model::<ArrivalRow>()
        .all(db)
        .await?;

    let mut schedule: Vec<ScheduledArrivals> = Vec::new();
    let mut last_route = None;

    for row in rows {
        let day_type = ScheduleType::from_bits(row.day_type)
            .ok_or_else(|| DbError::InvalidData(format!("day type {}", row.day_type)))?;
        if !day_type.covers(day) {
            continue;
        }

        let time = TimeOfDay::from_minutes(row.time)
            .ok_or_else(|| DbError::InvalidData(format!("arrival at minute {}", row.time)))?;

        if last_route != Some(row.route_id) {
            last_route = Some(row.route_id);
            schedule.push(ScheduledArrivals {
                line: Line::try_from(LineRow {
                    vehicle: row.vehicle,
                    number: row.number,
                })?,
                direction: row.direction,
                times: Vec::new(),
            });
        }

        if let Some(current) = schedule.last_mut() {
            current.times.push(time);
        }
    }

    Ok(schedule)
}
