use sea_orm::{
    ActiveValue::Set, DatabaseConnection, DatabaseTransaction, EntityTrait, TransactionTrait,
};

use crate::{
    db::error::{DbError, DbResult, InPhase},
    entity::{arrival, line, route, route_stop, stop},
    schedules::{Route, Timetable},
    transit::Stop,
};

// rows per INSERT, keeps the statement well under SQLite's bound variable limit
const INSERT_CHUNK: usize = 1000;

/// Replaces all stops, lines, routes and arrivals with the given snapshot.
/// Either all of it is stored or, on error, nothing changes.
pub async fn fill(db: &DatabaseConnection, stops: &[Stop], timetables: &[Timetable]) -> DbResult<()> {
    log::info!(
        "Filling database with {} stops and {} timetables",
        stops.len(),
        timetables.len()
    );

    // dropping the transaction without committing rolls it back
    let txn = db.begin().await.in_phase("starting transaction")?;

    clear(&txn).await?;
    insert_stops(&txn, stops).await?;
    for timetable in timetables {
        insert_timetable(&txn, timetable).await?;
    }

    txn.commit().await.in_phase("committing")?;

    log::info!("Database filled");
    Ok(())
}

async fn clear(txn: &DatabaseTransaction) -> DbResult<()> {
    // dependants first
    arrival::Entity::delete_many()
        .exec(txn)
        .await
        .in_phase("deleting arrivals")?;
    route_stop::Entity::delete_many()
        .exec(txn)
        .await
        .in_phase("deleting route stops")?;
    route::Entity::delete_many()
        .exec(txn)
        .await
        .in_phase("deleting routes")?;
    stop::Entity::delete_many()
        .exec(txn)
        .await
        .in_phase("deleting stops")?;
    line::Entity::delete_many()
        .exec(txn)
        .await
        .in_phase("deleting lines")?;

    Ok(())
}

async fn insert_stops(txn: &DatabaseTransaction, stops: &[Stop]) -> DbResult<()> {
    for chunk in stops.chunks(INSERT_CHUNK) {
        let models = chunk.iter().map(|s| stop::ActiveModel {
            id: Set(s.id),
            name: Set(s.name.clone()),
            description: Set(s.description.clone()),
            latitude: Set(s.latitude),
            longitude: Set(s.longitude),
        });

        stop::Entity::insert_many(models)
            .exec_without_returning(txn)
            .await
            .in_phase("inserting stops")?;
    }

    Ok(())
}

async fn insert_timetable(txn: &DatabaseTransaction, timetable: &Timetable) -> DbResult<()> {
    let line = &timetable.line;

    let model = line::ActiveModel {
        vehicle: Set(line.vehicle.into()),
        number: Set(line.number.clone()),
        ..Default::default()
    };
    let line_id = line::Entity::insert(model)
        .exec(txn)
        .await
        .in_phase(format_args!("inserting line {}", line))?
        .last_insert_id;

    for route in &timetable.routes {
        insert_route(txn, timetable, line_id, route).await?;
    }

    Ok(())
}

async fn insert_route(
    txn: &DatabaseTransaction,
    timetable: &Timetable,
    line_id: i64,
    route: &Route,
) -> DbResult<()> {
    let line = &timetable.line;

    route
        .check_courses()
        .map_err(|e| DbError::InvalidData(format!("{} ({}): {}", line, route.direction, e)))?;

    let model = route::ActiveModel {
        line_id: Set(line_id),
        direction: Set(route.direction.clone()),
        ..Default::default()
    };
    let route_id = route::Entity::insert(model)
        .exec(txn)
        .await
        .in_phase(format_args!("inserting route {} of {}", route.direction, line))?
        .last_insert_id;

    let route_stops = route
        .stops
        .iter()
        .enumerate()
        .map(|(i, stop_id)| route_stop::ActiveModel {
            route_id: Set(route_id),
            position: Set(i as i32 + 1),
            stop_id: Set(*stop_id),
        })
        .collect::<Vec<_>>();

    for chunk in route_stops.chunks(INSERT_CHUNK) {
        route_stop::Entity::insert_many(chunk.to_vec())
            .exec_without_returning(txn)
            .await
            .in_phase(format_args!("inserting stops of route {} of {}", route.direction, line))?;
    }

    let arrivals = route
        .schedules
        .iter()
        .flat_map(move |(day_type, courses)| {
            courses.iter().enumerate().flat_map(move |(c, course)| {
                course
                    .iter()
                    .zip(&route.stops)
                    .map(move |(time, stop_id)| arrival::ActiveModel {
                        route_id: Set(route_id),
                        stop_id: Set(*stop_id),
                        course: Set(c as i32 + 1),
                        time: Set(time.map(|t| t.minutes_since_midnight())),
                        day_type: Set(day_type.bits()),
                        ..Default::default()
                    })
            })
        })
        .collect::<Vec<_>>();

    for chunk in arrivals.chunks(INSERT_CHUNK) {
        arrival::Entity::insert_many(chunk.to_vec())
            .exec_without_returning(txn)
            .await
            .in_phase(format_args!("inserting arrivals of route {} of {}", route.direction, line))?;
    }

    Ok(())
}
