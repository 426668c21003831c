use sea_orm::DatabaseConnection;

use crate::{
    backend,
    config::Config,
    error::SkgtResult,
    openstreetmap,
    page::PageClient,
    realtime::{self, VirtualBoard},
    schedules,
};

/// Scrapes everything anew and replaces the database contents with it.
/// Nothing is written unless every step succeeds.
pub async fn update(db: &DatabaseConnection, config: &Config) -> SkgtResult<()> {
    log::info!("Starting update");

    let client = PageClient::new(&config.fetch)?;

    let (timetables, mut stops) =
        schedules::acquire_all_timetables(&client, config.parallel_requests).await?;
    log::info!(
        "Got {} timetables and {} stops",
        timetables.len(),
        stops.len()
    );

    let coordinates = openstreetmap::get_stops(&client).await?;

    let board = VirtualBoard::new(config.fetch.clone(), coordinates);
    realtime::enrich_stop_metadata(&board, &mut stops, config.parallel_requests).await?;

    backend::fill(db, &stops, &timetables).await?;

    log::info!("Update done");
    Ok(())
}
