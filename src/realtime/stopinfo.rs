use std::collections::HashMap;

use super::{Error, RtResult, StopBoard};
use crate::{
    openstreetmap::OsmStop,
    page::FetchSettings,
    pipeline,
    transit::Stop,
};

/// What can be found out about a stop from its id
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StopMetadata {
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[allow(async_fn_in_trait)]
pub trait StopMetadataSource {
    async fn stop_metadata(&self, id: i64) -> RtResult<StopMetadata>;
}

/// Names and descriptions from the virtual board, coordinates from OpenStreetMap
pub struct VirtualBoard {
    settings: FetchSettings,
    coordinates: HashMap<i64, OsmStop>,
}

impl VirtualBoard {
    pub fn new(settings: FetchSettings, coordinates: HashMap<i64, OsmStop>) -> Self {
        Self {
            settings,
            coordinates,
        }
    }
}

impl StopMetadataSource for VirtualBoard {
    async fn stop_metadata(&self, id: i64) -> RtResult<StopMetadata> {
        let board = StopBoard::open(&self.settings, id).await?;
        Ok(board_metadata(id, board.name, board.description, self.coordinates.get(&id)))
    }
}

/// Joins what the board says about a stop with what OpenStreetMap knows.
/// OSM names are only used when the board has none.
fn board_metadata(id: i64, name: String, description: String, osm: Option<&OsmStop>) -> StopMetadata {
    let Some(osm) = osm else {
        log::warn!("Stop {:04} ({}) has no coordinates", id, name);
        return StopMetadata {
            name,
            description,
            ..Default::default()
        };
    };

    let name = [name, osm.name.clone(), osm.international_name.clone()]
        .into_iter()
        .find(|n| !n.trim().is_empty())
        .unwrap_or_default();

    StopMetadata {
        name,
        description,
        latitude: osm.latitude,
        longitude: osm.longitude,
    }
}

/// Folds freshly fetched metadata into a stop. A name the stop already has
/// wins over the fetched one; everything else is replaced.
pub fn merge_stop_metadata(stop: &mut Stop, fetched: StopMetadata) {
    match (stop.name.is_empty(), fetched.name.is_empty()) {
        (true, true) => log::warn!("Stop {:04} has no name", stop.id),
        (true, false) => {
            log::info!(
                "Stop {:04} has no name, using the one from the virtual board: {}",
                stop.id,
                fetched.name
            );
            stop.name = fetched.name;
        }
        (false, _) if stop.name != fetched.name => log::warn!(
            "Stop {:04}: preferring [{}] over [{}] from the virtual board",
            stop.id,
            stop.name,
            fetched.name
        ),
        (false, _) => {}
    }

    stop.description = fetched.description;
    stop.latitude = fetched.latitude;
    stop.longitude = fetched.longitude;
}

/// Fetches metadata for every stop, at most `parallelism` at a time, and
/// merges it in place. Fails with the first stop that couldn't be looked up.
pub async fn enrich_stop_metadata<M: StopMetadataSource>(
    source: &M,
    stops: &mut [Stop],
    parallelism: usize,
) -> RtResult<()> {
    log::info!("Fetching metadata for {} stops", stops.len());

    // every job owns exactly one stop
    let jobs: Vec<&mut Stop> = stops.iter_mut().collect();
    pipeline::run(jobs, parallelism, |stop| async move {
        let fetched = source
            .stop_metadata(stop.id)
            .await
            .map_err(|e| Error::Stop {
                id: stop.id,
                source: Box::new(e),
            })?;

        merge_stop_metadata(stop, fetched);
        Ok::<(), Error>(())
    })
    .await?;

    Ok(())
}
