use std::collections::BTreeMap;

use tokio::sync::mpsc;

use super::{all_lines, get_timetable, Error, ScheduleResult, Timetable};
use crate::{
    page::PageSource,
    pipeline,
    transit::{Line, Stop, StopName},
};

/// Scrapes the timetable of every line on the schedules site. The stops only
/// have an id and a name, the rest has to come from elsewhere.
pub async fn acquire_all_timetables<S: PageSource>(
    source: &S,
    parallelism: usize,
) -> ScheduleResult<(Vec<Timetable>, Vec<Stop>)> {
    let lines = all_lines(source).await?;
    timetables_for_lines(source, lines, parallelism).await
}

/// Scrapes the timetables of `lines`, at most `parallelism` at a time. Fails
/// with the first line that couldn't be scraped.
pub async fn timetables_for_lines<S: PageSource>(
    source: &S,
    lines: Vec<Line>,
    parallelism: usize,
) -> ScheduleResult<(Vec<Timetable>, Vec<Stop>)> {
    let line_count = lines.len();
    let (tx, mut rx) = mpsc::unbounded_channel::<StopName>();

    let scrape = async move {
        let tx = &tx;
        pipeline::run(lines, parallelism, |line| async move {
            get_timetable(source, &line, tx)
                .await
                .map_err(|e| Error::Timetable {
                    line,
                    source: Box::new(e),
                })
        })
        .await
        // tx is dropped here, which ends the collection below
    };

    let collect = async move {
        let mut names = BTreeMap::new();
        while let Some(StopName { id, name }) = rx.recv().await {
            // a stop is listed by every line passing through it, the last listing wins
            names.insert(id, name);
        }
        names
    };

    let (timetables, names) = tokio::join!(scrape, collect);
    let timetables = timetables?;

    let stops = names
        .into_iter()
        .map(|(id, name)| Stop::named(id, name))
        .collect::<Vec<_>>();

    log::info!(
        "Scraped {} of {} timetables, {} stops",
        timetables.len(),
        line_count,
        stops.len()
    );

    Ok((timetables, stops))
}
