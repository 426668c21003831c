use scraper::ElementRef;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use super::{
    parse::{parse_course, parse_schedule_type},
    Course, Error, Route, ScheduleResult, Timetable, SCHEDULES_URL,
};
use crate::{
    page::{self, Page, PageSource},
    transit::{Line, StopName, VehicleKind},
};

/// Path segment the schedules site uses for each kind of vehicle
pub(super) fn vehicle_path(vehicle: VehicleKind) -> &'static str {
    match vehicle {
        VehicleKind::Bus => "autobus",
        VehicleKind::Tram => "tramway",
        VehicleKind::Trolley => "trolleybus",
        VehicleKind::Subway => "metro",
    }
}

pub fn schedule_url(line: &Line) -> ScheduleResult<Url> {
    let mut url = Url::parse(SCHEDULES_URL)?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidLineLink(SCHEDULES_URL.to_string()))?
        .pop_if_empty()
        .push(vehicle_path(line.vehicle))
        .push(&line.number);
    Ok(url)
}

/// Fetches the timetable of one line. Every stop listed on the page is sent to
/// `stop_names`, duplicates included.
pub async fn get_timetable<S: PageSource>(
    source: &S,
    line: &Line,
    stop_names: &UnboundedSender<StopName>,
) -> ScheduleResult<Timetable> {
    let url = schedule_url(line)?;
    let page = source.fetch_page(&url, None).await?;

    let (timetable, names) = parse_timetable(line, &page)?;
    log::debug!(
        "{}: {} routes, {} stop listings",
        line,
        timetable.routes.len(),
        names.len()
    );

    for name in names {
        // only fails once the receiver is gone, and then nobody wants the names
        let _ = stop_names.send(name);
    }

    Ok(timetable)
}

/// One direction block from one day type section
struct DirectionBlock {
    direction: String,
    stops: Vec<i64>,
    courses: Vec<Course>,
}

pub fn parse_timetable(line: &Line, page: &Page) -> ScheduleResult<(Timetable, Vec<StopName>)> {
    let mut routes: Vec<Route> = Vec::new();
    let mut names = Vec::new();

    for section in page.select(r#"div[class*="schedule_active_list_content"]"#)? {
        let label = page::text(page::first(section, "h3")?);
        let schedule_type = parse_schedule_type(&label)?;

        for block in page::select(section, r#"div[class*="schedule_view_direction_content"]"#)? {
            let block = parse_direction(block, &mut names)?;

            let index = match routes.iter().position(|r| r.direction == block.direction) {
                Some(index) => index,
                None => {
                    routes.push(Route::new(block.direction.clone(), block.stops.clone()));
                    routes.len() - 1
                }
            };
            let route = &mut routes[index];

            if route.stops != block.stops {
                return Err(Error::InconsistentStops {
                    line: line.clone(),
                    direction: block.direction,
                    first: route.stops.clone(),
                    second: block.stops,
                });
            }

            route.schedules.insert(schedule_type, block.courses);
        }
    }

    let timetable = Timetable {
        line: line.clone(),
        routes,
    };

    Ok((timetable, names))
}

fn parse_direction(block: ElementRef<'_>, names: &mut Vec<StopName>) -> ScheduleResult<DirectionBlock> {
    let direction = page::text(page::first(block, "h6")?).trim().to_string();

    let mut stops = Vec::new();
    for item in page::select(block, r#"ul[class*="schedule_direction_signs"] > li"#)? {
        let stop = parse_stop(item)?;
        stops.push(stop.id);
        names.push(stop);
    }

    let courses = page::select(block, r#"div[class*="hours_cell"] > a"#)?
        .into_iter()
        .map(|cell| parse_course(page::attr(cell, "onclick")?, stops.len()))
        .collect::<ScheduleResult<Vec<_>>>()?;

    Ok(DirectionBlock {
        direction,
        stops,
        courses,
    })
}

fn parse_stop(item: ElementRef<'_>) -> ScheduleResult<StopName> {
    let id_text = page::text(page::first(item, r#"a[class*="stop_link"]"#)?);
    let id = id_text
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::InvalidStopId(id_text.trim().to_string()))?;

    let name = page::text(page::first(item, r#"a[class*="stop_change"]"#)?)
        .trim()
        .to_string();

    Ok(StopName { id, name })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::schedules::{ScheduleType, TimeOfDay};

    fn stop_item(id: i64, name: &str) -> String {
        format!(
            r##"<li><a class="stop_link" href="#">{:04}</a> <a class="stop_change" href="#"> {} </a></li>"##,
            id, name
        )
    }

    fn course_cell(times: &str) -> String {
        format!(
            r#"<div class="hours_cell"><a onclick="Raz.exec ('show_course', ['9caca5ad9', '{}']); return false;">x</a></div>"#,
            times
        )
    }

    fn direction(name: &str, stops: &[(i64, &str)], courses: &[&str]) -> String {
        let stops: String = stops.iter().map(|(id, n)| stop_item(*id, n)).collect();
        let courses: String = courses.iter().map(|c| course_cell(c)).collect();
        format!(
            r#"<div class="schedule_view_direction_content"><h6> {} </h6>
            <ul class="schedule_direction_signs">{}</ul>{}</div>"#,
            name, stops, courses
        )
    }

    fn section(day_type: &str, directions: &[String]) -> String {
        format!(
            r#"<div class="schedule_active_list_content active"><h3>{}</h3>{}</div>"#,
            day_type,
            directions.concat()
        )
    }

    /// A schedule page in the shape the schedules site serves
    pub(crate) fn schedule_page(sections: &[String]) -> String {
        format!("<html><body>{}</body></html>", sections.concat())
    }

    /// A two stop, one direction schedule page unique to `seed`
    pub(crate) fn simple_page(seed: i64) -> String {
        schedule_page(&[section(
            "делник - валидно от 01.01.2024",
            &[direction(
                "A - B",
                &[(seed, "Начало"), (seed + 1, "Край")],
                &["1,300,305"],
            )],
        )])
    }

    #[test]
    fn test_schedule_url() {
        let url = schedule_url(&Line::new(VehicleKind::Tram, "10")).unwrap();
        assert_eq!(url.as_str(), "https://schedules.sofiatraffic.bg/tramway/10");

        let url = schedule_url(&Line::new(VehicleKind::Bus, "4 ТМ")).unwrap();
        assert!(url.as_str().starts_with("https://schedules.sofiatraffic.bg/autobus/4%20"));
    }

    #[test]
    fn test_parse_timetable() {
        let stops = [(1, "Първа"), (2, "Втора"), (3, "Трета")];
        let html = schedule_page(&[
            section(
                "делник - валидно от 01.01.2024",
                &[
                    direction("A - C", &stops, &["4,300,305,310", "5,360,,370"]),
                    direction("C - A", &[(3, "Трета"), (1, "Първа")], &["6,400,410"]),
                ],
            ),
            section(
                "предпразник, празник",
                &[direction("A - C", &stops, &["7,500,505,510"])],
            ),
        ]);
        let line = Line::new(VehicleKind::Tram, "10");

        let (timetable, names) = parse_timetable(&line, &Page::parse(&html)).unwrap();

        assert_eq!(timetable.line, line);
        assert_eq!(timetable.routes.len(), 2);
        // every listing, including the repeats across directions and day types
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], StopName { id: 1, name: "Първа".to_string() });
        assert_eq!(names.iter().filter(|n| n.id == 1).count(), 3);
        assert_eq!(names.iter().filter(|n| n.id == 2).count(), 2);
        assert_eq!(names[5], StopName { id: 1, name: "Първа".to_string() });

        let forward = &timetable.routes[0];
        assert_eq!(forward.direction, "A - C");
        assert_eq!(forward.stops, vec![1, 2, 3]);
        assert_eq!(forward.schedules.len(), 2);
        assert_eq!(
            forward.schedules[&ScheduleType::Workday][1],
            vec![
                TimeOfDay::from_minutes(360),
                None,
                TimeOfDay::from_minutes(370)
            ]
        );
        assert_eq!(
            forward.schedules[&ScheduleType::HolidayAndPreHoliday].len(),
            1
        );
        assert!(forward.check_courses().is_ok());

        let backward = &timetable.routes[1];
        assert_eq!(backward.stops, vec![3, 1]);
        assert_eq!(backward.schedules[&ScheduleType::Workday].len(), 1);
    }

    #[test]
    fn test_inconsistent_stops() {
        let html = schedule_page(&[
            section("делник", &[direction("A - B", &[(1, "A"), (2, "B")], &[])]),
            section("празник", &[direction("A - B", &[(1, "A"), (3, "C")], &[])]),
        ]);
        let line = Line::new(VehicleKind::Bus, "94");

        let result = parse_timetable(&line, &Page::parse(&html));
        assert!(matches!(
            result,
            Err(Error::InconsistentStops { line: l, .. }) if l == line
        ));
    }

    #[test]
    fn test_bad_pages() {
        let line = Line::new(VehicleKind::Bus, "94");

        let html = schedule_page(&[section("неделя", &[])]);
        assert!(matches!(
            parse_timetable(&line, &Page::parse(&html)),
            Err(Error::UnknownScheduleType(_))
        ));

        let html = schedule_page(&[section(
            "делник",
            &[direction("A - B", &[(1, "A"), (2, "B")], &["1,300"])],
        )]);
        assert!(matches!(
            parse_timetable(&line, &Page::parse(&html)),
            Err(Error::StopCountMismatch { expected: 2, actual: 1 })
        ));

        // no sections at all is an empty timetable, not an error
        let (timetable, names) = parse_timetable(&line, &Page::parse("<html></html>")).unwrap();
        assert!(timetable.routes.is_empty());
        assert!(names.is_empty());
    }
}
