use itertools::Itertools;
use percent_encoding::percent_decode_str;
use url::Url;

use super::{timetable::vehicle_path, Error, ScheduleResult, SCHEDULES_URL};
use crate::{
    page::{self, PageSource},
    transit::{self, Line, VehicleKind},
};

const LINE_LINKS: &str =
    r#"div[class*="lines_section"] > ul > li > a, a[class*="quicksearch"]:not([href*="./"])"#;

/// Lists every line linked from the schedules site's index page
pub async fn all_lines<S: PageSource>(source: &S) -> ScheduleResult<Vec<Line>> {
    let url = Url::parse(SCHEDULES_URL)?;
    let page = source.fetch_page(&url, None).await?;

    let lines = page
        .select(LINE_LINKS)?
        .into_iter()
        .map(|link| parse_line_link(page::attr(link, "href")?))
        .collect::<ScheduleResult<Vec<_>>>()?;

    // the same line is usually linked from both the menu and the quick search
    let lines = lines.into_iter().unique().collect_vec();
    log::info!("Found {} lines", lines.len());

    Ok(lines)
}

/// Parses a link such as "autobus/18" or "https://schedules.sofiatraffic.bg/tramway/10"
pub fn parse_line_link(href: &str) -> ScheduleResult<Line> {
    let invalid = || Error::InvalidLineLink(href.to_string());

    let url = Url::parse(SCHEDULES_URL)?.join(href)?;
    let segments = url
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8().map(|s| s.into_owned()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    let [vehicle, number] = segments.as_slice() else {
        return Err(invalid());
    };

    let vehicle = VehicleKind::ALL
        .into_iter()
        .find(|kind| vehicle_path(*kind) == vehicle.as_str())
        .ok_or_else(|| transit::Error::UnknownVehicle(vehicle.clone()))?;

    Ok(Line::new(vehicle, number.clone()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::FakePages;

    #[test]
    fn test_parse_line_link() {
        assert_eq!(
            parse_line_link("autobus/18").unwrap(),
            Line::new(VehicleKind::Bus, "18")
        );
        assert_eq!(
            parse_line_link("https://schedules.sofiatraffic.bg/tramway/10").unwrap(),
            Line::new(VehicleKind::Tram, "10")
        );
        assert_eq!(
            parse_line_link("/trolleybus/%D0%9C1").unwrap(),
            Line::new(VehicleKind::Trolley, "М1")
        );
        assert_eq!(
            parse_line_link("metro/M2").unwrap(),
            Line::new(VehicleKind::Subway, "M2")
        );

        assert!(matches!(
            parse_line_link("ferry/1"),
            Err(Error::Line(transit::Error::UnknownVehicle(_)))
        ));
        assert!(matches!(parse_line_link("autobus"), Err(Error::InvalidLineLink(_))));
        assert!(matches!(
            parse_line_link("autobus/18/extra"),
            Err(Error::InvalidLineLink(_))
        ));
    }

    #[tokio::test]
    async fn test_all_lines() {
        let index = r#"<html><body>
            <div class="lines_section tram"><ul>
                <li><a href="tramway/10">10</a></li>
                <li><a href="tramway/12">12</a></li>
            </ul></div>
            <div class="lines_section bus"><ul>
                <li><a href="autobus/94">94</a></li>
            </ul></div>
            <a class="quicksearch" href="tramway/10">10</a>
            <a class="quicksearch" href="metro/M1">M1</a>
            <a class="quicksearch" href="./tramway">all trams</a>
        </body></html>"#;
        let pages = FakePages::new().with_page(SCHEDULES_URL, index);

        let lines = all_lines(&pages).await.unwrap();

        assert_eq!(
            lines.into_iter().sorted().collect_vec(),
            vec![
                Line::new(VehicleKind::Bus, "94"),
                Line::new(VehicleKind::Tram, "10"),
                Line::new(VehicleKind::Tram, "12"),
                Line::new(VehicleKind::Subway, "M1"),
            ]
        );
    }

    #[tokio::test]
    async fn test_all_lines_bad_link() {
        let index = r#"<div class="lines_section"><ul><li><a href="boat/1">1</a></li></ul></div>"#;
        let pages = FakePages::new().with_page(SCHEDULES_URL, index);

        assert!(all_lines(&pages).await.is_err());
    }
}
