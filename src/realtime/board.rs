use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;
use rand::Rng;
use scraper::ElementRef;
use serde::Serialize;
use url::Url;

use super::{parse_arrival_time, CaptchaSolver, Error, RtResult};
use crate::{
    page::{self, FetchSettings, FormValues, Page, PageClient, PageSource},
    transit::Line,
};

pub const BOARD_URL: &str = "https://skgt-bg.com/VirtualBoard/Web/SelectByStop.aspx";
pub const CAPTCHA_URL: &str = "https://skgt-bg.com/VirtualBoard/Services/Captcha.ashx";

const FIELD_STOP_CODE: &str = "ctl00$ContentPlaceHolder1$tbStopCode";
const FIELD_SEARCH_X: &str = "ctl00$ContentPlaceHolder1$btnSearchLine.x";
const FIELD_SEARCH_Y: &str = "ctl00$ContentPlaceHolder1$btnSearchLine.y";
const FIELD_LINE: &str = "ctl00$ContentPlaceHolder1$ddlLine";
const FIELD_CAPTCHA: &str = "ctl00$ContentPlaceHolder1$CaptchaInput";

/// A live estimate of a vehicle reaching a stop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arrival {
    pub scheduled_at: DateTime<Tz>,
    /// When the estimate was made
    pub estimated_as_of: DateTime<Tz>,
    pub has_accessibility: bool,
    pub has_air_conditioning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineArrivals {
    pub line: Line,
    pub arrivals: Vec<Arrival>,
}

/// A stop looked up on the virtual board. Holds the session and form state
/// needed for the follow-up arrival queries.
pub struct StopBoard<S: PageSource = PageClient> {
    source: S,
    form: FormValues,
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Lines serving the stop, with the board's id for each
    pub lines: BTreeMap<Line, i64>,
}

impl StopBoard<PageClient> {
    /// Looks a stop up in a fresh session
    pub async fn open(settings: &FetchSettings, id: i64) -> RtResult<Self> {
        let client = PageClient::with_cookies(settings)?;
        Self::lookup(client, id).await
    }
}

impl<S: PageSource> StopBoard<S> {
    /// Searches for a stop by id. `source` has to keep cookies, the board
    /// tracks the search in the session.
    pub async fn lookup(source: S, id: i64) -> RtResult<Self> {
        let url = board_url()?;

        let search_page = source.fetch_page(&url, None).await?;
        let mut form = form_values(&search_page)?;
        form.insert(FIELD_STOP_CODE.to_string(), format!("{:04}", id));
        {
            // the search button is an image, browsers post where it was clicked
            let mut rng = rand::thread_rng();
            form.insert(FIELD_SEARCH_X.to_string(), rng.gen_range(0..53).to_string());
            form.insert(FIELD_SEARCH_Y.to_string(), rng.gen_range(0..16).to_string());
        }

        let page = source.fetch_page(&url, Some(&form)).await?;

        let name = page::text(page.first(r#"span[id*="lblStopName"]"#)?)
            .trim()
            .to_string();
        let description = page::text(page.first(r#"span[id*="lblDescription"]"#)?)
            .trim_matches(|c| "\r\n\t \";".contains(c))
            .to_string();

        let form = form_values(&page)?;
        let lines = parse_lines(&page)?;
        log::debug!("Stop {:04} ({}) is served by {} lines", id, name, lines.len());

        Ok(Self {
            source,
            form,
            id,
            name,
            description,
            lines,
        })
    }

    /// Fetches a fresh captcha for this session and has it solved
    pub async fn solve_captcha<C: CaptchaSolver>(&self, solver: &C) -> RtResult<String> {
        let image = self.source.fetch_bytes(&Url::parse(CAPTCHA_URL)?).await?;
        solver.solve(&image).await
    }

    /// Arrivals of the line with board id `line_id`, given the answer to the
    /// session's current captcha
    pub async fn arrivals(&mut self, line_id: i64, captcha: &str, tz: Tz) -> RtResult<Vec<Arrival>> {
        self.form.insert(FIELD_LINE.to_string(), line_id.to_string());
        self.form.insert(FIELD_CAPTCHA.to_string(), captcha.to_string());

        let page = self.source.fetch_page(&board_url()?, Some(&self.form)).await?;
        self.form = form_values(&page)?;

        let rows = page.select(r#"table[id*="gvTimes"] tr:not([class*="Header"])"#)?;
        let arrivals = rows
            .into_iter()
            .filter(|row| !is_header(*row))
            .map(|row| parse_arrival(row, tz))
            .collect::<RtResult<Vec<_>>>()?;

        log::debug!("{} arrivals for line {} at {:04}", arrivals.len(), line_id, self.id);
        Ok(arrivals)
    }

    /// Arrivals of one line at this stop
    pub async fn line_arrivals<C: CaptchaSolver>(
        &mut self,
        line: &Line,
        solver: &C,
        tz: Tz,
    ) -> RtResult<Vec<Arrival>> {
        let line_id = *self
            .lines
            .get(line)
            .ok_or_else(|| Error::NotFound(format!("{} doesn't stop at {:04}", line, self.id)))?;

        let captcha = self.solve_captcha(solver).await?;
        self.arrivals(line_id, &captcha, tz).await
    }

    /// Arrivals of every line at this stop, one captcha per line
    pub async fn all_arrivals<C: CaptchaSolver>(
        &mut self,
        solver: &C,
        tz: Tz,
    ) -> RtResult<Vec<LineArrivals>> {
        let lines = self.lines.clone();

        let mut all = Vec::with_capacity(lines.len());
        for (line, line_id) in lines {
            let captcha = self.solve_captcha(solver).await?;
            let arrivals = self.arrivals(line_id, &captcha, tz).await?;
            all.push(LineArrivals { line, arrivals });
        }

        Ok(all)
    }
}

fn board_url() -> RtResult<Url> {
    Ok(Url::parse(BOARD_URL)?)
}

/// Header rows are sometimes `th` only rows without a class
fn is_header(row: ElementRef<'_>) -> bool {
    row.children()
        .filter_map(ElementRef::wrap)
        .all(|cell| cell.value().name() == "th")
}

/// Every named input of the page's form, so it can be posted back
fn form_values(page: &Page) -> RtResult<FormValues> {
    let inputs = page.select("input")?;

    let values = inputs
        .into_iter()
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    Ok(values)
}

fn parse_lines(page: &Page) -> RtResult<BTreeMap<Line, i64>> {
    let mut lines = BTreeMap::new();

    for option in page.select("select option[value]")? {
        let value = page::attr(option, "value")?.trim();
        if value.is_empty() {
            continue;
        }

        let id = value
            .parse::<i64>()
            .map_err(|_| Error::InvalidData(format!("line option value [{}]", value)))?;
        let line = Line::parse_label(&page::text(option))?;

        lines.insert(line, id);
    }

    Ok(lines)
}

fn parse_arrival(row: ElementRef<'_>, tz: Tz) -> RtResult<Arrival> {
    let has_accessibility = !page::select(row, r#"img[id*="imgPlatform"]"#)?.is_empty();
    let has_air_conditioning = !page::select(row, r#"img[id*="imgAirCondition"]"#)?.is_empty();

    let time = page::text(page::first(row, r#"div[id*="dvItem"]"#)?);
    let (scheduled_at, estimated_as_of) = parse_arrival_time(&time, tz)?;

    Ok(Arrival {
        scheduled_at,
        estimated_as_of,
        has_accessibility,
        has_air_conditioning,
    })
}
