mod backend;
mod config;
mod db;
mod entity;
mod error;
mod maintenance;
mod openstreetmap;
mod page;
mod pipeline;
mod realtime;
mod schedules;
mod transit;

#[cfg(test)]
mod test_utils;

use std::env;

use actix_web::{get, middleware::Logger, web, App, HttpResponse, HttpServer, Responder};
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::Config,
    db::util::open_seaorm,
    error::{SkgtError, SkgtResult},
    realtime::StopBoard,
    schedules::ScheduleType,
    transit::{Line, VehicleKind},
};

#[derive(Parser)]
#[command(version, about = "Sofia public transport schedules and live arrivals")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, PartialEq)]
enum Command {
    /// Scrape all schedules and stops and replace the database contents
    Update,
    /// Serve the API (the default)
    Serve,
    /// Only migrate the database
    Migrate,
}

#[derive(Clone)]
pub struct ContextData {
    db: DatabaseConnection,
    config: Config,
}

#[derive(Deserialize)]
struct ScheduleQuery {
    /// Day type bits: 1 workday, 2 holiday, 4 pre-holiday
    day: Option<i32>,
}

#[derive(Deserialize)]
struct LineQuery {
    vehicle: Option<String>,
    number: Option<String>,
}

#[get("/ok")]
async fn ok() -> SkgtResult<impl Responder> {
    Ok(HttpResponse::Ok().finish())
}

#[get("/info")]
async fn info(ctx: web::Data<ContextData>) -> SkgtResult<impl Responder> {
    let response = web::Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timezone": ctx.config.timezone.name(),
        "realtime": ctx.config.captcha_command.is_some(),
    }));
    Ok(response)
}

#[get("/transport/list")]
async fn get_lines(ctx: web::Data<ContextData>) -> SkgtResult<impl Responder> {
    let lines = backend::get_lines(&ctx.db).await?;
    let response = web::Json(json!({
        "lines": lines,
    }));
    Ok(response)
}

#[get("/transport/{vehicle}/{number}/routes")]
async fn get_line_routes(
    params: web::Path<(String, String)>,
    ctx: web::Data<ContextData>,
) -> SkgtResult<impl Responder> {
    let (vehicle, number) = params.into_inner();
    let line = parse_line(&vehicle, &number)?;

    let routes = backend::get_routes(&ctx.db, &line)
        .await?
        .ok_or_else(|| SkgtError::not_found(format!("no such line: {}", line)))?;

    let response = web::Json(json!({
        "line": line,
        "routes": routes,
    }));
    Ok(response)
}

#[get("/stop/{stop_id}")]
async fn get_stop(
    params: web::Path<(i64,)>,
    ctx: web::Data<ContextData>,
) -> SkgtResult<impl Responder> {
    let (stop_id,) = params.into_inner();

    let stop = backend::get_stop(&ctx.db, stop_id)
        .await?
        .ok_or_else(|| SkgtError::not_found(format!("no such stop: {}", stop_id)))?;
    let lines = backend::get_stop_lines(&ctx.db, stop_id).await?;

    let response = web::Json(json!({
        "stop": stop,
        "lines": lines,
    }));
    Ok(response)
}

#[get("/stop/{stop_id}/arrivals/scheduled")]
async fn get_scheduled_arrivals(
    params: web::Path<(i64,)>,
    query: web::Query<ScheduleQuery>,
    ctx: web::Data<ContextData>,
) -> SkgtResult<impl Responder> {
    let (stop_id,) = params.into_inner();

    // a single kind of day, combinations only exist on courses
    let days = [
        ScheduleType::Workday,
        ScheduleType::Holiday,
        ScheduleType::PreHoliday,
    ];
    let day = match query.day {
        None => ScheduleType::Workday,
        Some(bits) => ScheduleType::from_bits(bits)
            .filter(|day| days.contains(day))
            .ok_or_else(|| SkgtError::Response(400, format!("invalid day type: {}", bits)))?,
    };

    let schedule = backend::get_stop_schedule(&ctx.db, stop_id, day).await?;
    let response = web::Json(json!({
        "day": day,
        "schedule": schedule,
    }));
    Ok(response)
}

#[get("/stop/{stop_id}/arrivals/realtime")]
async fn get_realtime_arrivals(
    params: web::Path<(i64,)>,
    query: web::Query<LineQuery>,
    ctx: web::Data<ContextData>,
) -> SkgtResult<impl Responder> {
    let (stop_id,) = params.into_inner();
    let config = &ctx.config;

    let Some(solver) = &config.captcha_command else {
        return Err(SkgtError::Response(
            503,
            "realtime arrivals are not configured".to_string(),
        ));
    };

    let mut board = StopBoard::open(&config.fetch, stop_id).await?;

    let arrivals = match (&query.vehicle, &query.number) {
        (Some(vehicle), Some(number)) => {
            let line = parse_line(vehicle, number)?;
            let arrivals = board
                .line_arrivals(&line, solver, config.timezone)
                .await?;
            vec![realtime::LineArrivals { line, arrivals }]
        }
        (None, None) => board.all_arrivals(solver, config.timezone).await?,
        _ => {
            return Err(SkgtError::Response(
                400,
                "vehicle and number go together".to_string(),
            ))
        }
    };

    let response = web::Json(json!({
        "stop": {
            "id": board.id,
            "name": board.name,
            "description": board.description,
        },
        "arrivals": arrivals,
    }));
    Ok(response)
}

fn parse_line(vehicle: &str, number: &str) -> SkgtResult<Line> {
    let vehicle = vehicle
        .parse::<VehicleKind>()
        .map_err(|e| SkgtError::not_found(e.to_string()))?;
    Ok(Line::new(vehicle, number))
}

async fn open_db(config: &Config) -> SkgtResult<DatabaseConnection> {
    let db = open_seaorm(&config.database_path).await?;

    log::info!("Migrating database");
    Migrator::up(&db, None)
        .await
        .map_err(db::error::DbError::from)?;

    Ok(db)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::try_init().ok();

    log::debug!("Debug logging enabled");

    dotenvy::from_filename(".env").ok();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(SkgtError::from)?;
    let db = open_db(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => Ok(()),
        Command::Update => {
            maintenance::update(&db, &config).await?;
            Ok(())
        }
        Command::Serve => serve(ContextData { db, config }).await,
    }
}

async fn serve(ctx: ContextData) -> std::io::Result<()> {
    let listen_address = ctx.config.listen_address.clone();

    log::info!("Starting server at {}", listen_address);

    HttpServer::new(move || {
        let logger = Logger::default();

        let mut cors = actix_cors::Cors::default()
            .allowed_methods(vec!["GET"])
            .allowed_headers(vec!["accept"]);

        if let Some(allowed_origin) = &ctx.config.allow_origin {
            if allowed_origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(allowed_origin);
            }
        }

        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(web::Data::new(ctx.clone()))
            .service(ok)
            .service(info)
            .service(get_lines)
            .service(get_line_routes)
            .service(get_stop)
            .service(get_scheduled_arrivals)
            .service(get_realtime_arrivals)
    })
    .bind(listen_address)?
    .run()
    .await?;

    log::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod test {
    use actix_web::{http::StatusCode, test};

    use super::*;
    use crate::schedules::{Route, TimeOfDay, Timetable};

    async fn context() -> (tempfile::TempDir, ContextData) {
        let (dir, db) = test_utils::db().await;

        let stops = vec![transit::Stop::named(1, "Първа"), transit::Stop::named(2, "Втора")];
        let mut route = Route::new("1 - 2", vec![1, 2]);
        route.schedules.insert(
            ScheduleType::All,
            vec![vec![TimeOfDay::new(6, 0), TimeOfDay::new(6, 7)]],
        );
        let timetables = vec![Timetable {
            line: Line::new(VehicleKind::Tram, "10"),
            routes: vec![route],
        }];
        backend::fill(&db, &stops, &timetables).await.unwrap();

        let config = Config::from_lookup(|name| {
            (name == "DATABASE_PATH").then(|| dir.path().join("skgt.db").display().to_string())
        })
        .unwrap();

        (dir, ContextData { db, config })
    }

    #[actix_web::test]
    async fn test_api() {
        let (_dir, ctx) = context().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .service(ok)
                .service(get_lines)
                .service(get_line_routes)
                .service(get_stop)
                .service(get_scheduled_arrivals)
                .service(get_realtime_arrivals),
        )
        .await;

        let request = test::TestRequest::get().uri("/transport/list").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["lines"][0]["vehicle"], "tram");
        assert_eq!(body["lines"][0]["number"], "10");

        let request = test::TestRequest::get()
            .uri("/transport/tram/10/routes")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["routes"][0]["direction"], "1 - 2");
        assert_eq!(body["routes"][0]["stops"][1]["name"], "Втора");

        let request = test::TestRequest::get().uri("/stop/2").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["stop"]["name"], "Втора");
        assert_eq!(body["lines"].as_array().unwrap().len(), 1);

        let request = test::TestRequest::get()
            .uri("/stop/2/arrivals/scheduled?day=2")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["day"], 2);
        assert_eq!(body["schedule"][0]["times"][0], "06:07");

        for (uri, status) in [
            ("/ok", StatusCode::OK),
            ("/stop/3", StatusCode::NOT_FOUND),
            ("/stop/2/arrivals/scheduled?day=7", StatusCode::BAD_REQUEST),
            ("/transport/ferry/1/routes", StatusCode::NOT_FOUND),
            ("/transport/bus/10/routes", StatusCode::NOT_FOUND),
            ("/stop/1/arrivals/realtime", StatusCode::SERVICE_UNAVAILABLE),
        ] {
            let request = test::TestRequest::get().uri(uri).to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), status, "{}", uri);
        }
    }
}
