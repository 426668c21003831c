use actix_web::{HttpResponse, ResponseError};
use reqwest::StatusCode;
use serde_json::json;

use crate::{config, db::error::DbError, page, realtime, schedules};

#[derive(thiserror::Error, Debug)]
pub enum SkgtError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Schedules error: {0}")]
    Schedules(#[from] schedules::Error),

    #[error("Virtual board error: {0}")]
    Realtime(#[from] realtime::Error),

    #[error("Page error: {0}")]
    Page(#[from] page::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),

    #[error("Error response: {0} {1}")]
    Response(u16, String),
}

impl SkgtError {
    pub fn not_found(message: impl Into<String>) -> Self {
        SkgtError::Response(404, message.into())
    }
}

impl ResponseError for SkgtError {
    fn error_response(&self) -> actix_web::HttpResponse<actix_web::body::BoxBody> {
        match self {
            SkgtError::Response(_, message) => {
                HttpResponse::build(self.status_code()).json(json!({ "error": message }))
            }
            other => {
                log::error!("{}", other);
                actix_web::HttpResponse::InternalServerError().finish()
            }
        }
    }

    fn status_code(&self) -> reqwest::StatusCode {
        match self {
            SkgtError::Response(status, _) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SkgtError> for std::io::Error {
    fn from(e: SkgtError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::Other, e)
    }
}

pub type SkgtResult<T> = Result<T, SkgtError>;
