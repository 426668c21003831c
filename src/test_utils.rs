use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tempfile::TempDir;
use url::Url;

use crate::{
    db::util::open_seaorm,
    page::{self, FormValues, Page, PageResult, PageSource},
};

pub fn init() {
    dotenvy::from_filename(".dev.vars").ok();
    env_logger::try_init().ok();
}

/// A migrated database in a temporary directory, deleted when the dir is dropped
pub async fn db() -> (TempDir, DatabaseConnection) {
    init();

    let dir = tempfile::tempdir().unwrap();
    let db = open_seaorm(&dir.path().join("skgt.db")).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    (dir, db)
}

/// Canned pages by URL. A URL given several responses serves them in order,
/// repeating the last one. Unknown URLs are a 404.
#[derive(Default)]
pub struct FakePages {
    pages: HashMap<String, Vec<String>>,
    served: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<(String, Option<FormValues>)>>,
}

impl FakePages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages
            .entry(url.to_string())
            .or_default()
            .push(body.into());
        self
    }

    /// Every request made so far, with the form that was posted
    pub fn requests(&self) -> Vec<(String, Option<FormValues>)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn serve(&self, url: &Url, form: Option<&FormValues>) -> PageResult<String> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), form.cloned()));

        // let the other workers run, like a real request would
        tokio::task::yield_now().await;

        let Some(bodies) = self.pages.get(url.as_str()) else {
            return Err(page::Error::Status {
                url: url.to_string(),
                status: 404,
            });
        };

        let mut served = self.served.lock().unwrap();
        let count = served.entry(url.to_string()).or_default();
        let body = bodies[(*count).min(bodies.len() - 1)].clone();
        *count += 1;

        Ok(body)
    }
}

impl PageSource for FakePages {
    async fn fetch_page(&self, url: &Url, form: Option<&FormValues>) -> PageResult<Page> {
        let body = self.serve(url, form).await?;
        Ok(Page::parse(&body))
    }

    async fn fetch_bytes(&self, url: &Url) -> PageResult<Vec<u8>> {
        let body = self.serve(url, None).await?;
        Ok(body.into_bytes())
    }
}
