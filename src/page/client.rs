use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use super::{error::PageResult, Error, FormValues, Page, PageSource};

/// How pages are fetched. Timeouts are enforced here, not by the callers.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("skgt-api/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Clone)]
pub struct PageClient {
    client: reqwest::Client,
}

impl PageClient {
    pub fn new(settings: &FetchSettings) -> PageResult<PageClient> {
        Self::build(settings, false)
    }

    /// A client which keeps cookies between requests, for sites with sessions
    pub fn with_cookies(settings: &FetchSettings) -> PageResult<PageClient> {
        Self::build(settings, true)
    }

    fn build(settings: &FetchSettings, cookies: bool) -> PageResult<PageClient> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .cookie_store(cookies)
            .build()?;

        Ok(PageClient { client })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> PageResult<reqwest::Response> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// Posts a raw body and deserializes the JSON response
    pub async fn post_json<T>(&self, url: &Url, body: String) -> PageResult<T>
    where
        T: DeserializeOwned,
    {
        log::debug!("Posting to {}", url);
        let response = self.send(self.client.post(url.clone()).body(body)).await?;

        let data_str = response.text().await?;
        log::trace!("Response: {}", data_str);
        let data = serde_json::from_str(&data_str)?;

        Ok(data)
    }
}

impl PageSource for PageClient {
    async fn fetch_page(&self, url: &Url, form: Option<&FormValues>) -> PageResult<Page> {
        let request = match form {
            Some(form) => {
                log::debug!("Posting form to {}", url);
                self.client.post(url.clone()).form(form)
            }
            None => {
                log::debug!("Requesting {}", url);
                self.client.get(url.clone())
            }
        };

        let body = self.send(request).await?.text().await?;
        log::trace!("Response: {}", body);

        Ok(Page::parse(&body))
    }

    async fn fetch_bytes(&self, url: &Url) -> PageResult<Vec<u8>> {
        log::debug!("Requesting {}", url);
        let response = self.send(self.client.get(url.clone())).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
