#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} responded with {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid selector {0}")]
    Selector(String),

    #[error("Nothing matches {0}")]
    NotFound(String),

    #[error("Element has no {0} attribute")]
    MissingAttribute(String),

    #[error("Deserialize error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

pub type PageResult<T> = Result<T, Error>;
