use thiserror::Error;

/// Errors surfaced across process boundaries and from pure helpers.
///
/// Errors that occur *inside* a single fetch/parse pipeline never reach this
/// type: they are captured as a [`crate::model::Status`] on the
/// [`crate::model::CrawlResult`] instead. This is reserved for setup and
/// store-level failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] hyper::Error),
    #[error("invalid uri: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),
    #[error("url parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no location header on redirect")]
    NoLocationOnRedirect,
    #[error("unknown Content-Encoding: {0}")]
    UnknownContentEncoding(String),
    #[error("timed out")]
    Timeout,
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("{0}")]
    Custom(String),
}

impl From<String> for Error {
    fn from(this: String) -> Error {
        Error::Custom(this)
    }
}

impl From<&str> for Error {
    fn from(this: &str) -> Error {
        Error::Custom(this.to_owned())
    }
}
