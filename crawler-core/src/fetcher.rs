//! The Fetcher (spec.md §4.4).
//!
//! Grounded in the teacher's `crawler/downloader.rs` `SimpleDownloader`
//! (hyper + hyper-rustls client construction, gzip/deflate decoding via
//! `libflate`, chunked body accumulation with a size cap). Diverges from it in
//! one deliberate way: the teacher's downloader surfaces redirects to its
//! caller as `Downloaded::Redirect` and stops there; this Fetcher follows
//! them itself, up to `max_redirects`, because spec.md §4.4 puts redirect
//! following inside `Fetch` itself.

use async_trait::async_trait;
use futures::StreamExt;
use http::StatusCode;
use hyper::body::HttpBody;
use hyper::{client::HttpConnector, Body, Client, Request};
use hyper_rustls::HttpsConnector;
use libflate::deflate::Decoder as DeflateDecoder;
use libflate::gzip::Decoder as GzipDecoder;
use std::io::Read;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

use crate::error::Error;
use crate::robots::RobotsFetch;

/// A cap no spec.md defaults table sets, but one the teacher's downloader
/// applies for the same reason: an adversarial or misconfigured server can
/// otherwise stream forever.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Fetched {
    pub status_code: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Fetched, Error>;
}

pub struct HttpFetcher {
    user_agent: String,
    request_timeout: Duration,
    max_redirects: u8,
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl HttpFetcher {
    pub fn new(user_agent: String, request_timeout_secs: u64, max_redirects: u8) -> HttpFetcher {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder().pool_max_idle_per_host(1).build(https);

        HttpFetcher {
            user_agent,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_redirects,
            client,
        }
    }

    async fn get_once(&self, url: &Url) -> Result<Downloaded, Error> {
        let uri: hyper::Uri = url.as_str().parse().map_err(Error::InvalidUri)?;
        let request = Request::get(uri)
            .header("User-Agent", &self.user_agent)
            .header("Accept-Encoding", "gzip, deflate")
            .body(Body::from(""))
            .expect("well-formed GET request");

        let response = tokio::time::timeout(self.request_timeout, self.client.request(request))
            .await
            .map_err(|_| Error::Timeout)??;

        let status_code = response.status();
        let headers = response.headers();

        if status_code.is_redirection() {
            let location = headers
                .get(http::header::LOCATION)
                .ok_or(Error::NoLocationOnRedirect)?;
            let location = String::from_utf8_lossy(location.as_bytes()).into_owned();
            return Ok(Downloaded::Redirect(location));
        }

        let content_type = headers
            .get(http::header::CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let encoding = headers
            .get(http::header::CONTENT_ENCODING)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_else(|| "identity".to_owned());

        let mut body = response.into_body();
        let mut stream = futures::stream::poll_fn(move |ctx| Pin::new(&mut body).poll_data(ctx));
        let mut content = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Error::Http)?;
            if content.len() + chunk.len() > MAX_BODY_BYTES {
                let remaining = MAX_BODY_BYTES - content.len();
                content.extend(&chunk[..remaining]);
                break;
            }
            content.extend(chunk);
        }

        let content = match encoding.as_str() {
            "identity" => content,
            "gzip" => {
                let mut decoded = Vec::new();
                GzipDecoder::new(&content[..])?.read_to_end(&mut decoded)?;
                decoded
            }
            "deflate" => {
                let mut decoded = Vec::new();
                DeflateDecoder::new(&content[..]).read_to_end(&mut decoded)?;
                decoded
            }
            other => return Err(Error::UnknownContentEncoding(other.to_owned())),
        };

        Ok(Downloaded::Page(Fetched {
            status_code,
            content_type,
            body: content,
        }))
    }

    fn is_retryable(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    }
}

enum Downloaded {
    Page(Fetched),
    Redirect(String),
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Fetched, Error> {
        let mut current = url.clone();

        for _ in 0..=self.max_redirects {
            let mut backoff = Duration::from_millis(500);
            let mut attempt = 0;

            loop {
                match self.get_once(&current).await {
                    Ok(Downloaded::Page(fetched)) if Self::is_retryable(fetched.status_code) => {
                        if attempt >= 2 {
                            return Ok(fetched);
                        }
                        attempt += 1;
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                        continue;
                    }
                    Ok(Downloaded::Page(fetched)) => return Ok(fetched),
                    Ok(Downloaded::Redirect(location)) => {
                        current = current.join(&location)?;
                        break;
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Err(Error::TooManyRedirects)
    }
}

#[async_trait]
impl RobotsFetch for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Option<String> {
        let fetched = self.fetch(url).await.ok()?;
        if !fetched.status_code.is_success() {
            return None;
        }
        Some(String::from_utf8_lossy(&fetched.body).into_owned())
    }
}

/// The Worker Pipeline needs both faces of the HTTP client — `Fetcher` for
/// pages, `RobotsFetch` for robots.txt — on the same trait object. Anything
/// implementing both gets this for free.
pub trait FetchClient: Fetcher + RobotsFetch {}
impl<T: Fetcher + RobotsFetch> FetchClient for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_match_spec() {
        assert!(HttpFetcher::is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(HttpFetcher::is_retryable(StatusCode::BAD_GATEWAY));
        assert!(HttpFetcher::is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(HttpFetcher::is_retryable(StatusCode::GATEWAY_TIMEOUT));
        assert!(!HttpFetcher::is_retryable(StatusCode::NOT_FOUND));
        assert!(!HttpFetcher::is_retryable(StatusCode::FORBIDDEN));
    }
}
