use backoff::{backoff::Backoff, ExponentialBackoff};
use log::info;
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::time::sleep;

static USER_AGENT: &str = "flakemeter";
static GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

pub type Result<T> = std::result::Result<T, Error>;

/// A single page of a paginated listing along with the URL of the page after it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: T,
    pub next: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    token: String,
}

impl ApiClient {
    pub fn from_token<T: Into<String>>(token: T) -> Result<Self> {
        let client = ClientBuilder::new().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    pub async fn get<O>(&self, endpoint: &str) -> Result<O>
    where
        O: DeserializeOwned,
    {
        let page = self.get_page(endpoint).await?;
        Ok(page.items)
    }

    /// Fetches a JSON document and the `rel="next"` link advertised in its headers.
    pub async fn get_page<O>(&self, endpoint: &str) -> Result<Page<O>>
    where
        O: DeserializeOwned,
    {
        retry_request_if_needed(move || async move {
            let response = self.submit(self.client.get(endpoint)).await?;
            let next = next_page_link(response.headers());
            let items = response.json().await?;
            Ok(Page { items, next })
        })
        .await
    }

    /// Downloads a raw body, following redirects.
    pub async fn download(&self, endpoint: &str) -> Result<Vec<u8>> {
        retry_request_if_needed(move || async move {
            let response = self.submit(self.client.get(endpoint)).await?;
            Ok(response.bytes().await?.to_vec())
        })
        .await
    }

    async fn submit(&self, builder: RequestBuilder) -> Result<Response> {
        let builder = builder
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_MEDIA_TYPE);
        let response = builder.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Error::Http(response.status()))
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("rate limited max attempts reached")]
    RateLimitRetries,

    #[error("request failed with status code {0}")]
    Http(StatusCode),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

impl Error {
    pub fn too_many_requests(&self) -> bool {
        matches!(self, Self::Http(StatusCode::TOO_MANY_REQUESTS))
    }
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\s*<([^>]+)>\s*;\s*rel="([^"]+)"\s*$"#).expect("link pattern is valid")
    })
}

/// Extracts the `next` relation out of an RFC 8288 `Link` header.
pub(crate) fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let captures = link_pattern().captures(entry)?;
        if captures[2].split_whitespace().any(|rel| rel == "next") {
            Some(captures[1].to_string())
        } else {
            None
        }
    })
}

fn next_page_link(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(LINK)?.to_str().ok()?;
    parse_next_link(header)
}

async fn retry_request_if_needed<F, R, O>(requestor: F) -> Result<O>
where
    F: Fn() -> R,
    R: Future<Output = Result<O>>,
{
    let mut backoff = ExponentialBackoff::default();
    loop {
        match requestor().await {
            Err(e) if e.too_many_requests() => {
                let delay = backoff.next_backoff();
                match delay {
                    Some(delay) => {
                        info!("Rate limit hit, sleeping for {}s", delay.as_secs());
                        sleep(delay).await
                    }
                    None => return Err(Error::RateLimitRetries),
                }
            }
            other => return other,
        }
    }
}
