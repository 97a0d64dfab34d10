use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use tracing::trace;
use url::Url;

use super::endpoint::{HttpMethod, HttpRequest};
use crate::cache::QueryError;
use crate::config::Config;
use crate::error::{PunchlineError, Result};

const USER_AGENT: &str = concat!("punchline/", env!("CARGO_PKG_VERSION"));

/// Sends one HTTP request and returns the body of a 2xx response
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<String, QueryError>;
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Listings API client
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config.require_base_url()?;
        Self::with_base_url(base_url, config.api.timeout())
    }

    /// Create a client for an explicit base URL
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            PunchlineError::Config(format!("Invalid API URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PunchlineError::Config(format!(
                "Invalid API URL '{base_url}': not a base URL"
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, request: &HttpRequest) -> std::result::Result<Url, QueryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QueryError::Request(format!("cannot join path onto {}", self.base_url)))?
            .pop_if_empty()
            .extend(&request.segments);

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

fn transport_error(error: reqwest::Error) -> QueryError {
    if error.is_timeout() {
        QueryError::Transport(format!("request timed out: {error}"))
    } else {
        QueryError::Transport(error.to_string())
    }
}

#[async_trait(?Send)]
impl Transport for ApiClient {
    async fn send(&self, request: HttpRequest) -> std::result::Result<String, QueryError> {
        let url = self.url_for(&request)?;
        trace!(method = %request.method, %url, "http request");

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::http(status.as_u16(), body));
        }

        response.text().await.map_err(transport_error)
    }
}
