//! Thin Microsoft Graph HTTP client.
//!
//! Responsibilities: bearer auth, OData error decoding, bounded retry with
//! exponential backoff for upstream hiccups (502/503/504) and `Retry-After`
//! handling for throttling. Resource semantics live in
//! [`crate::repository::GraphDirectoryRepository`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use appreg_core::{DirectoryError, DirectoryResult};

use crate::token::TokenProvider;

/// Production Graph endpoint, v1.0 surface.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 250;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    error: ODataError,
}

#[derive(Debug, Deserialize)]
struct ODataError {
    code: String,
    message: String,
}

/// One page of an OData collection response.
#[derive(Debug, Deserialize)]
pub struct ODataPage<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// HTTP client bound to one Graph endpoint and one token source.
pub struct GraphClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
}

impl GraphClient {
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        base_url: impl Into<String>,
    ) -> DirectoryResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            tokens,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The endpoint this client talks to, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a single resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DirectoryResult<T> {
        let response = self.send(Method::GET, self.url(path), None).await?;
        Self::decode_body(response).await
    }

    /// GET a collection, following `@odata.nextLink` until exhausted.
    pub async fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> DirectoryResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path));
        while let Some(url) = next {
            let response = self.send(Method::GET, url, None).await?;
            let page: ODataPage<T> = Self::decode_body(response).await?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    /// POST a body and decode the created resource.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> DirectoryResult<T> {
        let body = Self::to_body(body)?;
        let response = self.send(Method::POST, self.url(path), Some(body)).await?;
        Self::decode_body(response).await
    }

    /// POST a body, expecting no response content.
    pub async fn post_empty<B: Serialize>(&self, path: &str, body: &B) -> DirectoryResult<()> {
        let body = Self::to_body(body)?;
        self.send(Method::POST, self.url(path), Some(body)).await?;
        Ok(())
    }

    /// PATCH a body, expecting no response content.
    pub async fn patch_json<B: Serialize>(&self, path: &str, body: &B) -> DirectoryResult<()> {
        let body = Self::to_body(body)?;
        self.send(Method::PATCH, self.url(path), Some(body)).await?;
        Ok(())
    }

    /// DELETE a resource.
    pub async fn delete(&self, path: &str) -> DirectoryResult<()> {
        self.send(Method::DELETE, self.url(path), None).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn to_body<B: Serialize>(body: &B) -> DirectoryResult<serde_json::Value> {
        serde_json::to_value(body).map_err(|e| DirectoryError::Decode(e.to_string()))
    }

    async fn decode_body<T: DeserializeOwned>(response: Response) -> DirectoryResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| DirectoryError::Decode(e.to_string()))
    }

    #[instrument(skip(self, body), fields(method = %method))]
    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> DirectoryResult<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let token = self.tokens.bearer_token().await?;
            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(token.expose_secret());
            if let Some(body) = &body {
                request = request.json(body);
            }

            let result = request.send().await;
            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    if attempt < MAX_ATTEMPTS {
                        warn!(error = %e, attempt, "request failed, retrying");
                        tokio::time::sleep(Self::backoff(attempt)).await;
                        continue;
                    }
                    return Err(DirectoryError::Transport(e.to_string()));
                }
            };

            let status = response.status();
            if status.is_success() {
                debug!(status = status.as_u16(), "graph request ok");
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = retry_after_secs(&response).unwrap_or(1);
                if attempt < MAX_ATTEMPTS {
                    warn!(retry_after, attempt, "throttled by graph, waiting");
                    tokio::time::sleep(Duration::from_secs(retry_after)).await;
                    continue;
                }
                return Err(DirectoryError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }

            if matches!(
                status,
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
            ) && attempt < MAX_ATTEMPTS
            {
                warn!(status = status.as_u16(), attempt, "upstream error, retrying");
                tokio::time::sleep(Self::backoff(attempt)).await;
                continue;
            }

            return Err(Self::decode_error(status, response).await);
        }
    }

    fn backoff(attempt: u32) -> Duration {
        Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(attempt.saturating_sub(1)))
    }

    async fn decode_error(status: StatusCode, response: Response) -> DirectoryError {
        let body = response.text().await.unwrap_or_default();
        let odata = serde_json::from_str::<ODataErrorBody>(&body)
            .ok()
            .map(|b| b.error);

        let message = odata
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| truncate(&body, 200));

        match status {
            StatusCode::UNAUTHORIZED => DirectoryError::Auth(message),
            StatusCode::FORBIDDEN => DirectoryError::Forbidden(message),
            StatusCode::NOT_FOUND => DirectoryError::NotFound(message),
            _ => match odata {
                Some(e) if e.code == "Authorization_RequestDenied" => {
                    DirectoryError::Forbidden(e.message)
                }
                Some(e)
                    if e.code == "Request_ResourceNotFound" || e.code == "ResourceNotFound" =>
                {
                    DirectoryError::NotFound(e.message)
                }
                Some(e) => DirectoryError::Service {
                    code: e.code,
                    message: e.message,
                },
                None if status.is_server_error() => DirectoryError::Transport(format!(
                    "graph returned {}: {message}",
                    status.as_u16()
                )),
                None => DirectoryError::Service {
                    code: format!("http_{}", status.as_u16()),
                    message,
                },
            },
        }
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    }
}
