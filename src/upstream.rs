//! Hyper-backed implementations of the request primitives

use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::intercept::{
    FetchPrimitive, FetchRequest, FetchResponse, XhrFactory, XhrOutcome, XhrPrimitive,
    XhrResponseType,
};
use crate::{ReqscopeError, Result};

/// Shared pooled HTTP client
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl UpstreamClient {
    /// Create a client with connection pooling
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build_http();

        Self { client }
    }

    /// Execute one exchange and collect the full response
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a malformed URL, method or header, and
    /// `Transport` when the exchange itself fails.
    async fn execute(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<Bytes>,
    ) -> Result<FetchResponse> {
        let uri = url
            .parse::<Uri>()
            .map_err(|e| ReqscopeError::InvalidRequest(format!("Invalid URL '{url}': {e}")))?;

        debug!("Dispatching {method} to {uri}");

        let method = method
            .parse::<Method>()
            .map_err(|e| ReqscopeError::InvalidRequest(format!("Invalid HTTP method: {e}")))?;

        let mut request_builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            request_builder = request_builder.header(name, value);
        }

        let http_request = request_builder
            .body(Full::new(body.unwrap_or_default()))
            .map_err(|e| ReqscopeError::InvalidRequest(format!("Failed to build request: {e}")))?;

        let response = self.client.request(http_request).await.map_err(|e| {
            warn!("Exchange failed: {e}");
            ReqscopeError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or("<invalid>").to_string(),
                )
            })
            .collect();

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ReqscopeError::Transport(format!("Failed to read response body: {e}")))?
            .to_bytes();

        Ok(FetchResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

impl Default for UpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch primitive over the pooled client
pub struct UpstreamFetch {
    client: UpstreamClient,
}

impl UpstreamFetch {
    /// Create a fetch primitive sharing the given client
    #[must_use]
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }
}

impl FetchPrimitive for UpstreamFetch {
    fn call(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse>> {
        Box::pin(async move {
            let method = request.method.clone().unwrap_or_else(|| "GET".to_string());
            self.client
                .execute(&method, &request.url, &request.headers, request.body)
                .await
        })
    }
}

/// XHR-style primitive over the pooled client
///
/// Mirrors the open/send contract: `open` only stores the target, `send`
/// drives the exchange. Failures surface as a status-`0` snapshot, the way
/// the original primitive reports them, so they are filtered rather than
/// recorded.
pub struct UpstreamXhr {
    client: UpstreamClient,
    response_type: XhrResponseType,
    target: Option<(String, String)>,
}

impl UpstreamXhr {
    /// Create an unopened instance
    #[must_use]
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client,
            response_type: XhrResponseType::default(),
            target: None,
        }
    }

    /// Declare how the response body should be decoded
    pub fn set_response_type(&mut self, response_type: XhrResponseType) {
        self.response_type = response_type;
    }
}

impl XhrPrimitive for UpstreamXhr {
    fn open(&mut self, method: &str, url: &str) {
        self.target = Some((method.to_string(), url.to_string()));
    }

    fn send(&mut self, body: Option<Bytes>) -> BoxFuture<'_, XhrOutcome> {
        Box::pin(async move {
            let Some((method, url)) = self.target.clone() else {
                debug!("send without open; reporting aborted exchange");
                return aborted_outcome(self.response_type);
            };

            match self.client.execute(&method, &url, &[], body).await {
                Ok(response) => XhrOutcome {
                    status: response.status,
                    status_text: response.status_text,
                    raw_headers: assemble_header_blob(&response.headers),
                    response_type: self.response_type,
                    body: response.body,
                },
                Err(e) => {
                    debug!("Exchange failed: {e}");
                    aborted_outcome(self.response_type)
                }
            }
        })
    }
}

/// Factory producing `UpstreamXhr` instances with a fixed response type
pub struct UpstreamXhrFactory {
    client: UpstreamClient,
    response_type: XhrResponseType,
}

impl UpstreamXhrFactory {
    /// Create a factory sharing the given client
    #[must_use]
    pub fn new(client: UpstreamClient, response_type: XhrResponseType) -> Self {
        Self {
            client,
            response_type,
        }
    }
}

impl XhrFactory for UpstreamXhrFactory {
    fn create(&self) -> Box<dyn XhrPrimitive> {
        let mut xhr = UpstreamXhr::new(self.client.clone());
        xhr.set_response_type(self.response_type);
        Box::new(xhr)
    }
}

/// Assemble the raw newline-delimited header blob of a response
fn assemble_header_blob(headers: &[(String, String)]) -> String {
    let mut blob = String::new();
    for (name, value) in headers {
        blob.push_str(name);
        blob.push_str(": ");
        blob.push_str(value);
        blob.push_str("\r\n");
    }
    blob
}

fn aborted_outcome(response_type: XhrResponseType) -> XhrOutcome {
    XhrOutcome {
        status: 0,
        status_text: String::new(),
        raw_headers: String::new(),
        response_type,
        body: Bytes::new(),
    }
}
