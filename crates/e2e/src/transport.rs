//! HTTP transport for verifying deployed apps
//!
//! Requests can be pinned to a single Edge server: name resolution for every
//! host returns that server, while the URL host is still used for the `Host`
//! header and TLS SNI. This allows testing one node independent of DNS and
//! load balancing.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Request header asking the Edge server to purge running instances
pub const HEADER_PURGE_INSTANCES: &str = "x-edge-purge-instances";

/// Response header carrying the id of the instance that served the request
pub const HEADER_INSTANCE_ID: &str = "x-edge-instance-id";

/// Response header carrying the journal status of the serving instance
pub const HEADER_JOURNAL_STATUS: &str = "x-edge-instance-journal-status";

/// How redirects are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedirectMode {
    /// Return 3xx responses as-is
    #[default]
    Manual,
    /// Follow redirects
    Follow,
}

/// Options for a single request
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub redirect: RedirectMode,

    /// Return non-2xx responses instead of failing
    pub allow_failure: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            redirect: RedirectMode::Manual,
            allow_failure: false,
        }
    }
}

impl FetchOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: impl Into<Bytes>) -> Self {
        Self {
            method: Method::POST,
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Add a request header
    pub fn header(mut self, name: &str, value: &str) -> E2eResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| E2eError::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| E2eError::InvalidHeader(format!("{}: {}", value, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn follow_redirects(mut self) -> Self {
        self.redirect = RedirectMode::Follow;
        self
    }

    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    /// Ask the Edge server to start fresh instances for this request
    pub fn purge_instances(mut self) -> Self {
        self.headers
            .insert(HEADER_PURGE_INSTANCES, HeaderValue::from_static("1"));
        self
    }
}

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: String,
    body: Bytes,

    /// Set when the body of a non-2xx response could not be read
    body_error: Option<String>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, url: String, body: Bytes) -> Self {
        Self {
            status,
            headers,
            url,
            body,
            body_error: None,
        }
    }

    /// Whether the status is in `[200, 300)`
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> E2eResult<String> {
        if let Some(e) = &self.body_error {
            return Err(E2eError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("response body unavailable: {}", e),
            )));
        }
        String::from_utf8(self.body.to_vec()).map_err(|e| {
            E2eError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> E2eResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Header value as a string, if present and valid
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Id of the Edge instance that served the request
    pub fn instance_id(&self) -> Option<&str> {
        self.header(HEADER_INSTANCE_ID)
    }

    pub fn journal_status(&self) -> Option<&str> {
        self.header(HEADER_JOURNAL_STATUS)
    }
}

/// Transport configuration
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// IP or hostname all connections are sent to
    pub target_server: Option<String>,

    /// Accept TLS certificates that do not match the requested host
    pub accept_invalid_certs: bool,
}

/// Resolver that sends every host to one server.
///
/// Returns port 0 so the connector keeps the port from the URL.
#[derive(Debug)]
struct PinnedResolver {
    target: String,
}

impl Resolve for PinnedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        debug!("Resolving {} to pinned server {}", name.as_str(), self.target);
        Box::pin(resolve_target(self.target.clone()))
    }
}

async fn resolve_target(
    target: String,
) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let host = target.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(Box::new(std::iter::once(SocketAddr::new(ip, 0))));
    }
    let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
    Ok(Box::new(resolved.into_iter()))
}

/// HTTP client with optional pinned destination
#[derive(Debug, Clone)]
pub struct HttpClient {
    target_server: Option<String>,
    manual: reqwest::Client,
    follow: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: TransportConfig) -> E2eResult<Self> {
        let manual = Self::build(&config, redirect::Policy::none())?;
        let follow = Self::build(&config, redirect::Policy::default())?;
        Ok(Self {
            target_server: config.target_server,
            manual,
            follow,
        })
    }

    fn build(config: &TransportConfig, policy: redirect::Policy) -> E2eResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .redirect(policy)
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(target) = &config.target_server {
            builder = builder.dns_resolver(Arc::new(PinnedResolver {
                target: target.clone(),
            }));
        }
        Ok(builder.build()?)
    }

    /// The pinned server, if any
    pub fn target_server(&self) -> Option<&str> {
        self.target_server.as_deref()
    }

    /// Perform a single request and read the whole body.
    ///
    /// Does not look at the status; network errors are returned as-is. A
    /// body read failure on a non-2xx response is kept on the response
    /// instead, so the status still reaches the caller.
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> E2eResult<HttpResponse> {
        let parsed = reqwest::Url::parse(url).map_err(|e| E2eError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let client = match options.redirect {
            RedirectMode::Manual => &self.manual,
            RedirectMode::Follow => &self.follow,
        };

        let mut request = client
            .request(options.method.clone(), parsed)
            .headers(options.headers.clone());
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        debug!(
            method = %options.method,
            pinned = ?self.target_server,
            "Fetching URL {}",
            url
        );
        let response = request.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let mut normalized = HttpResponse::new(status, headers, final_url, Bytes::new());
        match response.bytes().await {
            Ok(body) => normalized.body = body,
            Err(e) if !status.is_success() => {
                warn!("Failed to read body of {} response from {}: {}", status, url, e);
                normalized.body_error = Some(e.to_string());
            }
            Err(e) => return Err(e.into()),
        }

        debug!(status = %status, "Fetched URL {} ({} bytes)", url, normalized.body.len());

        Ok(normalized)
    }
}
