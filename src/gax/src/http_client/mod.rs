// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::Result;
use crate::error::Error;
use crate::error::arm::ErrorDetail;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use std::future::Future;
use std::time::Duration;

/// The `Azure-AsyncOperation` header.
pub const AZURE_ASYNC_OPERATION: HeaderName = HeaderName::from_static("azure-asyncoperation");
/// The `Operation-Location` header, used by newer services instead of
/// `Azure-AsyncOperation`.
pub const OPERATION_LOCATION: HeaderName = HeaderName::from_static("operation-location");
/// The `retry-after-ms` header, a delay in milliseconds.
pub const RETRY_AFTER_MS: HeaderName = HeaderName::from_static("retry-after-ms");
/// The `x-ms-retry-after-ms` header, a delay in milliseconds.
pub const X_MS_RETRY_AFTER_MS: HeaderName = HeaderName::from_static("x-ms-retry-after-ms");

/// A request sent by the pollers.
///
/// Pollers only issue `GET` requests without a body.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

impl HttpRequest {
    /// Creates a `GET` request for `url`.
    pub fn get<T: Into<String>>(url: T) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Adds a header to the request.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A fully received HTTP response.
///
/// The response remembers the method and URL of the request that produced
/// it. The pollers need both to interpret the initial response of an
/// operation.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub method: Method,
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a response with no headers and an empty body.
    pub fn new<T: Into<String>>(method: Method, url: T, status: StatusCode) -> Self {
        Self {
            method,
            url: url.into(),
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Adds a header to the response.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the response body.
    pub fn with_body<T: Into<Bytes>>(mut self, body: T) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the response body with the serialized `value`.
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        let body = value.to_string();
        self.with_header(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )
        .with_body(body)
    }

    /// Returns the value of a header as a string, if present and valid.
    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The server-requested delay before the next request, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        retry_after(&self.headers)
    }
}

/// Sends requests for the pollers.
///
/// Implementations return `Ok` for any complete HTTP response, including
/// error status codes. They return `Err` only when no response was received,
/// e.g., the connection failed or the request timed out.
///
/// Implementations may add authentication, telemetry, or retry transport
/// failures. The pollers never retry a request within a single poll.
pub trait HttpTransport: std::fmt::Debug + Send + Sync {
    /// Sends `request` and receives the full response.
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

pub mod dynamic {
    use super::{HttpRequest, HttpResponse};
    use crate::Result;

    /// A dyn-compatible, crate-private version of `HttpTransport`.
    #[async_trait::async_trait]
    pub trait HttpTransport: Send + Sync + std::fmt::Debug {
        /// Sends `request` and receives the full response.
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
    }

    /// All implementations of [super::HttpTransport] implement this trait.
    #[async_trait::async_trait]
    impl<T> HttpTransport for T
    where
        T: super::HttpTransport,
    {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            T::execute(self, request).await
        }
    }
}

/// An [HttpTransport] based on [reqwest].
///
/// The default client does not configure TLS. Applications talking to HTTPS
/// endpoints should create a `reqwest::Client` with their preferred TLS
/// configuration and use [ReqwestTransport::from_client].
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport using an existing client.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self {
            inner,
            timeout: None,
        }
    }

    /// Sets a timeout for each request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn map_send_error(err: reqwest::Error) -> Error {
        match err {
            e if e.is_timeout() => Error::timeout(e),
            e => Error::io(e),
        }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .inner
            .request(request.method.clone(), &request.url)
            .headers(request.headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await.map_err(Self::map_send_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Self::map_send_error)?;
        tracing::debug!(method = %request.method, url = %request.url, %status, "received response");
        Ok(HttpResponse {
            method: request.method,
            url: request.url,
            status,
            headers,
            body,
        })
    }
}

/// Converts an unsuccessful response into an [Error].
///
/// If the body contains a service error payload the result is a service
/// error with the HTTP metadata. Otherwise the status code, headers and raw
/// payload are preserved in a transport error.
pub fn to_http_error(response: &HttpResponse) -> Error {
    let status_code = response.status.as_u16();
    match ErrorDetail::try_from(&response.body) {
        Ok(detail) => Error::service_with_http_metadata(
            detail,
            Some(status_code),
            Some(response.headers.clone()),
        ),
        Err(_) => Error::http(
            status_code,
            response.headers.clone(),
            response.body.clone(),
        ),
    }
}

/// Parses the server-requested delay from the response headers.
///
/// Checks, in order, `retry-after-ms`, `x-ms-retry-after-ms` (both in
/// milliseconds) and `Retry-After` (in seconds, or an HTTP date). Returns
/// `None` if no header is present, none can be parsed, or the delay is zero.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = |name: &HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
    let millis = [&RETRY_AFTER_MS, &X_MS_RETRY_AFTER_MS]
        .into_iter()
        .filter_map(value)
        .find_map(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis);
    let delay = millis.or_else(|| value(&http::header::RETRY_AFTER).and_then(parse_retry_after));
    delay.filter(|d| !d.is_zero())
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
    // Dates in the past mean "retry now".
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
