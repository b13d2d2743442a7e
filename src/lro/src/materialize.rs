// Copyright 2025 Google LLC
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

//! Produces the final result of a successful operation.

use crate::FinalStateVia;
use crate::state::{PollerState, PollingConvention};
use gax::Result;
use gax::context::Context;
use gax::error::Error;
use gax::http_client::{HttpRequest, HttpResponse, dynamic::HttpTransport, to_http_error};
use http::Method;
use serde::de::DeserializeOwned;

/// Where the final result comes from.
#[derive(Debug, PartialEq)]
pub(crate) enum Source<'a> {
    /// The body of the last polling response.
    Body(&'a [u8]),
    /// A `GET` request to this URL.
    Fetch(&'a str),
    /// The operation has no result.
    Empty,
}

/// Decides where the final result of a succeeded operation comes from.
///
/// `last` is the last response received by the poller, it is `None` for
/// pollers created from a resume token that have not polled yet.
pub(crate) fn source<'a>(
    state: &'a PollerState,
    last: Option<&'a HttpResponse>,
    via: Option<FinalStateVia>,
) -> Source<'a> {
    let last_body = last.map(|r| r.body.as_ref()).filter(|b| !is_blank(b));
    match (&state.convention, via) {
        (_, Some(FinalStateVia::OriginalUri)) => Source::Fetch(&state.resource_url),
        (
            PollingConvention::AsyncOperation { poll_url, .. },
            Some(FinalStateVia::AzureAsyncOperation),
        ) => match last_body {
            Some(body) => Source::Body(body),
            None => Source::Fetch(poll_url),
        },
        (
            PollingConvention::AsyncOperation {
                location: Some(l), ..
            },
            Some(FinalStateVia::Location),
        ) => Source::Fetch(l),
        (PollingConvention::AsyncOperation { location, .. }, _) => {
            if let Some(url) = &state.result_url {
                return Source::Fetch(url);
            }
            if let Some(body) = last_body.filter(|b| has_properties(b)) {
                return Source::Body(body);
            }
            if is_put_or_patch(&state.method) {
                return Source::Fetch(&state.resource_url);
            }
            match location {
                Some(l) => Source::Fetch(l),
                None => Source::Empty,
            }
        }
        (PollingConvention::Location { poll_url }, _) => {
            if let Some(body) = last_body {
                return Source::Body(body);
            }
            if let Some(url) = &state.result_url {
                return Source::Fetch(url);
            }
            if is_put_or_patch(&state.method) {
                return Source::Fetch(&state.resource_url);
            }
            match last {
                // The final response was empty.
                Some(_) => Source::Empty,
                None if state.method == Method::DELETE => Source::Empty,
                None => Source::Fetch(poll_url),
            }
        }
        (PollingConvention::Body, _) => match (last_body, last) {
            (Some(body), _) => Source::Body(body),
            (None, Some(_)) => Source::Empty,
            (None, None) if state.method == Method::DELETE => Source::Empty,
            (None, None) => Source::Fetch(&state.resource_url),
        },
    }
}

/// Produces the final result, fetching it if needed.
pub(crate) async fn materialize<T>(
    state: &PollerState,
    last: Option<&HttpResponse>,
    via: Option<FinalStateVia>,
    transport: &dyn HttpTransport,
    ctx: &Context,
) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match source(state, last, via) {
        Source::Body(body) => decode(body),
        Source::Empty => Ok(T::default()),
        Source::Fetch(url) => {
            tracing::debug!(%url, "fetching the final result");
            let response = ctx.run(transport.execute(HttpRequest::get(url))).await?;
            if !response.status.is_success() {
                return Err(to_http_error(&response));
            }
            decode(&response.body)
        }
    }
}

/// Decodes a final result, an empty body is the default value.
pub(crate) fn decode<T>(body: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if is_blank(body) {
        return Ok(T::default());
    }
    serde_json::from_slice::<T>(body).map_err(Error::deser)
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

fn is_put_or_patch(method: &Method) -> bool {
    *method == Method::PUT || *method == Method::PATCH
}

/// Returns true if the status body embeds the resource.
fn has_properties(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .is_some_and(|v| v.get("properties").is_some_and(serde_json::Value::is_object))
}
