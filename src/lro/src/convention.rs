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

//! Interprets the responses of resource-manager long-running operations.
//!
//! Services use one of three conventions to report progress:
//!
//! * An `Azure-AsyncOperation` header (or `Operation-Location` in newer
//!   services) names a status resource. The `status` property of that
//!   resource is the operation status.
//! * A `Location` header names a URL that returns `202 Accepted` while the
//!   operation runs, and any other successful status code once it completes.
//! * The resource itself carries `properties.provisioningState`.
//!
//! The convention is selected from the initial response, by [select], and
//! each polling response is interpreted using that convention, by
//! [interpret].

use crate::OperationStatus;
use crate::state::{Observation, PollerState, PollingConvention};
use gax::Result;
use gax::error::arm::ErrorDetail;
use gax::error::{Error, ProtocolError};
use gax::http_client::{AZURE_ASYNC_OPERATION, HttpResponse, OPERATION_LOCATION, to_http_error};
use http::Method;
use http::header::{HeaderName, LOCATION};
use serde_json::Value;

/// Selects the polling convention from the initial response of an operation.
///
/// Returns the service error for unsuccessful responses, and a protocol
/// error if the response does not follow any known convention.
pub fn select(initial: &HttpResponse) -> Result<PollerState> {
    if !initial.status.is_success() {
        return Err(to_http_error(initial));
    }
    let code = initial.status.as_u16();
    if !matches!(code, 200 | 201 | 202 | 204) {
        return Err(Error::protocol(ProtocolError::UnexpectedStatusCode(code)));
    }
    let method = initial.method.clone();
    let resource_url = initial.url.clone();

    if let Some(poll_url) = async_operation_url(initial).map_err(Error::protocol)? {
        // A malformed `Location` is ignored, it is only a candidate for the
        // final result.
        let location = initial
            .header_str(&LOCATION)
            .and_then(|v| absolute_url(&LOCATION, v).ok());
        let convention = PollingConvention::AsyncOperation { poll_url, location };
        tracing::debug!(%method, %resource_url, "polling with Azure-AsyncOperation");
        return Ok(PollerState::new(
            convention,
            method,
            OperationStatus::NotStarted,
            resource_url,
        ));
    }

    let uses_location = code == 202 || method == Method::POST || method == Method::DELETE;
    if let Some(value) = initial.header_str(&LOCATION).filter(|_| uses_location) {
        let poll_url = absolute_url(&LOCATION, value).map_err(Error::protocol)?;
        tracing::debug!(%method, %resource_url, "polling with Location");
        return Ok(PollerState::new(
            PollingConvention::Location { poll_url },
            method,
            OperationStatus::NotStarted,
            resource_url,
        ));
    }
    if code == 202 {
        return Err(Error::protocol(ProtocolError::MissingPollingHeader));
    }

    let body = json_body(initial).map_err(Error::protocol)?;
    let (status, error) = match body.as_ref() {
        Some(body) => {
            let status = provisioning_state(body).map_err(Error::protocol)?;
            (status.unwrap_or(OperationStatus::Succeeded), error_detail(body))
        }
        None => (OperationStatus::Succeeded, None),
    };
    tracing::debug!(%method, %resource_url, %status, "polling the resource body");
    let mut state = PollerState::new(PollingConvention::Body, method, status, resource_url);
    state.error = error;
    Ok(state)
}

/// Interprets a successful polling response.
///
/// The caller is responsible for converting unsuccessful responses into
/// errors, this function only sees `2xx` responses.
pub fn interpret(
    state: &PollerState,
    response: &HttpResponse,
) -> std::result::Result<Observation, ProtocolError> {
    match state.convention() {
        PollingConvention::AsyncOperation { .. } => interpret_async_operation(response),
        PollingConvention::Location { .. } => interpret_location(response),
        PollingConvention::Body => interpret_body(response),
    }
}

fn interpret_async_operation(
    response: &HttpResponse,
) -> std::result::Result<Observation, ProtocolError> {
    let body = json_body(response)?.ok_or(ProtocolError::MissingStatus)?;
    let status = match body.get("status") {
        Some(Value::String(s)) => s.parse::<OperationStatus>()?,
        Some(other) => return Err(ProtocolError::InvalidStatus(other.to_string())),
        None => return Err(ProtocolError::MissingStatus),
    };
    let result_url = match body.get("resourceLocation").and_then(Value::as_str) {
        Some(v) => Some(absolute_url(&HeaderName::from_static("resourcelocation"), v)?),
        None => None,
    };
    Ok(Observation {
        status,
        poll_url: async_operation_url(response)?,
        result_url,
        error: error_detail(&body),
    })
}

fn interpret_location(response: &HttpResponse) -> std::result::Result<Observation, ProtocolError> {
    let location = match response.header_str(&LOCATION) {
        Some(v) => Some(absolute_url(&LOCATION, v)?),
        None => None,
    };
    if response.status.as_u16() == 202 {
        return Ok(Observation {
            status: OperationStatus::Running,
            poll_url: location,
            ..Default::default()
        });
    }
    // Any other successful response completes the operation. A `Location`
    // header in the final response names the result.
    Ok(Observation {
        status: OperationStatus::Succeeded,
        result_url: location,
        ..Default::default()
    })
}

fn interpret_body(response: &HttpResponse) -> std::result::Result<Observation, ProtocolError> {
    if response.status.as_u16() == 202 {
        return Ok(Observation {
            status: OperationStatus::Running,
            ..Default::default()
        });
    }
    let Some(body) = json_body(response)? else {
        return Ok(Observation {
            status: OperationStatus::Succeeded,
            ..Default::default()
        });
    };
    let status = provisioning_state(&body)?.unwrap_or(OperationStatus::Succeeded);
    Ok(Observation {
        status,
        error: error_detail(&body),
        ..Default::default()
    })
}

fn async_operation_url(
    response: &HttpResponse,
) -> std::result::Result<Option<String>, ProtocolError> {
    for name in [&AZURE_ASYNC_OPERATION, &OPERATION_LOCATION] {
        if let Some(value) = response.header_str(name) {
            return absolute_url(name, value).map(Some);
        }
    }
    Ok(None)
}

fn absolute_url(header: &HeaderName, value: &str) -> std::result::Result<String, ProtocolError> {
    match url::Url::parse(value) {
        Ok(url) if !url.cannot_be_a_base() => Ok(value.to_string()),
        _ => Err(ProtocolError::InvalidPollingUrl {
            header: header.to_string(),
            value: value.to_string(),
        }),
    }
}

fn json_body(response: &HttpResponse) -> std::result::Result<Option<Value>, ProtocolError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Value>(&response.body)
        .map(Some)
        .map_err(|e| ProtocolError::InvalidBody(e.to_string()))
}

fn provisioning_state(body: &Value) -> std::result::Result<Option<OperationStatus>, ProtocolError> {
    match body.pointer("/properties/provisioningState") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some),
        Some(other) => Err(ProtocolError::InvalidStatus(other.to_string())),
    }
}

/// Extracts the `error` property, ignoring values with an unexpected shape.
fn error_detail(body: &Value) -> Option<ErrorDetail> {
    body.get("error")
        .and_then(|v| ErrorDetail::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http::header::HeaderValue;
    use serde_json::json;
    use test_case::test_case;

    const RESOURCE: &str = "https://management.example.com/r1";
    const OPERATION: &str = "https://management.example.com/operations/op1";
    const LOCATION_URL: &str = "https://management.example.com/locations/l1";

    fn response(method: Method, code: u16) -> HttpResponse {
        HttpResponse::new(method, RESOURCE, StatusCode::from_u16(code).unwrap())
    }

    fn header(name: HeaderName, value: &'static str) -> (HeaderName, HeaderValue) {
        (name, HeaderValue::from_static(value))
    }

    fn with(response: HttpResponse, h: (HeaderName, HeaderValue)) -> HttpResponse {
        response.with_header(h.0, h.1)
    }

    #[test_case(Method::PUT, 201)]
    #[test_case(Method::PUT, 202)]
    #[test_case(Method::PATCH, 200)]
    #[test_case(Method::DELETE, 202)]
    #[test_case(Method::POST, 202)]
    fn select_async_operation(method: Method, code: u16) -> anyhow::Result<()> {
        let initial = with(
            response(method.clone(), code),
            header(AZURE_ASYNC_OPERATION, OPERATION),
        );
        let state = select(&initial)?;
        assert_eq!(
            state.convention(),
            &PollingConvention::AsyncOperation {
                poll_url: OPERATION.into(),
                location: None
            }
        );
        assert_eq!(state.status(), OperationStatus::NotStarted);
        assert_eq!(state.method(), &method);
        assert_eq!(state.resource_url(), RESOURCE);
        assert_eq!(state.poll_url(), OPERATION);
        Ok(())
    }

    #[test]
    fn select_operation_location() -> anyhow::Result<()> {
        let initial = with(
            response(Method::POST, 202),
            header(OPERATION_LOCATION, OPERATION),
        );
        let state = select(&initial)?;
        assert_eq!(state.poll_url(), OPERATION);
        assert!(
            matches!(state.convention(), PollingConvention::AsyncOperation { .. }),
            "{state:?}"
        );
        Ok(())
    }

    #[test]
    fn select_async_operation_wins_over_location() -> anyhow::Result<()> {
        let initial = with(
            with(
                response(Method::DELETE, 202),
                header(AZURE_ASYNC_OPERATION, OPERATION),
            ),
            header(LOCATION, LOCATION_URL),
        );
        let state = select(&initial)?;
        assert_eq!(
            state.convention(),
            &PollingConvention::AsyncOperation {
                poll_url: OPERATION.into(),
                location: Some(LOCATION_URL.into())
            }
        );
        Ok(())
    }

    #[test]
    fn select_async_operation_ignores_bad_location() -> anyhow::Result<()> {
        let initial = with(
            with(
                response(Method::DELETE, 202),
                header(AZURE_ASYNC_OPERATION, OPERATION),
            ),
            header(LOCATION, "/relative"),
        );
        let state = select(&initial)?;
        assert_eq!(
            state.convention(),
            &PollingConvention::AsyncOperation {
                poll_url: OPERATION.into(),
                location: None
            }
        );
        Ok(())
    }

    #[test_case(Method::DELETE, 202)]
    #[test_case(Method::PUT, 202)]
    #[test_case(Method::POST, 202)]
    #[test_case(Method::POST, 200)]
    #[test_case(Method::DELETE, 200)]
    fn select_location(method: Method, code: u16) -> anyhow::Result<()> {
        let initial = with(response(method, code), header(LOCATION, LOCATION_URL));
        let state = select(&initial)?;
        assert_eq!(
            state.convention(),
            &PollingConvention::Location {
                poll_url: LOCATION_URL.into()
            }
        );
        assert_eq!(state.status(), OperationStatus::NotStarted);
        Ok(())
    }

    #[test]
    fn select_put_ignores_location_on_created() -> anyhow::Result<()> {
        let initial = with(response(Method::PUT, 201), header(LOCATION, LOCATION_URL))
            .with_json(&json!({"properties": {"provisioningState": "Creating"}}));
        let state = select(&initial)?;
        assert_eq!(state.convention(), &PollingConvention::Body);
        assert_eq!(state.status(), OperationStatus::Running);
        assert_eq!(state.poll_url(), RESOURCE);
        Ok(())
    }

    fn provisioning(state: &str) -> Value {
        json!({"properties": {"provisioningState": state}})
    }

    #[test_case(provisioning("Succeeded"), OperationStatus::Succeeded; "succeeded")]
    #[test_case(provisioning("Updating"), OperationStatus::Running; "updating")]
    #[test_case(provisioning("failed"), OperationStatus::Failed; "failed")]
    #[test_case(json!({"properties": {}}), OperationStatus::Succeeded; "no provisioning state")]
    #[test_case(json!({"name": "r1"}), OperationStatus::Succeeded; "no properties")]
    fn select_body(body: Value, want: OperationStatus) -> anyhow::Result<()> {
        for code in [200, 201] {
            let initial = response(Method::PUT, code).with_json(&body);
            let state = select(&initial)?;
            assert_eq!(state.convention(), &PollingConvention::Body, "{code}");
            assert_eq!(state.status(), want, "{code}");
        }
        Ok(())
    }

    #[test]
    fn select_no_content() -> anyhow::Result<()> {
        let state = select(&response(Method::DELETE, 204))?;
        assert_eq!(state.convention(), &PollingConvention::Body);
        assert_eq!(state.status(), OperationStatus::Succeeded);
        Ok(())
    }

    #[test]
    fn select_body_failed_with_error() -> anyhow::Result<()> {
        let initial = response(Method::PUT, 200).with_json(&json!({
            "properties": {"provisioningState": "Failed"},
            "error": {"code": "QuotaExceeded", "message": "too many"},
        }));
        let state = select(&initial)?;
        assert_eq!(state.status(), OperationStatus::Failed);
        assert_eq!(
            state.error(),
            Some(&ErrorDetail::default().set_code("QuotaExceeded").set_message("too many"))
        );
        Ok(())
    }

    #[test]
    fn select_missing_header() {
        let got = select(&response(Method::DELETE, 202));
        let err = got.expect_err("a 202 needs a polling header");
        let want = ProtocolError::MissingPollingHeader;
        assert_eq!(err.protocol_error(), Some(&want), "{err:?}");
    }

    #[test_case(AZURE_ASYNC_OPERATION, "/operations/op1")]
    #[test_case(OPERATION_LOCATION, "not a url")]
    #[test_case(LOCATION, "mailto:someone")]
    fn select_relative_url(name: HeaderName, value: &'static str) {
        let initial = with(response(Method::POST, 202), header(name.clone(), value));
        let got = select(&initial);
        let want = ProtocolError::InvalidPollingUrl {
            header: name.to_string(),
            value: value.to_string(),
        };
        assert!(
            matches!(&got, Err(e) if e.protocol_error() == Some(&want)),
            "{got:?}"
        );
    }

    #[test_case(203)]
    #[test_case(206)]
    fn select_unexpected_code(code: u16) {
        let got = select(&response(Method::PUT, code));
        let err = got.expect_err("the status code is not valid for an LRO");
        let want = ProtocolError::UnexpectedStatusCode(code);
        assert_eq!(err.protocol_error(), Some(&want), "{err:?}");
    }

    #[test]
    fn select_service_error() {
        let initial = response(Method::PUT, 409)
            .with_json(&json!({"error": {"code": "Conflict", "message": "busy"}}));
        let got = select(&initial);
        let err = got.expect_err("a 409 is a service error");
        assert_eq!(err.http_status_code(), Some(409), "{err:?}");
        let code = err.detail().map(|d| d.code.as_str());
        assert_eq!(code, Some("Conflict"), "{err:?}");
    }

    #[test]
    fn select_invalid_provisioning_state() {
        let initial = response(Method::PUT, 201)
            .with_json(&json!({"properties": {"provisioningState": "Bogus"}}));
        let got = select(&initial);
        assert!(matches!(&got, Err(e) if e.is_invalid_status()), "{got:?}");
    }

    fn async_state() -> PollerState {
        PollerState::new(
            PollingConvention::AsyncOperation {
                poll_url: OPERATION.into(),
                location: None,
            },
            Method::PUT,
            OperationStatus::NotStarted,
            RESOURCE.into(),
        )
    }

    fn location_state() -> PollerState {
        PollerState::new(
            PollingConvention::Location {
                poll_url: LOCATION_URL.into(),
            },
            Method::DELETE,
            OperationStatus::NotStarted,
            RESOURCE.into(),
        )
    }

    fn body_state() -> PollerState {
        PollerState::new(
            PollingConvention::Body,
            Method::PUT,
            OperationStatus::Running,
            RESOURCE.into(),
        )
    }

    fn poll_response(code: u16) -> HttpResponse {
        HttpResponse::new(Method::GET, OPERATION, StatusCode::from_u16(code).unwrap())
    }

    #[test_case("InProgress", OperationStatus::Running; "in progress")]
    #[test_case("Running", OperationStatus::Running; "running")]
    #[test_case("NotStarted", OperationStatus::NotStarted; "not started")]
    #[test_case("Succeeded", OperationStatus::Succeeded; "succeeded")]
    #[test_case("SUCCEEDED", OperationStatus::Succeeded; "uppercase succeeded")]
    #[test_case("Failed", OperationStatus::Failed; "failed")]
    #[test_case("Canceled", OperationStatus::Canceled; "canceled")]
    fn interpret_async_status(status: &str, want: OperationStatus) -> anyhow::Result<()> {
        let response = poll_response(200).with_json(&json!({"status": status}));
        let got = interpret(&async_state(), &response)?;
        assert_eq!(got.status, want);
        assert_eq!(got.poll_url, None);
        assert_eq!(got.result_url, None);
        Ok(())
    }

    #[test]
    fn interpret_async_full() -> anyhow::Result<()> {
        let response = with(
            poll_response(200),
            header(AZURE_ASYNC_OPERATION, "https://management.example.com/operations/op2"),
        )
        .with_json(&json!({
            "status": "Failed",
            "resourceLocation": "https://management.example.com/results/r1",
            "error": {"code": "Internal", "message": "broken"},
        }));
        let got = interpret(&async_state(), &response)?;
        assert_eq!(
            got,
            Observation {
                status: OperationStatus::Failed,
                poll_url: Some("https://management.example.com/operations/op2".into()),
                result_url: Some("https://management.example.com/results/r1".into()),
                error: Some(ErrorDetail::default().set_code("Internal").set_message("broken")),
            }
        );
        Ok(())
    }

    #[test_case(json!({}); "empty object")]
    #[test_case(json!({"name": "op1"}); "no status")]
    #[test_case(json!({"status": null}); "null status")]
    fn interpret_async_missing_status(body: Value) {
        let response = poll_response(200).with_json(&body);
        let got = interpret(&async_state(), &response);
        assert!(
            matches!(&got, Err(e) if e.is_invalid_status()),
            "{got:?}"
        );
    }

    #[test]
    fn interpret_async_empty_body() {
        let got = interpret(&async_state(), &poll_response(200));
        assert_eq!(got, Err(ProtocolError::MissingStatus));
    }

    #[test]
    fn interpret_async_bad_status() {
        let response = poll_response(200).with_json(&json!({"status": "Bogus"}));
        let got = interpret(&async_state(), &response);
        assert_eq!(got, Err(ProtocolError::InvalidStatus("Bogus".into())));

        let response = poll_response(200).with_json(&json!({"status": 42}));
        let got = interpret(&async_state(), &response);
        assert_eq!(got, Err(ProtocolError::InvalidStatus("42".into())));
    }

    #[test]
    fn interpret_async_bad_json() {
        let response = poll_response(200).with_body("{not json");
        let got = interpret(&async_state(), &response);
        assert!(matches!(got, Err(ProtocolError::InvalidBody(_))), "{got:?}");
    }

    #[test]
    fn interpret_location_running() -> anyhow::Result<()> {
        let got = interpret(&location_state(), &poll_response(202))?;
        assert_eq!(got.status, OperationStatus::Running);
        assert_eq!(got.poll_url, None);

        let response = with(
            poll_response(202),
            header(LOCATION, "https://management.example.com/locations/l2"),
        );
        let got = interpret(&location_state(), &response)?;
        assert_eq!(got.status, OperationStatus::Running);
        assert_eq!(
            got.poll_url.as_deref(),
            Some("https://management.example.com/locations/l2")
        );
        Ok(())
    }

    #[test_case(200)]
    #[test_case(201)]
    #[test_case(204)]
    fn interpret_location_done(code: u16) -> anyhow::Result<()> {
        let got = interpret(&location_state(), &poll_response(code))?;
        assert_eq!(got.status, OperationStatus::Succeeded);
        assert_eq!(got.result_url, None);
        Ok(())
    }

    #[test]
    fn interpret_location_done_with_result() -> anyhow::Result<()> {
        let response = with(
            poll_response(200),
            header(LOCATION, "https://management.example.com/results/r1"),
        );
        let got = interpret(&location_state(), &response)?;
        assert_eq!(got.status, OperationStatus::Succeeded);
        assert_eq!(
            got.result_url.as_deref(),
            Some("https://management.example.com/results/r1")
        );
        Ok(())
    }

    #[test]
    fn interpret_body() -> anyhow::Result<()> {
        let got = interpret(&body_state(), &poll_response(202))?;
        assert_eq!(got.status, OperationStatus::Running);

        let response =
            poll_response(200).with_json(&json!({"properties": {"provisioningState": "Deleting"}}));
        let got = interpret(&body_state(), &response)?;
        assert_eq!(got.status, OperationStatus::Running);

        let response = poll_response(200)
            .with_json(&json!({"properties": {"provisioningState": "Succeeded", "size": 3}}));
        let got = interpret(&body_state(), &response)?;
        assert_eq!(got.status, OperationStatus::Succeeded);

        let response = poll_response(200).with_json(&json!({"properties": {}}));
        let got = interpret(&body_state(), &response)?;
        assert_eq!(got.status, OperationStatus::Succeeded);

        let got = interpret(&body_state(), &poll_response(204))?;
        assert_eq!(got.status, OperationStatus::Succeeded);
        Ok(())
    }

    #[test]
    fn interpret_body_invalid() {
        let response =
            poll_response(200).with_json(&json!({"properties": {"provisioningState": true}}));
        let got = interpret(&body_state(), &response);
        assert_eq!(got, Err(ProtocolError::InvalidStatus("true".into())));
    }
}
