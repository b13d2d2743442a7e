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

use super::arm::ErrorDetail;
use super::{ProtocolError, TokenError};
use http::HeaderMap;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The core error returned by the pollers.
///
/// The pollers report errors from multiple sources. For example, the transport
/// may be unable to reach the service, the service may return an error
/// response, the response may violate the polling protocol, the caller may
/// cancel the operation, or the operation itself may fail on the service.
///
/// Most applications will just return the error or log it, without any further
/// action. However, some applications may need to interrogate the error
/// details. This type offers a series of predicates to determine the error
/// kind. The type also offers accessors to query the most common error details.
/// Applications can query the error [source][std::error::Error::source] for
/// deeper information.
///
/// # Example
/// ```
/// use arm_gax::error::Error;
/// match example_function() {
///     Err(e) if e.is_operation_failure() => {
///         println!("the operation failed {e}, details: {:?}", e.detail());
///     },
///     Err(e) if e.is_protocol() => { println!("the service misbehaved {e}"); },
///     Err(e) => { println!("some other error {e}"); },
///     Ok(_) => { println!("success, how boring"); },
/// }
///
/// fn example_function() -> Result<String, Error> {
///     // ... details omitted ...
///     # Err(Error::not_done())
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

/// The terminal, unsuccessful outcome of a long-running operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The service reports the operation failed.
    Failed,
    /// The operation was canceled on the service.
    Canceled,
}

impl std::fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "was canceled"),
        }
    }
}

impl Error {
    /// Creates an error with the information returned by the service.
    ///
    /// # Example
    /// ```
    /// use arm_gax::error::Error;
    /// use arm_gax::error::arm::ErrorDetail;
    /// let detail = ErrorDetail::default().set_code("NotFound").set_message("NOT FOUND");
    /// let error = Error::service(detail.clone());
    /// assert_eq!(error.detail(), Some(&detail));
    /// ```
    pub fn service(detail: ErrorDetail) -> Self {
        let details = ServiceDetails {
            detail,
            status_code: None,
            headers: None,
        };
        Self {
            kind: ErrorKind::Service(Box::new(details)),
            source: None,
        }
    }

    /// Create service errors including transport metadata.
    pub fn service_with_http_metadata(
        detail: ErrorDetail,
        status_code: Option<u16>,
        headers: Option<HeaderMap>,
    ) -> Self {
        let details = ServiceDetails {
            status_code,
            headers,
            detail,
        };
        let kind = ErrorKind::Service(Box::new(details));
        Self { kind, source: None }
    }

    /// Creates an error representing a long-running operation that ended in
    /// a `Failed` or `Canceled` state.
    ///
    /// # Example
    /// ```
    /// use arm_gax::error::{Error, OperationOutcome};
    /// use arm_gax::error::arm::ErrorDetail;
    /// let detail = ErrorDetail::default().set_code("QuotaExceeded");
    /// let error = Error::operation(OperationOutcome::Failed, Some(detail.clone()));
    /// assert!(error.is_operation_failure());
    /// assert_eq!(error.detail(), Some(&detail));
    /// ```
    pub fn operation(outcome: OperationOutcome, detail: Option<ErrorDetail>) -> Self {
        let details = OperationDetails { outcome, detail };
        Self {
            kind: ErrorKind::Operation(Box::new(details)),
            source: None,
        }
    }

    /// The long-running operation reached a terminal, unsuccessful state.
    ///
    /// This is not a problem polling the operation: the service completed the
    /// operation and reports that it failed or was canceled. Use
    /// [detail()][Error::detail] to examine the error payload reported by the
    /// service, if any.
    pub fn is_operation_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Operation(_))
    }

    /// How the long-running operation ended, if this is an operation failure.
    pub fn operation_outcome(&self) -> Option<OperationOutcome> {
        match &self.kind {
            ErrorKind::Operation(d) => Some(d.outcome),
            _ => None,
        }
    }

    /// The [ErrorDetail] payload associated with this error.
    ///
    /// Service errors and failed operations may include this payload. It is
    /// returned verbatim, as reported by the service.
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match &self.kind {
            ErrorKind::Service(d) => Some(&d.detail),
            ErrorKind::Operation(d) => d.detail.as_ref(),
            _ => None,
        }
    }

    /// Creates an error representing a timeout.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use arm_gax::error::Error;
    /// let error = Error::timeout("simulated timeout");
    /// assert!(error.is_timeout());
    /// assert!(error.source().is_some());
    /// ```
    pub fn timeout<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Some(source.into()),
        }
    }

    /// The request could not be completed before the transport timeout.
    ///
    /// This is always a client-side generated error, reported by the HTTP
    /// transport. Polling requests are idempotent, it is always safe to poll
    /// again.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Creates an error representing an exhausted policy.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use arm_gax::error::Error;
    /// let error = Error::exhausted("too many polling attempts");
    /// assert!(error.is_exhausted());
    /// assert!(error.source().is_some());
    /// ```
    pub fn exhausted<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Exhausted,
            source: Some(source.into()),
        }
    }

    /// The polling loop stopped before the operation completed because the
    /// polling error policy was exhausted.
    ///
    /// The operation may still complete on the service. The poller remains
    /// usable and may be polled again, or resumed from a token.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::Exhausted)
    }

    /// Creates an error representing a deserialization problem.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use arm_gax::error::Error;
    /// let error = Error::deser("simulated problem");
    /// assert!(error.is_deserialization());
    /// assert!(error.source().is_some());
    /// ```
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The final result of the operation could not be deserialized.
    ///
    /// The operation completed successfully on the service, but the resource
    /// representation does not match the expected type. This is never
    /// retried.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// Creates an error representing a serialization problem.
    pub fn ser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            source: Some(source.into()),
        }
    }

    /// A value, such as a resume token, could not be serialized.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Serialization)
    }

    /// Creates an error representing a protocol violation.
    ///
    /// # Example
    /// ```
    /// use arm_gax::error::{Error, ProtocolError};
    /// let error = Error::protocol(ProtocolError::MissingStatus);
    /// assert!(error.is_protocol());
    /// assert_eq!(error.protocol_error(), Some(&ProtocolError::MissingStatus));
    /// ```
    pub fn protocol(source: ProtocolError) -> Self {
        Self {
            kind: ErrorKind::Protocol,
            source: Some(source.into()),
        }
    }

    /// A response from the service violated the polling protocol.
    ///
    /// Examples include a `202 Accepted` response without polling headers, an
    /// operation status body without a `status` property, an unrecognized
    /// status value, or a status that moves backwards.
    ///
    /// These errors are not retryable. A poller that receives such a response
    /// reports the same error on all subsequent calls.
    pub fn is_protocol(&self) -> bool {
        matches!(self.kind, ErrorKind::Protocol)
    }

    /// The protocol violation, if this is a protocol error.
    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match &self.kind {
            ErrorKind::Protocol => self
                .source
                .as_ref()
                .and_then(|e| e.downcast_ref::<ProtocolError>()),
            _ => None,
        }
    }

    /// The response carried a missing or unrecognized operation status.
    ///
    /// This is a special case of [is_protocol()][Error::is_protocol].
    pub fn is_invalid_status(&self) -> bool {
        self.protocol_error()
            .is_some_and(ProtocolError::is_invalid_status)
    }

    /// Creates an error representing a resume token that cannot be used.
    ///
    /// # Example
    /// ```
    /// use arm_gax::error::{Error, TokenError};
    /// let error = Error::resume_token(TokenError::Malformed("bad base64".into()));
    /// assert!(error.is_resume_token());
    /// ```
    pub fn resume_token(source: TokenError) -> Self {
        Self {
            kind: ErrorKind::ResumeToken,
            source: Some(source.into()),
        }
    }

    /// A resume token could not be decoded.
    ///
    /// The token may be corrupted, truncated, created by an incompatible
    /// version of this library, or created for a different type of operation.
    /// Use [token_error()][Error::token_error] to find out which.
    pub fn is_resume_token(&self) -> bool {
        matches!(self.kind, ErrorKind::ResumeToken)
    }

    /// The token problem, if this is a resume token error.
    pub fn token_error(&self) -> Option<&TokenError> {
        match &self.kind {
            ErrorKind::ResumeToken => self
                .source
                .as_ref()
                .and_then(|e| e.downcast_ref::<TokenError>()),
            _ => None,
        }
    }

    /// Creates an error for results requested before the operation completes.
    pub fn not_done() -> Self {
        Self {
            kind: ErrorKind::NotDone,
            source: None,
        }
    }

    /// The result was requested before the operation reached a terminal state.
    ///
    /// This indicates a problem in the application logic, poll the operation
    /// until it is done before querying its result.
    pub fn is_not_done(&self) -> bool {
        matches!(self.kind, ErrorKind::NotDone)
    }

    /// Creates an error representing a cancelled [Context][crate::context::Context].
    pub fn cancelled() -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            source: None,
        }
    }

    /// The caller cancelled the operation's context.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Creates an error representing an expired [Context][crate::context::Context].
    pub fn deadline_exceeded() -> Self {
        Self {
            kind: ErrorKind::DeadlineExceeded,
            source: None,
        }
    }

    /// The deadline in the operation's context expired.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self.kind, ErrorKind::DeadlineExceeded)
    }

    /// The error was raised by the caller's context, either cancelled or
    /// expired.
    pub fn is_context(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled | ErrorKind::DeadlineExceeded)
    }

    /// The HTTP status code, if any, associated with this error.
    ///
    /// # Example
    /// ```
    /// use arm_gax::error::Error;
    /// let e = search_for_thing("the thing");
    /// if let Some(code) = e.http_status_code() {
    ///     if code == 404 {
    ///         println!("cannot find the thing, more details in {e}");
    ///     }
    /// }
    ///
    /// fn search_for_thing(name: &str) -> Error {
    ///     # Error::http(400, http::HeaderMap::new(), bytes::Bytes::from_static(b"NOT FOUND"))
    /// }
    /// ```
    pub fn http_status_code(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Transport(d) => d.as_ref().status_code,
            ErrorKind::Service(d) => d.as_ref().status_code,
            _ => None,
        }
    }

    /// The headers, if any, associated with this error.
    ///
    /// Throttling responses include `Retry-After` headers, and most responses
    /// include an `x-ms-request-id` header useful for troubleshooting.
    pub fn http_headers(&self) -> Option<&http::HeaderMap> {
        match &self.kind {
            ErrorKind::Transport(d) => d.as_ref().headers.as_ref(),
            ErrorKind::Service(d) => d.as_ref().headers.as_ref(),
            _ => None,
        }
    }

    /// The payload, if any, associated with this error.
    ///
    /// Only set for HTTP error responses whose body is not a service error.
    pub fn http_payload(&self) -> Option<&bytes::Bytes> {
        match &self.kind {
            ErrorKind::Transport(d) => d.payload.as_ref(),
            _ => None,
        }
    }

    /// A problem reported by the transport layer.
    pub fn http(status_code: u16, headers: HeaderMap, payload: bytes::Bytes) -> Self {
        let details = TransportDetails {
            status_code: Some(status_code),
            headers: Some(headers),
            payload: Some(payload),
        };
        let kind = ErrorKind::Transport(Box::new(details));
        Self { kind, source: None }
    }

    /// A problem in the transport layer without a full HTTP response.
    ///
    /// Examples include: a broken connection after the request is sent, or a
    /// any HTTP error that did not include a status code or other headers.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        let details = TransportDetails {
            status_code: None,
            headers: None,
            payload: None,
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: Some(source.into()),
        }
    }

    /// A problem in the transport layer without a full HTTP response.
    ///
    /// # Troubleshooting
    ///
    /// This indicates a problem completing the request. This type of error is
    /// rare, but includes crashes and restarts on proxies and load balancers.
    /// Polling requests are idempotent, polling again is always safe.
    pub fn is_io(&self) -> bool {
        matches!(
        &self.kind,
        ErrorKind::Transport(d) if matches!(**d, TransportDetails {
            status_code: None,
            headers: None,
            payload: None,
            ..
        }))
    }

    /// A problem reported by the transport layer.
    pub fn transport<T: Into<BoxError>>(headers: HeaderMap, source: T) -> Self {
        let details = TransportDetails {
            headers: Some(headers),
            status_code: None,
            payload: None,
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: Some(source.into()),
        }
    }

    /// A problem in the transport layer.
    ///
    /// This includes I/O errors, and HTTP error responses that do not carry a
    /// service error payload, for example, errors generated by a proxy.
    pub fn is_transport(&self) -> bool {
        matches!(&self.kind, ErrorKind::Transport { .. })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::Serialization, Some(e)) => write!(f, "cannot serialize the value {e}"),
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response {e}")
            }
            (ErrorKind::Protocol, Some(e)) => {
                write!(
                    f,
                    "the response violates the long-running operation protocol: {e}"
                )
            }
            (ErrorKind::ResumeToken, Some(e)) => {
                write!(f, "cannot resume the long-running operation: {e}")
            }
            (ErrorKind::Timeout, Some(e)) => {
                write!(f, "the request exceeded the transport timeout {e}")
            }
            (ErrorKind::Exhausted, Some(e)) => {
                write!(f, "{e}")
            }
            (ErrorKind::NotDone, _) => {
                write!(f, "the long-running operation has not reached a terminal state")
            }
            (ErrorKind::Cancelled, _) => write!(f, "the operation context was cancelled"),
            (ErrorKind::DeadlineExceeded, _) => {
                write!(f, "the operation context deadline was exceeded")
            }
            (ErrorKind::Transport(details), _) => details.display(self.source(), f),
            (ErrorKind::Service(d), _) => {
                write!(
                    f,
                    "the service reports an error with code {} described as: {}",
                    d.detail.code, d.detail.message
                )
            }
            (ErrorKind::Operation(d), _) => match &d.detail {
                Some(detail) => write!(
                    f,
                    "the long-running operation {} with code {} described as: {}",
                    d.outcome, detail.code, detail.message
                ),
                None => write!(f, "the long-running operation {}", d.outcome),
            },
            (_, None) => write!(f, "an unclassified error"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

/// The type of error held by an [Error] instance.
#[derive(Debug)]
enum ErrorKind {
    Serialization,
    Deserialization,
    Protocol,
    ResumeToken,
    NotDone,
    Cancelled,
    DeadlineExceeded,
    Timeout,
    Exhausted,
    Transport(Box<TransportDetails>),
    Service(Box<ServiceDetails>),
    Operation(Box<OperationDetails>),
}

#[derive(Debug)]
struct TransportDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    payload: Option<bytes::Bytes>,
}

impl TransportDetails {
    fn display(
        &self,
        source: Option<&(dyn StdError + 'static)>,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match (source, &self) {
            (
                _,
                TransportDetails {
                    status_code: Some(code),
                    payload: Some(p),
                    ..
                },
            ) => {
                if let Ok(message) = std::str::from_utf8(p.as_ref()) {
                    write!(f, "the HTTP transport reports a [{code}] error: {message}")
                } else {
                    write!(f, "the HTTP transport reports a [{code}] error: {p:?}")
                }
            }
            (Some(source), _) => {
                write!(f, "the transport reports an error: {source}")
            }
            (None, _) => write!(f, "the transport reports an unknown error"),
        }
    }
}

#[derive(Debug)]
struct ServiceDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    detail: ErrorDetail,
}

#[derive(Debug)]
struct OperationDetails {
    outcome: OperationOutcome,
    detail: Option<ErrorDetail>,
}
