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

/// A response violated the long-running operation polling protocol.
///
/// These errors are never transient: repeating the request is expected to
/// produce the same response. A poller that observes one of these errors
/// stops polling and reports the same error on every subsequent call.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("the response has an unexpected HTTP status code {0}")]
    UnexpectedStatusCode(u16),
    #[error(
        "the 202 response does not include an Azure-AsyncOperation, Operation-Location, or Location header"
    )]
    MissingPollingHeader,
    #[error("the {header} header value {value:?} is not an absolute URL")]
    InvalidPollingUrl { header: String, value: String },
    #[error("the operation status body does not contain a `status` property")]
    MissingStatus,
    #[error("{0:?} is not a recognized operation status")]
    InvalidStatus(String),
    #[error("the operation status body is not valid JSON: {0}")]
    InvalidBody(String),
    #[error("the operation status moved backwards from {from} to {to}")]
    StatusRegression { from: String, to: String },
}

impl ProtocolError {
    /// The response contained a status value outside the known vocabulary.
    pub fn is_invalid_status(&self) -> bool {
        matches!(self, Self::InvalidStatus(_) | Self::MissingStatus)
    }
}

/// A resume token could not be turned back into a poller.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum TokenError {
    #[error("the resume token version ({got}) is not supported, expected version {want}")]
    UnsupportedVersion { got: u32, want: u32 },
    #[error("the resume token is malformed: {0}")]
    Malformed(String),
    #[error("the resume token was created for {got:?} operations, expected {want:?}")]
    KindMismatch { got: String, want: String },
}
