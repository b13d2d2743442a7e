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

use crate::OperationStatus;
use gax::error::ProtocolError;
use gax::error::arm::ErrorDetail;
use http::Method;

/// How the progress of a long-running operation is tracked.
///
/// The convention is selected once, from the initial response, and never
/// changes for the lifetime of a poller.
#[derive(Clone, Debug, PartialEq)]
pub enum PollingConvention {
    /// An `Azure-AsyncOperation` (or `Operation-Location`) header names an
    /// operation status resource. Its body contains a `status` property.
    AsyncOperation {
        /// The operation status URL.
        poll_url: String,
        /// The `Location` header of the initial response, if any. It may be
        /// used to fetch the final result.
        location: Option<String>,
    },
    /// A `Location` header names a URL that returns `202 Accepted` until the
    /// operation completes.
    Location {
        /// The URL to poll.
        poll_url: String,
    },
    /// The resource itself is polled, its `properties.provisioningState`
    /// contains the status.
    Body,
}

/// The status of a poller, as recorded in resume tokens.
#[derive(Clone, Debug, PartialEq)]
pub struct PollerState {
    pub(crate) convention: PollingConvention,
    pub(crate) method: Method,
    pub(crate) status: OperationStatus,
    pub(crate) resource_url: String,
    pub(crate) result_url: Option<String>,
    pub(crate) error: Option<ErrorDetail>,
}

impl PollerState {
    pub(crate) fn new(
        convention: PollingConvention,
        method: Method,
        status: OperationStatus,
        resource_url: String,
    ) -> Self {
        Self {
            convention,
            method,
            status,
            resource_url,
            result_url: None,
            error: None,
        }
    }

    /// The polling convention.
    pub fn convention(&self) -> &PollingConvention {
        &self.convention
    }

    /// The HTTP method of the request that started the operation.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The last observed status.
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// The URL of the request that started the operation.
    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// The final result URL reported by the service, if any.
    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    /// The error reported by the service for failed operations.
    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }

    /// The URL the next poll request is sent to.
    pub fn poll_url(&self) -> &str {
        match &self.convention {
            PollingConvention::AsyncOperation { poll_url, .. } => poll_url,
            PollingConvention::Location { poll_url } => poll_url,
            PollingConvention::Body => &self.resource_url,
        }
    }

    /// Applies an interpreted polling response.
    ///
    /// On error the state is left unchanged.
    pub(crate) fn apply(&mut self, observation: Observation) -> Result<(), ProtocolError> {
        if !self.status.may_become(observation.status) {
            return Err(ProtocolError::StatusRegression {
                from: self.status.to_string(),
                to: observation.status.to_string(),
            });
        }
        if let Some(url) = observation.poll_url {
            match &mut self.convention {
                PollingConvention::AsyncOperation { poll_url, .. }
                | PollingConvention::Location { poll_url } => *poll_url = url,
                PollingConvention::Body => {}
            }
        }
        if observation.result_url.is_some() {
            self.result_url = observation.result_url;
        }
        if observation.error.is_some() {
            self.error = observation.error;
        }
        self.status = observation.status;
        Ok(())
    }
}

/// The information extracted from a single polling response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    /// The operation status.
    pub status: OperationStatus,
    /// A new URL to poll, if the response supplied one.
    pub poll_url: Option<String>,
    /// The final result URL, if the response supplied one.
    pub result_url: Option<String>,
    /// The error reported for a failed operation.
    pub error: Option<ErrorDetail>,
}
