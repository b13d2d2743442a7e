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

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// The error model used by resource-manager services.
///
/// Services return this object inside an `{"error": ...}` envelope, both for
/// failed requests and in the status body of failed long-running operations.
/// The fields are kept verbatim; the `code` is a service-defined string such
/// as `ResourceNotFound` or `Conflict`, not a numeric code.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ErrorDetail {
    /// The service-defined error code.
    pub code: String,

    /// A developer-facing error message.
    pub message: String,

    /// The target of the error, typically a property name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Nested errors, with the same shape.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,

    /// Additional, service specific, information about the error.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_info: Vec<serde_json::Value>,
}

impl ErrorDetail {
    /// Sets the value for [code][ErrorDetail::code].
    pub fn set_code<T: Into<String>>(mut self, v: T) -> Self {
        self.code = v.into();
        self
    }

    /// Sets the value for [message][ErrorDetail::message].
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }

    /// Sets the value for [target][ErrorDetail::target].
    pub fn set_target<T: Into<String>>(mut self, v: T) -> Self {
        self.target = Some(v.into());
        self
    }

    /// Sets the value for [details][ErrorDetail::details].
    pub fn set_details<T, I>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = I>,
        I: Into<ErrorDetail>,
    {
        self.details = v.into_iter().map(|v| v.into()).collect();
        self
    }
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorDetail,
}

impl TryFrom<&bytes::Bytes> for ErrorDetail {
    type Error = Error;

    fn try_from(value: &bytes::Bytes) -> Result<Self, Self::Error> {
        serde_json::from_slice::<ErrorWrapper>(value)
            .map(|w| w.error)
            .map_err(Error::deser)
    }
}

impl TryFrom<&serde_json::Value> for ErrorDetail {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        ErrorDetail::deserialize(value).map_err(Error::deser)
    }
}
