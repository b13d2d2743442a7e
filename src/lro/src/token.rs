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

//! Resume tokens for long-running operations.
//!
//! A resume token is an opaque, URL-safe string. It captures enough state to
//! continue polling an operation from a different process. The format is
//! versioned: tokens from a newer (or older) format are rejected with an
//! error instead of being misinterpreted.
//!
//! The token is the unpadded, URL-safe base64 encoding of a JSON object:
//!
//! ```json
//! {
//!   "version": 1,
//!   "kind": "...",
//!   "method": "PUT",
//!   "status": "Running",
//!   "convention": {"type": "asyncOperation", "pollUrl": "...", "location": "..."},
//!   "resourceUrl": "...",
//!   "resultUrl": "...",
//!   "error": {...}
//! }
//! ```

use crate::OperationStatus;
use crate::state::{PollerState, PollingConvention};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gax::Result;
use gax::error::arm::ErrorDetail;
use gax::error::{Error, TokenError};
use http::Method;
use serde::{Deserialize, Serialize};

/// The current (and only) token format version.
pub const VERSION: u32 = 1;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Token {
    version: u32,
    kind: String,
    method: String,
    status: String,
    convention: Convention,
    resource_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum Convention {
    AsyncOperation {
        poll_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    Location {
        poll_url: String,
    },
    Body,
}

/// Only the version is parsed before the format is known.
#[derive(Deserialize)]
struct Versioned {
    version: u32,
}

/// Encodes the state of a poller as a resume token.
pub fn encode(state: &PollerState, kind: &str) -> Result<String> {
    let convention = match &state.convention {
        PollingConvention::AsyncOperation { poll_url, location } => Convention::AsyncOperation {
            poll_url: poll_url.clone(),
            location: location.clone(),
        },
        PollingConvention::Location { poll_url } => Convention::Location {
            poll_url: poll_url.clone(),
        },
        PollingConvention::Body => Convention::Body,
    };
    let token = Token {
        version: VERSION,
        kind: kind.to_string(),
        method: state.method.to_string(),
        status: state.status.name().to_string(),
        convention,
        resource_url: state.resource_url.clone(),
        result_url: state.result_url.clone(),
        error: state.error.clone(),
    };
    let json = serde_json::to_vec(&token).map_err(Error::ser)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a resume token, verifying it was created for `kind` operations.
pub fn decode(token: &str, kind: &str) -> Result<PollerState> {
    let json = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| malformed(format!("invalid encoding: {e}")))?;
    let versioned = serde_json::from_slice::<Versioned>(&json)
        .map_err(|e| malformed(format!("missing version: {e}")))?;
    if versioned.version != VERSION {
        return Err(Error::resume_token(TokenError::UnsupportedVersion {
            got: versioned.version,
            want: VERSION,
        }));
    }
    let token = serde_json::from_slice::<Token>(&json).map_err(|e| malformed(e.to_string()))?;
    if token.kind != kind {
        return Err(Error::resume_token(TokenError::KindMismatch {
            got: token.kind,
            want: kind.to_string(),
        }));
    }

    let method = Method::from_bytes(token.method.as_bytes())
        .map_err(|_| malformed(format!("invalid method {:?}", token.method)))?;
    let status = token
        .status
        .parse::<OperationStatus>()
        .map_err(|e| malformed(e.to_string()))?;
    let convention = match token.convention {
        Convention::AsyncOperation { poll_url, location } => {
            check_url(&poll_url)?;
            if let Some(l) = &location {
                check_url(l)?;
            }
            PollingConvention::AsyncOperation { poll_url, location }
        }
        Convention::Location { poll_url } => {
            check_url(&poll_url)?;
            PollingConvention::Location { poll_url }
        }
        Convention::Body => PollingConvention::Body,
    };
    check_url(&token.resource_url)?;
    if let Some(u) = &token.result_url {
        check_url(u)?;
    }

    let mut state = PollerState::new(convention, method, status, token.resource_url);
    state.result_url = token.result_url;
    state.error = token.error;
    Ok(state)
}

fn check_url(value: &str) -> Result<()> {
    match url::Url::parse(value) {
        Ok(url) if !url.cannot_be_a_base() => Ok(()),
        _ => Err(malformed(format!("{value:?} is not an absolute URL"))),
    }
}

fn malformed(msg: String) -> Error {
    Error::resume_token(TokenError::Malformed(msg))
}
