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

//! Resource-manager REST helpers.
//!
//! This crate contains the types shared by the long-running operation pollers
//! in `arm-lro`: the error type, the cancellation context, the HTTP transport
//! abstraction, and the policies that control polling loops.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
///
/// This is the result type used by all functions that talk to the service.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The core error types.
pub mod error;

/// Cancellation and deadlines for operations that suspend.
pub mod context;

/// Defines traits and helpers for HTTP client implementations.
pub mod http_client;

pub mod exponential_backoff;
pub mod loop_state;
pub mod polling_backoff_policy;
pub mod polling_error_policy;
