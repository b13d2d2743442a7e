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

//! Pollers for resource-manager long-running operations (LROs).
//!
//! Many resource-manager operations (creating a virtual machine, deleting a
//! storage account) take longer than a single HTTP request. The service
//! accepts the request, and the client polls until the operation completes.
//! This crate implements the polling protocol:
//!
//! * [Poller::new] selects a polling convention from the initial response.
//! * [Poller::poll] sends one polling request and updates the status.
//! * [Poller::result] returns the final result, fetching it if needed.
//! * [Poller::until_done] polls, with backoff, until the operation completes.
//! * [Poller::resume_token] and [Poller::from_resume_token] move a poller
//!   across processes.
//!
//! # Example
//! ```no_run
//! # use arm_lro::{Poller, PollerOptions, poll_until_done};
//! # use gax::context::Context;
//! # use gax::http_client::{HttpResponse, ReqwestTransport};
//! # use std::time::Duration;
//! # async fn sample(initial: HttpResponse) -> gax::Result<()> {
//! let mut poller = Poller::<()>::new(initial, ReqwestTransport::new(), PollerOptions::default())?;
//! // Save the token to resume polling after a restart.
//! let token = poller.resume_token()?;
//! poll_until_done(&mut poller, &Context::new(), Duration::from_secs(10)).await?;
//! # Ok(()) }
//! ```

use gax::Result;
use gax::context::Context;
use gax::error::Error;
use serde::de::DeserializeOwned;
use std::time::Duration;

mod convention;
mod materialize;
mod options;
mod poller;
mod state;
mod status;
pub mod token;

pub use convention::{interpret, select};
pub use options::{FinalStateVia, PollerOptions};
pub use poller::Poller;
pub use state::{Observation, PollerState, PollingConvention};
pub use status::OperationStatus;

/// The result of polling a long-running operation.
///
/// # Parameters
/// * `T` - the result type. This is the type returned when the operation
///   completes successfully.
#[derive(Debug)]
pub enum PollingResult<T> {
    /// The operation is still in progress.
    InProgress(OperationStatus),
    /// The operation completed. This includes the result.
    Completed(Result<T>),
    /// An error trying to poll the operation.
    ///
    /// Not all errors indicate that the operation failed. For example, this
    /// may fail because it was not possible to connect to the service. Such
    /// transient errors may disappear in the next polling attempt.
    PollingError(Error),
}

/// Polls `poller` until the operation completes, waiting `frequency` between
/// requests.
///
/// This is equivalent to [Poller::until_done].
pub async fn poll_until_done<T>(
    poller: &mut Poller<T>,
    ctx: &Context,
    frequency: Duration,
) -> Result<T>
where
    T: DeserializeOwned + Default + Clone,
{
    poller.until_done(ctx, frequency).await
}
