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

use crate::state::PollerState;
use crate::{OperationStatus, PollerOptions, convention, materialize, token};
use gax::Result;
use gax::context::Context;
use gax::error::{Error, OperationOutcome, ProtocolError};
use gax::http_client::{HttpRequest, HttpResponse, HttpTransport, dynamic, to_http_error};
use gax::loop_state::LoopState;
use gax::polling_backoff_policy::{FixedInterval, PollingBackoffPolicy};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Tracks a resource-manager long-running operation.
///
/// A poller is created from the initial response of the request that
/// started the operation, or from a resume token. Each call to
/// [poll][Poller::poll] sends one request to the service, and updates the
/// status of the operation. Once the operation completes,
/// [result][Poller::result] returns its final result.
///
/// Pollers are not synchronized: [poll][Poller::poll] and
/// [result][Poller::result] require exclusive access. Resume tokens can be
/// created from a shared reference.
///
/// # Parameters
/// * `T` - the type of the final result. Operations without a result can use
///   `()`, or any type where the default value is acceptable for an empty
///   response.
///
/// # Example
/// ```no_run
/// # use arm_lro::{Poller, PollerOptions};
/// # use gax::context::Context;
/// # use gax::http_client::{HttpResponse, ReqwestTransport};
/// # use std::time::Duration;
/// # #[derive(Clone, Debug, Default, serde::Deserialize)]
/// # struct VirtualMachine { name: String }
/// # async fn sample(initial: HttpResponse) -> gax::Result<()> {
/// let mut poller = Poller::<VirtualMachine>::new(
///     initial,
///     ReqwestTransport::new(),
///     PollerOptions::default(),
/// )?;
/// let vm = poller
///     .until_done(&Context::new(), Duration::from_secs(30))
///     .await?;
/// println!("created {vm:?}");
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Poller<T> {
    transport: Arc<dyn dynamic::HttpTransport>,
    options: PollerOptions,
    state: PollerState,
    last_response: Option<HttpResponse>,
    retry_after: Option<Duration>,
    poisoned: Option<ProtocolError>,
    result: Option<T>,
}

impl<T> Poller<T>
where
    T: DeserializeOwned + Default + Clone,
{
    /// Creates a poller from the initial response of an operation.
    ///
    /// Fails if the response is an error, or if it does not follow any of
    /// the polling conventions.
    pub fn new<R>(initial: HttpResponse, transport: R, options: PollerOptions) -> Result<Self>
    where
        R: HttpTransport + 'static,
    {
        let state = convention::select(&initial)?;
        let retry_after = initial.retry_after();
        Ok(Self {
            transport: Arc::new(transport),
            options,
            state,
            last_response: Some(initial),
            retry_after,
            poisoned: None,
            result: None,
        })
    }

    /// Recreates a poller from a resume token.
    ///
    /// The token must have been created by a poller configured with the same
    /// [operation kind][PollerOptions::with_operation_kind]. The new poller
    /// sends its next request to the URL recorded in the token.
    pub fn from_resume_token<R>(token: &str, transport: R, options: PollerOptions) -> Result<Self>
    where
        R: HttpTransport + 'static,
    {
        let state = token::decode(token, options.operation_kind())?;
        Ok(Self {
            transport: Arc::new(transport),
            options,
            state,
            last_response: None,
            retry_after: None,
            poisoned: None,
            result: None,
        })
    }

    /// Returns true once the operation reached a terminal status.
    pub fn done(&self) -> bool {
        self.state.status().is_terminal()
    }

    /// The last observed status.
    pub fn status(&self) -> OperationStatus {
        self.state.status()
    }

    /// The polling state, as captured by resume tokens.
    pub fn state(&self) -> &PollerState {
        &self.state
    }

    /// The delay requested by the service in its last response, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Sends one polling request and updates the status.
    ///
    /// Does nothing once the operation is done. Transport and service errors
    /// leave the status unchanged, a later call may succeed. Protocol errors
    /// are permanent: this and all future calls return the same error
    /// without sending any requests.
    #[tracing::instrument(level = "debug", skip_all, fields(url = %self.state.poll_url()))]
    pub async fn poll(&mut self, ctx: &Context) -> Result<()> {
        if let Some(e) = &self.poisoned {
            return Err(Error::protocol(e.clone()));
        }
        if self.done() {
            return Ok(());
        }
        ctx.check()?;
        let request = HttpRequest::get(self.state.poll_url());
        let response = match ctx.run(self.transport.execute(request)).await {
            Ok(r) => r,
            Err(e) => {
                self.retry_after = None;
                return Err(e);
            }
        };
        self.retry_after = response.retry_after();
        if !response.status.is_success() {
            tracing::debug!(status = %response.status, "polling request failed");
            return Err(to_http_error(&response));
        }
        let applied = convention::interpret(&self.state, &response)
            .and_then(|observation| self.state.apply(observation));
        if let Err(e) = applied {
            tracing::warn!("stopped polling: {e}");
            self.retry_after = None;
            self.poisoned = Some(e.clone());
            return Err(Error::protocol(e));
        }
        tracing::debug!(status = %self.state.status(), "polled operation");
        self.last_response = Some(response);
        Ok(())
    }

    /// Returns the final result of the operation.
    ///
    /// Fails with a [not done][Error::is_not_done] error while the operation
    /// is in progress, and with an [operation failure][Error::is_operation_failure]
    /// if the operation failed or was canceled.
    ///
    /// The result may require a request to the service. It is fetched at
    /// most once: later calls return a copy of the same value.
    #[tracing::instrument(level = "debug", skip_all, fields(status = %self.state.status()))]
    pub async fn result(&mut self, ctx: &Context) -> Result<T> {
        if let Some(v) = &self.result {
            return Ok(v.clone());
        }
        if let Some(e) = &self.poisoned {
            return Err(Error::protocol(e.clone()));
        }
        let outcome = match self.state.status() {
            OperationStatus::NotStarted | OperationStatus::Running => {
                return Err(Error::not_done());
            }
            OperationStatus::Failed => OperationOutcome::Failed,
            OperationStatus::Canceled => OperationOutcome::Canceled,
            OperationStatus::Succeeded => {
                let value = materialize::materialize::<T>(
                    &self.state,
                    self.last_response.as_ref(),
                    self.options.final_state_via(),
                    self.transport.as_ref(),
                    ctx,
                )
                .await?;
                self.result = Some(value.clone());
                return Ok(value);
            }
        };
        Err(Error::operation(outcome, self.state.error().cloned()))
    }

    /// Creates a token to resume polling from a different poller.
    pub fn resume_token(&self) -> Result<String> {
        token::encode(&self.state, self.options.operation_kind())
    }

    /// Polls until the operation completes, waiting `frequency` between
    /// requests.
    ///
    /// A `Retry-After` header in a response takes precedence over
    /// `frequency`.
    pub async fn until_done(&mut self, ctx: &Context, frequency: Duration) -> Result<T> {
        self.until_done_with_backoff(ctx, &FixedInterval::new(frequency))
            .await
    }

    /// Polls until the operation completes, using `backoff` between
    /// requests.
    ///
    /// Errors are handled by the polling error policy in the poller options.
    /// Protocol errors, cancellation and expired deadlines stop the loop
    /// immediately.
    #[tracing::instrument(level = "debug", skip_all, fields(resource = %self.state.resource_url()))]
    pub async fn until_done_with_backoff<B>(&mut self, ctx: &Context, backoff: &B) -> Result<T>
    where
        B: PollingBackoffPolicy + ?Sized,
    {
        if let Some(e) = &self.poisoned {
            return Err(Error::protocol(e.clone()));
        }
        ctx.check()?;
        let error_policy = self.options.polling_error_policy();
        let loop_start = Instant::now();
        let mut attempt_count = 0_u32;
        if let Some(delay) = self.retry_after.filter(|_| !self.done()) {
            ctx.sleep(delay).await?;
        }
        while !self.done() {
            attempt_count = attempt_count.saturating_add(1);
            match self.poll(ctx).await {
                Ok(()) if self.done() => break,
                Ok(()) => {
                    if let Some(e) = error_policy.on_in_progress(
                        loop_start,
                        attempt_count,
                        self.state.poll_url(),
                    ) {
                        return Err(e);
                    }
                }
                Err(e) if e.is_protocol() || e.is_context() => return Err(e),
                Err(e) => match error_policy.on_error(loop_start, attempt_count, e) {
                    LoopState::Continue(e) => {
                        tracing::debug!(attempt_count, "polling error, will retry: {e}");
                    }
                    LoopState::Permanent(e) | LoopState::Exhausted(e) => return Err(e),
                },
            }
            let delay = match self.retry_after {
                Some(d) => {
                    tracing::debug!(delay = ?d, "waiting as requested by Retry-After");
                    d
                }
                None => backoff.wait_period(loop_start, attempt_count),
            };
            ctx.sleep(delay).await?;
        }
        self.result(ctx).await
    }

    /// Converts the poller into a stream of polling results.
    ///
    /// Each item is the result of one polling request. The stream ends after
    /// it yields [Completed][crate::PollingResult::Completed]. Errors are
    /// classified by the polling error policy in the poller options.
    ///
    /// The stream does not wait between requests, the application controls
    /// how often the stream is polled.
    #[cfg(feature = "unstable-stream")]
    pub fn into_stream(
        self,
        ctx: Context,
    ) -> impl futures::Stream<Item = crate::PollingResult<T>> + Unpin {
        use crate::PollingResult;
        use futures::stream::unfold;
        let error_policy = self.options.polling_error_policy();
        let loop_start = Instant::now();
        Box::pin(unfold(Some((self, 0_u32)), move |state| {
            let ctx = ctx.clone();
            let error_policy = error_policy.clone();
            async move {
                let (mut poller, attempt_count) = state?;
                let attempt_count = attempt_count.saturating_add(1);
                let item = match poller.poll(&ctx).await {
                    Ok(()) if poller.done() => {
                        return Some((PollingResult::Completed(poller.result(&ctx).await), None));
                    }
                    Ok(()) => match error_policy.on_in_progress(
                        loop_start,
                        attempt_count,
                        poller.state.poll_url(),
                    ) {
                        Some(e) => return Some((PollingResult::Completed(Err(e)), None)),
                        None => PollingResult::InProgress(poller.status()),
                    },
                    Err(e) if e.is_protocol() || e.is_context() => {
                        return Some((PollingResult::Completed(Err(e)), None));
                    }
                    Err(e) => match error_policy.on_error(loop_start, attempt_count, e) {
                        LoopState::Continue(e) => PollingResult::PollingError(e),
                        LoopState::Permanent(e) | LoopState::Exhausted(e) => {
                            return Some((PollingResult::Completed(Err(e)), None));
                        }
                    },
                };
                Some((item, Some((poller, attempt_count))))
            }
        }))
    }
}
