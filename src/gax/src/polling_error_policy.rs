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

//! Policies to classify errors in the polling loop.
//!
//! A poller waiting for a long-running operation sends many `GET` requests.
//! Some of them fail for reasons that go away on their own: a dropped
//! connection, a throttled request, a gateway restarting. The policies in this
//! module decide which errors stop the loop, and may also cap how long the
//! loop runs or how many requests it sends.
//!
//! Protocol violations and cancelled contexts always stop the loop. The
//! policies never see them.
//!
//! # Example
//! ```
//! # use arm_gax::polling_error_policy::*;
//! use std::time::Duration;
//! // Stop after 15 minutes or 50 requests, whichever comes first.
//! let policy = RetryTransient
//!     .with_time_limit(Duration::from_secs(15 * 60))
//!     .with_attempt_limit(50);
//! ```

use crate::error::Error;
use crate::loop_state::LoopState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Classifies the outcome of each polling request.
pub trait PollingErrorPolicy: Send + Sync + std::fmt::Debug {
    /// Called after a polling request fails.
    ///
    /// # Parameters
    /// * `loop_start` - when the polling loop started.
    /// * `attempt_count` - the number of polling requests so far, including
    ///   the one that failed. Never zero.
    /// * `error` - the error returned by the failed request.
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState;

    /// Called after a polling request succeeds but the operation is still
    /// running.
    ///
    /// Returning an error stops the loop with that error.
    fn on_in_progress(
        &self,
        _loop_start: Instant,
        _attempt_count: u32,
        _poll_url: &str,
    ) -> Option<Error> {
        None
    }
}

/// Holds a [PollingErrorPolicy] in the poller options.
#[derive(Clone, Debug)]
pub struct PollingErrorPolicyArg(Arc<dyn PollingErrorPolicy>);

impl PollingErrorPolicyArg {
    pub fn policy(&self) -> Arc<dyn PollingErrorPolicy> {
        self.0.clone()
    }
}

impl Default for PollingErrorPolicyArg {
    fn default() -> Self {
        Self(Arc::new(RetryTransient))
    }
}

impl<T> From<T> for PollingErrorPolicyArg
where
    T: PollingErrorPolicy + 'static,
{
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl From<Arc<dyn PollingErrorPolicy>> for PollingErrorPolicyArg {
    fn from(value: Arc<dyn PollingErrorPolicy>) -> Self {
        Self(value)
    }
}

/// Adds limits to any [PollingErrorPolicy].
pub trait PollingErrorPolicyExt: PollingErrorPolicy + Sized {
    /// Stops the loop once it runs for longer than `maximum_duration`.
    ///
    /// The time includes the backoff between requests. Errors the inner
    /// policy treats as permanent remain permanent.
    ///
    /// # Example
    /// ```
    /// # use arm_gax::polling_error_policy::*;
    /// # use arm_gax::error::Error;
    /// use std::time::Duration;
    /// use tokio::time::Instant;
    /// let policy = RetryTransient.with_time_limit(Duration::from_secs(60));
    /// let start = Instant::now() - Duration::from_secs(120);
    /// assert!(policy.on_error(start, 1, Error::io("reset")).is_exhausted());
    /// ```
    fn with_time_limit(self, maximum_duration: Duration) -> LimitedElapsedTime<Self> {
        LimitedElapsedTime::custom(self, maximum_duration)
    }

    /// Stops the loop after `maximum_attempts` polling requests.
    ///
    /// # Example
    /// ```
    /// # use arm_gax::polling_error_policy::*;
    /// # use arm_gax::error::Error;
    /// use tokio::time::Instant;
    /// let policy = RetryTransient.with_attempt_limit(3);
    /// let start = Instant::now();
    /// assert!(policy.on_error(start, 2, Error::io("reset")).is_continue());
    /// assert!(policy.on_error(start, 3, Error::io("reset")).is_exhausted());
    /// ```
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: PollingErrorPolicy> PollingErrorPolicyExt for T {}

/// Continues after errors that are likely to go away.
///
/// Polling requests are idempotent, so it is safe to send them again after
/// I/O errors, timeouts, and the `408`, `429`, `500`, `502`, `503` and `504`
/// status codes. Any other error is permanent.
///
/// There is no limit on the number of requests. Use
/// [PollingErrorPolicyExt], or a context with a deadline, to add one.
///
/// # Example
/// ```
/// # use arm_gax::polling_error_policy::*;
/// # use arm_gax::error::Error;
/// use tokio::time::Instant;
/// let throttled = Error::http(429, http::HeaderMap::new(), bytes::Bytes::new());
/// assert!(RetryTransient.on_error(Instant::now(), 1, throttled).is_continue());
/// let missing = Error::http(404, http::HeaderMap::new(), bytes::Bytes::new());
/// assert!(RetryTransient.on_error(Instant::now(), 1, missing).is_permanent());
/// ```
#[derive(Clone, Debug)]
pub struct RetryTransient;

impl PollingErrorPolicy for RetryTransient {
    fn on_error(&self, _loop_start: Instant, _attempt_count: u32, error: Error) -> LoopState {
        let transient = error.is_io()
            || error.is_timeout()
            || matches!(
                error.http_status_code(),
                Some(408 | 429 | 500 | 502 | 503 | 504)
            );
        if transient {
            LoopState::Continue(error)
        } else {
            LoopState::Permanent(error)
        }
    }
}

/// Continues after any error.
///
/// Combine with a limit, otherwise a permanent error keeps the loop running
/// forever.
#[derive(Clone, Debug)]
pub struct AlwaysContinue;

impl PollingErrorPolicy for AlwaysContinue {
    fn on_error(&self, _loop_start: Instant, _attempt_count: u32, error: Error) -> LoopState {
        LoopState::Continue(error)
    }
}

/// Limits the time spent in the polling loop.
///
/// # Parameters
/// * `P` - the inner policy, defaults to [RetryTransient].
#[derive(Debug)]
pub struct LimitedElapsedTime<P = RetryTransient>
where
    P: PollingErrorPolicy,
{
    inner: P,
    maximum_duration: Duration,
}

impl LimitedElapsedTime {
    pub fn new(maximum_duration: Duration) -> Self {
        Self::custom(RetryTransient, maximum_duration)
    }
}

impl<P> LimitedElapsedTime<P>
where
    P: PollingErrorPolicy,
{
    pub fn custom(inner: P, maximum_duration: Duration) -> Self {
        Self {
            inner,
            maximum_duration,
        }
    }

    fn exceeded(&self, loop_start: Instant) -> Option<Limit> {
        let elapsed = Instant::now().saturating_duration_since(loop_start);
        (elapsed >= self.maximum_duration).then_some(Limit::ElapsedTime {
            elapsed,
            maximum: self.maximum_duration,
        })
    }
}

impl<P> PollingErrorPolicy for LimitedElapsedTime<P>
where
    P: PollingErrorPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState {
        let state = self.inner.on_error(loop_start, attempt_count, error);
        state.exhaust_if(self.exceeded(loop_start).is_some())
    }

    fn on_in_progress(
        &self,
        loop_start: Instant,
        attempt_count: u32,
        poll_url: &str,
    ) -> Option<Error> {
        self.inner
            .on_in_progress(loop_start, attempt_count, poll_url)
            .or_else(|| self.exceeded(loop_start).map(|l| l.into_error(poll_url)))
    }
}

/// Limits the number of polling requests.
///
/// # Parameters
/// * `P` - the inner policy, defaults to [RetryTransient].
#[derive(Debug)]
pub struct LimitedAttemptCount<P = RetryTransient>
where
    P: PollingErrorPolicy,
{
    inner: P,
    maximum_attempts: u32,
}

impl LimitedAttemptCount {
    pub fn new(maximum_attempts: u32) -> Self {
        Self::custom(RetryTransient, maximum_attempts)
    }
}

impl<P> LimitedAttemptCount<P>
where
    P: PollingErrorPolicy,
{
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }

    fn exceeded(&self, attempt_count: u32) -> Option<Limit> {
        (attempt_count >= self.maximum_attempts).then_some(Limit::AttemptCount {
            count: attempt_count,
            maximum: self.maximum_attempts,
        })
    }
}

impl<P> PollingErrorPolicy for LimitedAttemptCount<P>
where
    P: PollingErrorPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState {
        let state = self.inner.on_error(loop_start, attempt_count, error);
        state.exhaust_if(self.exceeded(attempt_count).is_some())
    }

    fn on_in_progress(
        &self,
        loop_start: Instant,
        attempt_count: u32,
        poll_url: &str,
    ) -> Option<Error> {
        self.inner
            .on_in_progress(loop_start, attempt_count, poll_url)
            .or_else(|| self.exceeded(attempt_count).map(|l| l.into_error(poll_url)))
    }
}

#[derive(Clone, Copy, Debug)]
enum Limit {
    ElapsedTime { elapsed: Duration, maximum: Duration },
    AttemptCount { count: u32, maximum: u32 },
}

impl Limit {
    fn into_error(self, poll_url: &str) -> Error {
        Error::exhausted(Exhausted {
            poll_url: poll_url.to_string(),
            limit: self,
        })
    }
}

/// The source of errors returned when a polling loop reaches its limit.
#[derive(Debug)]
pub struct Exhausted {
    poll_url: String,
    limit: Limit,
}

impl Exhausted {
    /// The URL polled by the loop.
    pub fn poll_url(&self) -> &str {
        &self.poll_url
    }
}

impl std::fmt::Display for Exhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.limit {
            Limit::ElapsedTime { elapsed, maximum } => write!(
                f,
                "polling {} for {elapsed:?} exceeds the time limit ({maximum:?})",
                self.poll_url
            ),
            Limit::AttemptCount { count, maximum } => write!(
                f,
                "polling {} {count} times reaches the attempt count limit ({maximum})",
                self.poll_url
            ),
        }
    }
}

impl std::error::Error for Exhausted {}
