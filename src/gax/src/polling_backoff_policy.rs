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

//! Defines the trait for polling backoff policies and common implementations.
//!
//! The pollers can wait until a long-running operation completes. When doing
//! so they backoff between polling attempts to avoid overloading the service.
//! A `Retry-After` header in the last response always takes precedence over
//! the policy.
//!
//! Polling backoff policies should not use jitter. The most common
//! implementations are a [fixed interval][FixedInterval] and truncated
//! [exponential backoff][crate::exponential_backoff::ExponentialBackoff].
//!
//! # Example
//! ```
//! # use arm_gax::exponential_backoff::Error;
//! # use arm_gax::exponential_backoff::ExponentialBackoffBuilder;
//! use std::time::Duration;
//!
//! let policy = ExponentialBackoffBuilder::new()
//!     .with_initial_delay(Duration::from_millis(100))
//!     .with_maximum_delay(Duration::from_secs(5))
//!     .with_scaling(4.0)
//!     .build()?;
//! // `policy` implements the `PollingBackoffPolicy` trait.
//! # Ok::<(), Error>(())
//! ```

use std::time::Duration;
use tokio::time::Instant;

/// Defines the trait implemented by all backoff strategies.
pub trait PollingBackoffPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the delay before the next polling attempt.
    ///
    /// # Parameters
    /// * `loop_start` - when the polling loop started.
    /// * `attempt_count` - the number of poll queries. This method is always
    ///   called after the first attempt.
    fn wait_period(&self, loop_start: Instant, attempt_count: u32) -> Duration;
}

/// Waits the same amount of time between all polling attempts.
///
/// # Example
/// ```
/// # use arm_gax::polling_backoff_policy::*;
/// use std::time::Duration;
/// use tokio::time::Instant;
/// let policy = FixedInterval::new(Duration::from_secs(30));
/// assert_eq!(policy.wait_period(Instant::now(), 1), Duration::from_secs(30));
/// assert_eq!(policy.wait_period(Instant::now(), 100), Duration::from_secs(30));
/// ```
#[derive(Clone, Debug)]
pub struct FixedInterval {
    period: Duration,
}

impl FixedInterval {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl PollingBackoffPolicy for FixedInterval {
    fn wait_period(&self, _loop_start: Instant, _attempt_count: u32) -> Duration {
        self.period
    }
}
