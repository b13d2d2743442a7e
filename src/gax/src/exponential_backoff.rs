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

//! Truncated exponential backoff between polling requests.
//!
//! The first delay is `initial_delay`. Each following delay is `scaling`
//! times longer than the previous one, never exceeding `maximum_delay`.
//! Polling loops for different operations do not compete with each other, so
//! there is no jitter.

use crate::polling_backoff_policy::PollingBackoffPolicy;
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAXIMUM_DELAY: Duration = Duration::from_secs(60);
const DEFAULT_SCALING: f64 = 2.0;

/// Invalid [ExponentialBackoffBuilder] parameters.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("the scaling factor ({0}) must be at least 1.0")]
    InvalidScalingFactor(f64),
    #[error("the initial delay must be greater than zero")]
    InvalidInitialDelay,
    #[error("the maximum delay ({maximum:?}) is shorter than the initial delay ({initial:?})")]
    EmptyRange { initial: Duration, maximum: Duration },
}

/// Configures an [ExponentialBackoff].
///
/// The defaults start at one second and double the delay after each request,
/// up to one minute.
///
/// # Example
/// ```
/// # use arm_gax::exponential_backoff::{Error, ExponentialBackoffBuilder};
/// # use arm_gax::polling_backoff_policy::PollingBackoffPolicy;
/// use std::time::Duration;
/// use tokio::time::Instant;
/// let backoff = ExponentialBackoffBuilder::new()
///     .with_initial_delay(Duration::from_secs(5))
///     .with_maximum_delay(Duration::from_secs(30))
///     .build()?;
/// let start = Instant::now();
/// assert_eq!(backoff.wait_period(start, 1), Duration::from_secs(5));
/// assert_eq!(backoff.wait_period(start, 2), Duration::from_secs(10));
/// assert_eq!(backoff.wait_period(start, 9), Duration::from_secs(30));
/// # Ok::<(), Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl ExponentialBackoffBuilder {
    pub fn new() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            maximum_delay: DEFAULT_MAXIMUM_DELAY,
            scaling: DEFAULT_SCALING,
        }
    }

    pub fn with_initial_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial_delay = v.into();
        self
    }

    pub fn with_maximum_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.maximum_delay = v.into();
        self
    }

    pub fn with_scaling<V: Into<f64>>(mut self, v: V) -> Self {
        self.scaling = v.into();
        self
    }

    /// Validates the parameters and creates the policy.
    pub fn build(self) -> Result<ExponentialBackoff, Error> {
        if self.scaling.is_nan() || self.scaling < 1.0 {
            return Err(Error::InvalidScalingFactor(self.scaling));
        }
        if self.initial_delay.is_zero() {
            return Err(Error::InvalidInitialDelay);
        }
        if self.maximum_delay < self.initial_delay {
            return Err(Error::EmptyRange {
                initial: self.initial_delay,
                maximum: self.maximum_delay,
            });
        }
        Ok(self.into_policy())
    }

    /// Creates the policy, moving invalid parameters into range.
    ///
    /// The maximum delay is kept between one second and one day, the initial
    /// delay between one millisecond and the maximum delay, and the scaling
    /// factor between 1.0 and 32.0.
    pub fn clamp(self) -> ExponentialBackoff {
        let maximum_delay = self
            .maximum_delay
            .clamp(Duration::from_secs(1), Duration::from_secs(24 * 60 * 60));
        let scaling = if self.scaling.is_nan() {
            DEFAULT_SCALING
        } else {
            self.scaling.clamp(1.0, 32.0)
        };
        Self {
            initial_delay: self
                .initial_delay
                .clamp(Duration::from_millis(1), maximum_delay),
            maximum_delay,
            scaling,
        }
        .into_policy()
    }

    fn into_policy(self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_delay: self.initial_delay,
            maximum_delay: self.maximum_delay,
            scaling: self.scaling,
        }
    }
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncated exponential backoff, without jitter.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        ExponentialBackoffBuilder::new().clamp()
    }
}

impl PollingBackoffPolicy for ExponentialBackoff {
    fn wait_period(&self, _loop_start: Instant, attempt_count: u32) -> Duration {
        let exponent = attempt_count.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.scaling.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map(|d| d.min(self.maximum_delay))
            .unwrap_or(self.maximum_delay)
    }
}
