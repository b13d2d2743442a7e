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

//! Cancellation and deadlines.
//!
//! Every suspension point in a poller (the HTTP request and the sleep between
//! polling attempts) observes a [Context]. Cancelling the context, or letting
//! its deadline expire, makes the pending call return promptly with an error.
//!
//! # Example
//! ```
//! # use arm_gax::context::Context;
//! use std::time::Duration;
//! let ctx = Context::new().with_timeout(Duration::from_secs(30));
//! let child = ctx.clone();
//! ctx.cancel();
//! assert!(child.check().is_err());
//! ```

use crate::Result;
use crate::error::Error;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A cancellation token with an optional deadline.
///
/// Clones share the same cancellation token: cancelling any clone cancels
/// all of them.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context without a deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a deadline relative to the current time.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets the deadline.
    ///
    /// If the context already has a deadline the earliest of the two is used.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(d) => d.min(deadline),
            None => deadline,
        });
        self
    }

    /// Uses an existing token to cancel the context.
    ///
    /// Applications that already use [CancellationToken] to stop their tasks
    /// can use the same token (or a [child token]) to stop any pollers.
    ///
    /// [child token]: CancellationToken::child_token
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cancels this context and all its clones.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The context deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns an error if the context is cancelled or expired.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::cancelled());
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(Error::deadline_exceeded()),
            _ => Ok(()),
        }
    }

    /// Runs `fut` until it completes, the context is cancelled, or the
    /// deadline expires.
    ///
    /// If the context stops first `fut` is dropped.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        let deadline = self.deadline_future();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::cancelled()),
            _ = deadline => Err(Error::deadline_exceeded()),
            r = fut => r,
        }
    }

    /// Sleeps for `period`, returning early with an error if the context
    /// stops.
    pub async fn sleep(&self, period: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(period).await;
            Ok(())
        })
        .await
    }

    async fn deadline_future(&self) {
        match self.deadline {
            Some(d) => tokio::time::sleep_until(d).await,
            None => std::future::pending::<()>().await,
        }
    }
}
