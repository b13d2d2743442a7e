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

use gax::polling_error_policy::{PollingErrorPolicy, PollingErrorPolicyArg};
use std::sync::Arc;

/// Where the final result of an operation is fetched from.
///
/// Services document this as `final-state-via` in their API descriptions.
/// Without an override the pollers use the defaults for each polling
/// convention and HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalStateVia {
    /// The final result is the operation status resource itself.
    AzureAsyncOperation,
    /// The final result is fetched from the `Location` header of the initial
    /// response.
    Location,
    /// The final result is fetched from the URL of the initial request.
    OriginalUri,
}

/// Configures a [Poller][crate::Poller].
///
/// # Example
/// ```
/// # use arm_lro::{FinalStateVia, PollerOptions};
/// use gax::polling_error_policy::LimitedAttemptCount;
/// let options = PollerOptions::default()
///     .with_final_state_via(FinalStateVia::Location)
///     .with_polling_error_policy(LimitedAttemptCount::new(5))
///     .with_operation_kind("virtualMachines/delete");
/// assert_eq!(options.final_state_via(), Some(FinalStateVia::Location));
/// assert_eq!(options.operation_kind(), "virtualMachines/delete");
/// ```
#[derive(Clone, Debug, Default)]
pub struct PollerOptions {
    final_state_via: Option<FinalStateVia>,
    polling_error_policy: PollingErrorPolicyArg,
    operation_kind: String,
}

impl PollerOptions {
    /// Overrides where the final result is fetched from.
    pub fn with_final_state_via(mut self, v: FinalStateVia) -> Self {
        self.final_state_via = Some(v);
        self
    }

    /// Sets the policy deciding which polling errors are retried by
    /// [until_done][crate::Poller::until_done].
    pub fn with_polling_error_policy<V: Into<PollingErrorPolicyArg>>(mut self, v: V) -> Self {
        self.polling_error_policy = v.into();
        self
    }

    /// Tags resume tokens with the kind of operation.
    ///
    /// A token can only resume a poller configured with the same kind.
    pub fn with_operation_kind<V: Into<String>>(mut self, v: V) -> Self {
        self.operation_kind = v.into();
        self
    }

    /// The configured final-state-via override, if any.
    pub fn final_state_via(&self) -> Option<FinalStateVia> {
        self.final_state_via
    }

    /// The policy that classifies polling errors.
    pub fn polling_error_policy(&self) -> Arc<dyn PollingErrorPolicy> {
        self.polling_error_policy.policy()
    }

    /// The kind recorded in (and required of) resume tokens.
    pub fn operation_kind(&self) -> &str {
        &self.operation_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gax::error::Error;
    use gax::loop_state::LoopState;
    use gax::polling_error_policy::AlwaysContinue;
    use tokio::time::Instant;

    #[test]
    fn defaults() {
        let options = PollerOptions::default();
        assert_eq!(options.final_state_via(), None);
        assert_eq!(options.operation_kind(), "");
        // The default policy gives up on permanent errors.
        let state = options
            .polling_error_policy()
            .on_error(Instant::now(), 1, Error::deser("bad"));
        assert!(matches!(state, LoopState::Permanent(_)), "{state:?}");
    }

    #[test]
    fn setters() {
        let options = PollerOptions::default()
            .with_final_state_via(FinalStateVia::OriginalUri)
            .with_polling_error_policy(AlwaysContinue)
            .with_operation_kind("kind");
        assert_eq!(options.final_state_via(), Some(FinalStateVia::OriginalUri));
        assert_eq!(options.operation_kind(), "kind");
        let state = options
            .polling_error_policy()
            .on_error(Instant::now(), 1, Error::deser("bad"));
        assert!(matches!(state, LoopState::Continue(_)), "{state:?}");
    }
}
