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

//! The decisions of polling error policies.
//!
//! Only applications implementing their own
//! [PollingErrorPolicy][crate::polling_error_policy::PollingErrorPolicy] need
//! these types.

use crate::error::Error;

/// What the polling loop should do after an error.
#[derive(Debug)]
pub enum LoopState {
    /// The error will not go away, stop polling.
    Permanent(Error),

    /// The error may go away, but the loop reached one of its limits.
    Exhausted(Error),

    /// The error may go away, send another polling request.
    Continue(Error),
}

impl LoopState {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// Turns [Continue][LoopState::Continue] into
    /// [Exhausted][LoopState::Exhausted] when `limit_reached` is true.
    ///
    /// Other decisions are returned unchanged.
    pub fn exhaust_if(self, limit_reached: bool) -> Self {
        match self {
            Self::Continue(e) if limit_reached => Self::Exhausted(e),
            other => other,
        }
    }

    /// The error, regardless of the decision.
    pub fn into_error(self) -> Error {
        match self {
            Self::Permanent(e) | Self::Exhausted(e) | Self::Continue(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LoopState::Permanent(forbidden()), true, false, false; "permanent")]
    #[test_case(LoopState::Exhausted(reset()), false, true, false; "exhausted")]
    #[test_case(LoopState::Continue(reset()), false, false, true; "continue")]
    fn predicates(state: LoopState, permanent: bool, exhausted: bool, cont: bool) {
        assert_eq!(state.is_permanent(), permanent, "{state:?}");
        assert_eq!(state.is_exhausted(), exhausted, "{state:?}");
        assert_eq!(state.is_continue(), cont, "{state:?}");
    }

    #[test]
    fn exhaust_if() {
        assert!(LoopState::Continue(reset()).exhaust_if(true).is_exhausted());
        assert!(LoopState::Continue(reset()).exhaust_if(false).is_continue());
        assert!(LoopState::Permanent(forbidden()).exhaust_if(true).is_permanent());
        assert!(LoopState::Exhausted(reset()).exhaust_if(false).is_exhausted());
    }

    #[test]
    fn into_error() {
        let err = LoopState::Continue(reset()).into_error();
        assert!(err.is_io(), "{err:?}");
        let err = LoopState::Permanent(forbidden()).into_error();
        assert_eq!(err.http_status_code(), Some(403));
    }

    fn forbidden() -> Error {
        Error::http(403, http::HeaderMap::new(), bytes::Bytes::new())
    }

    fn reset() -> Error {
        Error::io("connection reset")
    }
}
