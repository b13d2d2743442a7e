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

use gax::error::ProtocolError;

/// The status of a long-running operation.
///
/// `Succeeded`, `Failed` and `Canceled` are terminal: once an operation
/// reaches one of them its status never changes.
///
/// # Example
/// ```
/// # use arm_lro::OperationStatus;
/// let status: OperationStatus = "succeeded".parse()?;
/// assert_eq!(status, OperationStatus::Succeeded);
/// assert!(status.is_terminal());
/// # Ok::<(), gax::error::ProtocolError>(())
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    #[default]
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    /// The canonical name, as used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }

    /// Returns true for `Succeeded`, `Failed` and `Canceled`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Returns true for `Succeeded`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Running => 1,
            Self::Succeeded | Self::Failed | Self::Canceled => 2,
        }
    }

    /// Returns true if an operation in this status may be observed in `next`.
    ///
    /// Statuses only move forward. A terminal status only allows itself.
    pub(crate) fn may_become(&self, next: OperationStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for OperationStatus {
    type Err = ProtocolError;

    /// Parses a status value, ignoring case.
    ///
    /// Besides the canonical names, services use a few well-known spellings
    /// for in-progress operations (`InProgress`, `Accepted`, `Creating`,
    /// `Updating`, `Deleting`) and `Cancelled` for canceled operations.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let status = match value.to_ascii_lowercase().as_str() {
            "notstarted" => Self::NotStarted,
            "running" | "inprogress" | "accepted" | "creating" | "updating" | "deleting" => {
                Self::Running
            }
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => return Err(ProtocolError::InvalidStatus(value.to_string())),
        };
        Ok(status)
    }
}
