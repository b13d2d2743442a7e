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

mod core_error;
pub use core_error::*;
mod protocol;
pub use protocol::{ProtocolError, TokenError};

/// Error details returned by resource-manager services.
///
/// Resource-manager services report errors using a JSON body of the form
/// `{"error": {"code": "...", "message": "...", ...}}`. The same object
/// appears in the `error` field of operation status bodies when a long-running
/// operation fails.
///
/// # Examples
///
/// ```
/// # use arm_gax::error;
/// use error::Error;
/// fn handle_error(e: Error) {
///     if let Some(detail) = e.detail() {
///         println!("the service reported {} ({})", detail.message, detail.code)
///     }
/// }
/// ```
pub mod arm;
