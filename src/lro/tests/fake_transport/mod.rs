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

use gax::Result;
use gax::error::Error;
use gax::http_client::{HttpRequest, HttpResponse, HttpTransport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A transport returning scripted responses and recording each request.
///
/// Clones share the script and the recorded requests.
#[derive(Clone, Debug, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    responses: VecDeque<Result<HttpResponse>>,
    requests: Vec<HttpRequest>,
}

impl FakeTransport {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<HttpResponse>>,
    {
        let state = State {
            responses: responses.into_iter().collect(),
            requests: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// The number of requests sent so far.
    pub fn calls(&self) -> usize {
        self.state.lock().expect("shared state is poisoned").requests.len()
    }

    /// The URLs of the requests sent so far.
    pub fn urls(&self) -> Vec<String> {
        let state = self.state.lock().expect("shared state is poisoned");
        state.requests.iter().map(|r| r.url.clone()).collect()
    }
}

impl HttpTransport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut state = self.state.lock().expect("shared state is poisoned");
        assert_eq!(request.method, http::Method::GET, "{request:?}");
        let url = request.url.clone();
        state.requests.push(request);
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(Error::io(format!("exhausted responses, request to {url}"))))
            .map(|mut r| {
                r.url = url;
                r
            })
    }
}
