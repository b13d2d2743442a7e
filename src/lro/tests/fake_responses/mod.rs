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
use gax::http_client::{AZURE_ASYNC_OPERATION, HttpResponse};
use http::header::{HeaderValue, LOCATION};
use http::{Method, StatusCode};
use serde_json::{Value, json};

pub const RESOURCE: &str =
    "https://management.example.com/subscriptions/s1/resourceGroups/g1/providers/Example.Compute/widgets/w1?api-version=2024-01-01";
pub const OPERATION: &str =
    "https://management.example.com/subscriptions/s1/providers/Example.Compute/locations/westus/operations/op1?api-version=2024-01-01";
pub const LOCATION_URL: &str =
    "https://management.example.com/subscriptions/s1/providers/Example.Compute/locations/westus/operationResults/op1?api-version=2024-01-01";

fn header(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).expect("test URLs are valid header values")
}

/// The initial response of an operation using `Azure-AsyncOperation`.
pub fn async_operation(method: Method, code: StatusCode) -> HttpResponse {
    HttpResponse::new(method, RESOURCE, code)
        .with_header(AZURE_ASYNC_OPERATION, header(OPERATION))
}

/// The initial response of an operation using `Location`.
pub fn location(method: Method) -> HttpResponse {
    HttpResponse::new(method, RESOURCE, StatusCode::ACCEPTED)
        .with_header(LOCATION, header(LOCATION_URL))
}

/// A `200 OK` response with a JSON body.
pub fn json_body(value: Value) -> Result<HttpResponse> {
    Ok(HttpResponse::new(Method::GET, OPERATION, StatusCode::OK).with_json(&value))
}

/// An operation status body.
pub fn status(status: &str) -> Result<HttpResponse> {
    json_body(json!({"status": status}))
}

/// A response without a body.
pub fn empty(code: StatusCode) -> Result<HttpResponse> {
    Ok(HttpResponse::new(Method::GET, LOCATION_URL, code))
}

/// An example resource.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct Widget {
    pub name: String,
    #[serde(default)]
    pub properties: WidgetProperties,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetProperties {
    #[serde(default)]
    pub provisioning_state: String,
    #[serde(default)]
    pub size: u32,
}

pub fn widget(name: &str, size: u32) -> Widget {
    Widget {
        name: name.to_string(),
        properties: WidgetProperties {
            provisioning_state: "Succeeded".to_string(),
            size,
        },
    }
}

pub fn widget_json(name: &str, size: u32) -> Value {
    json!({
        "name": name,
        "properties": {"provisioningState": "Succeeded", "size": size},
    })
}
