// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP transport seam.
//!
//! The pipeline fetches bytes by URL with an optional bearer token and a
//! content-type expectation; everything else about HTTP is hidden behind the
//! [`Transport`] trait so tests can substitute canned responses.
//!
//! Failure classes are deliberately split: a non-2xx status or a socket-level
//! failure is [`OnboardError::Unreachable`] (retryable), while a response
//! whose declared content-type falls outside the accepted set is an
//! [`OnboardError::InvalidContentType`] (not retryable without a different
//! endpoint). Callers branch on this for user messaging and retry policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::error::{OnboardError, Result};

/// Common content-type strings used by the pipeline.
pub mod content_types {
    /// Discovery directory and geolocation responses.
    pub const JSON: &str = "application/json";
    /// Configuration bundles.
    pub const EAP_CONFIG: &str = "application/eap-config";
    /// Configuration bundles served by older directories.
    pub const XML: &str = "application/xml";
}

/// Fetch bytes by URL.
///
/// Cancellation is cooperative: dropping the returned future abandons the
/// request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the resource at `url`.
    ///
    /// `accepted_content_types` lists acceptable media types (matched on the
    /// essence, ignoring parameters); an empty slice accepts anything.
    /// `bearer_token` is attached as an `Authorization: Bearer` header when
    /// present.
    async fn fetch(
        &self,
        url: &Url,
        accepted_content_types: &[&str],
        bearer_token: Option<&str>,
    ) -> Result<Vec<u8>>;
}

/// Production transport over reqwest with rustls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| OnboardError::unreachable(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &Url,
        accepted_content_types: &[&str],
        bearer_token: Option<&str>,
    ) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);

        let mut request = self.http.get(url.clone());
        if let Some(token) = bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| OnboardError::unreachable(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OnboardError::unreachable(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        if !accepted_content_types.is_empty() {
            let actual = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            check_content_type(&actual, accepted_content_types)?;
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| OnboardError::unreachable(format!("{}: {}", url, e)))?;

        Ok(body.to_vec())
    }
}

/// Match a Content-Type header against the accepted set on its essence,
/// ignoring parameters such as `charset`.
pub(crate) fn check_content_type(actual: &str, accepted: &[&str]) -> Result<()> {
    let essence = actual
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if accepted.iter().any(|a| a.eq_ignore_ascii_case(&essence)) {
        return Ok(());
    }

    Err(OnboardError::invalid_content_type(
        accepted.join(", "),
        actual,
    ))
}
