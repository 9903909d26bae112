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

//! Institution and profile discovery.
//!
//! Fetches the directory of institutions once per client lifetime and
//! answers profile lookups from the cached copy. The fetch is single-flight:
//! concurrent callers requesting the directory while a fetch is in progress
//! wait on that same fetch rather than issuing duplicates, and a grace
//! timeout bounds how long a late joiner waits for the slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use url::Url;

use crate::error::{OnboardError, Result};
use crate::geo::{DeviceLocation, ProximityResolver};
use crate::transport::{content_types, Transport};
use crate::types::{DiscoveryDirectory, Institution, InstitutionProfile};

/// Configuration for a discovery session.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Directory endpoint.
    pub directory_url: Url,
    /// How long a late joiner waits for an in-flight fetch before giving up.
    pub join_grace: Duration,
}

impl DiscoveryConfig {
    /// Create a configuration builder.
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::default()
    }
}

/// Builder for [`DiscoveryConfig`].
#[derive(Debug, Default)]
pub struct DiscoveryConfigBuilder {
    directory_url: Option<Url>,
    join_grace: Option<Duration>,
}

impl DiscoveryConfigBuilder {
    /// Set the directory endpoint.
    pub fn directory_url(mut self, url: &str) -> Result<Self> {
        self.directory_url = Some(Url::parse(url)?);
        Ok(self)
    }

    /// Set the late-joiner grace timeout (default: 15 seconds).
    pub fn join_grace(mut self, grace: Duration) -> Self {
        self.join_grace = Some(grace);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<DiscoveryConfig> {
        let directory_url = self
            .directory_url
            .ok_or_else(|| OnboardError::malformed("Directory URL is required"))?;
        Ok(DiscoveryConfig {
            directory_url,
            join_grace: self.join_grace.unwrap_or(Duration::from_secs(15)),
        })
    }
}

/// Client for one discovery session.
///
/// The directory is fetched at most once per client value; subsequent calls
/// observe the cached result. Drop the client to end the session.
pub struct DiscoveryClient {
    transport: Arc<dyn Transport>,
    config: DiscoveryConfig,
    // Holding this mutex across the fetch is what makes the fetch
    // single-flight; late joiners block on it, bounded by `join_grace`.
    cache: Mutex<Option<Arc<DiscoveryDirectory>>>,
}

impl DiscoveryClient {
    /// Create a client over the given transport.
    pub fn new(transport: Arc<dyn Transport>, config: DiscoveryConfig) -> Self {
        Self {
            transport,
            config,
            cache: Mutex::new(None),
        }
    }

    /// The directory of institutions, fetching it on first call.
    ///
    /// On fetch failure the slot empties, so a later call retries. A joiner
    /// that waits longer than the grace timeout gets
    /// [`OnboardError::Unreachable`].
    pub async fn list_institutions(&self) -> Result<Arc<DiscoveryDirectory>> {
        let mut slot = tokio::time::timeout(self.config.join_grace, self.cache.lock())
            .await
            .map_err(|_| {
                OnboardError::unreachable("Timed out waiting for in-flight directory fetch")
            })?;

        if let Some(directory) = slot.as_ref() {
            return Ok(Arc::clone(directory));
        }

        tracing::info!(url = %self.config.directory_url, "Fetching discovery directory");
        let body = self
            .transport
            .fetch(&self.config.directory_url, &[content_types::JSON], None)
            .await?;

        let directory: DiscoveryDirectory = serde_json::from_slice(&body)
            .map_err(|e| OnboardError::malformed(format!("Directory body: {}", e)))?;
        tracing::debug!(
            institutions = directory.institutions.len(),
            seq = directory.sequence_number,
            "Directory fetched"
        );

        let directory = Arc::new(directory);
        *slot = Some(Arc::clone(&directory));
        Ok(directory)
    }

    /// Profiles offered by the named institution, in directory order.
    pub async fn profiles_for(&self, institution_name: &str) -> Result<Vec<InstitutionProfile>> {
        let directory = self.list_institutions().await?;
        Ok(directory.profiles_for(institution_name))
    }

    /// Institutions ordered by proximity to the resolved device location.
    ///
    /// Re-derives the ordering from the cached directory without
    /// re-fetching. When only a country is known the ordering degrades to a
    /// boolean country match; when nothing is known, to alphabetical.
    pub async fn order_by_proximity(
        &self,
        resolver: &ProximityResolver,
    ) -> Result<Vec<Institution>> {
        let directory = self.list_institutions().await?;
        let location = resolver.locate().await;
        if matches!(location, DeviceLocation::CountryOnly(_) | DeviceLocation::Unknown) {
            tracing::debug!(?location, "Proximity ordering running in degraded mode");
        }
        Ok(ProximityResolver::order_institutions(
            &directory.institutions,
            &location,
        ))
    }

    /// Fetch the configuration bundle for a profile.
    ///
    /// `access_token` is required by OAuth-protected profiles and attached
    /// as a bearer token when given.
    pub async fn fetch_config(
        &self,
        profile: &InstitutionProfile,
        access_token: Option<&str>,
    ) -> Result<Vec<u8>> {
        tracing::info!(profile = %profile.id, url = %profile.config_endpoint, "Fetching configuration bundle");
        self.transport
            .fetch(
                &profile.config_endpoint,
                &[content_types::EAP_CONFIG, content_types::XML],
                access_token,
            )
            .await
    }
}
