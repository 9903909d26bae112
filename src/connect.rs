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

//! Connection attempt driver.
//!
//! Drives one join attempt against an installed profile and verifies the
//! result. The driver never trusts the join call's own success signal: a
//! transient join can report success while the association has not
//! stabilized, so it independently enumerates active associations and
//! requires the target network to appear among them.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{OnboardError, Result};
use crate::profile::NetworkProfileStore;

/// State of one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptState {
    /// No attempt in progress.
    #[default]
    Idle,
    /// Join request issued, awaiting completion and verification.
    Attempting,
    /// Terminal: the target network appeared among active associations.
    Verified,
    /// Terminal: the association could not be verified.
    Failed,
}

/// Drives and verifies connection attempts.
///
/// `Failed` and `Verified` are terminal for one attempt; calling
/// [`ConnectionDriver::attempt`] again re-enters `Attempting` from the top.
/// No retry loop lives here: retry policy belongs to the caller.
pub struct ConnectionDriver<S: NetworkProfileStore + ?Sized> {
    profiles: Arc<S>,
    join_timeout: Duration,
    state: AttemptState,
}

impl<S: NetworkProfileStore + ?Sized> ConnectionDriver<S> {
    /// Create a driver with the default join timeout.
    pub fn new(profiles: Arc<S>) -> Self {
        Self {
            profiles,
            join_timeout: Duration::from_secs(10),
            state: AttemptState::Idle,
        }
    }

    /// Override the join timeout. It is a hard upper bound the driver
    /// enforces independent of caller cancellation.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Current attempt state.
    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Run one join attempt against the installed profile for `ssid`.
    ///
    /// Returns `Ok(())` only when the network appears among the active
    /// associations afterwards; otherwise
    /// [`OnboardError::ConnectionUnverified`], even if the underlying join
    /// call reported success.
    pub async fn attempt(&mut self, interface_id: &str, ssid: &str) -> Result<()> {
        self.state = AttemptState::Attempting;
        tracing::info!(%ssid, %interface_id, "Attempting to join");

        let join_reported = match tokio::time::timeout(
            self.join_timeout,
            self.profiles.connect(interface_id, ssid, self.join_timeout),
        )
        .await
        {
            Ok(Ok(reported)) => reported,
            Ok(Err(e)) => {
                self.state = AttemptState::Failed;
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(%ssid, "Join attempt timed out");
                false
            }
        };

        // Double-check: enumerate associations regardless of what the join
        // call claimed.
        let associations = match self.profiles.list_active_associations().await {
            Ok(a) => a,
            Err(e) => {
                self.state = AttemptState::Failed;
                return Err(e);
            }
        };

        if associations.contains(ssid) {
            tracing::info!(%ssid, "Association verified");
            self.state = AttemptState::Verified;
            return Ok(());
        }

        tracing::warn!(%ssid, join_reported, "Association not present after join");
        self.state = AttemptState::Failed;
        Err(OnboardError::unverified(ssid))
    }
}
