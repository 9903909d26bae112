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

//! Network-profile rendering and installation.
//!
//! Renders the declarative join-profile document binding a network name to
//! an authentication method, and installs it through the network-profile
//! collaborator. The document references trusted authorities by fingerprint
//! only — never by raw certificate bytes — plus the trusted server-name
//! list, so the supplicant restricts which server identity it accepts.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{OnboardError, Result};
use crate::types::{AuthenticationMethod, Fingerprint, InstallationSession};

/// The declarative join-profile document.
///
/// Platform-agnostic; the [`NetworkProfileStore`] implementation translates
/// it into whatever the local supplicant expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    /// Target network name. Doubles as the profile name: installation is
    /// idempotent by name.
    pub ssid: String,
    /// The authentication mechanism, in display form (e.g. "TLS",
    /// "PEAP/MSCHAPv2").
    pub auth: String,
    /// Whether the supplicant must present a client certificate.
    pub client_certificate_required: bool,
    /// Trusted authority fingerprints, in collection order.
    pub ca_fingerprints: Vec<String>,
    /// Server identities the supplicant may accept.
    pub server_names: Vec<String>,
    /// Realm suffix constraint for the inner identity, when declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_identity_suffix: Option<String>,
    /// Whether the outer identity must be anonymized to a hint.
    pub inner_identity_hint_required: bool,
}

impl ProfileDocument {
    /// Render the document for a network and method, referencing the
    /// thumbprints collected during reconciliation.
    pub fn render(
        ssid: &str,
        method: &AuthenticationMethod,
        collected_thumbprints: &[Fingerprint],
    ) -> Self {
        Self {
            ssid: ssid.to_string(),
            auth: method.kind.to_string(),
            client_certificate_required: method.kind.requires_client_certificate(),
            ca_fingerprints: collected_thumbprints.iter().map(|f| f.to_string()).collect(),
            server_names: method.trusted_server_names.iter().cloned().collect(),
            inner_identity_suffix: method.inner_identity_suffix.clone(),
            inner_identity_hint_required: method.inner_identity_hint_required,
        }
    }
}

/// Username/password payload attached to an installed profile, used by
/// tunneled-credential methods.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialPayload {
    /// Outer/inner identity.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for CredentialPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPayload")
            .field("username", &self.username)
            .finish()
    }
}

/// The network-profile collaborator: the narrow slice of the local WiFi
/// subsystem the pipeline depends on.
#[async_trait]
pub trait NetworkProfileStore: Send + Sync {
    /// Install (or overwrite, when `overwrite` is set) a profile by name.
    /// Returns whether the subsystem accepted it.
    async fn set_profile(
        &self,
        interface_id: &str,
        name: &str,
        document: &ProfileDocument,
        overwrite: bool,
    ) -> Result<bool>;

    /// Attach a credential payload to an installed profile.
    async fn set_profile_user_data(
        &self,
        interface_id: &str,
        name: &str,
        payload: &CredentialPayload,
    ) -> Result<bool>;

    /// Delete a profile by name. Returns false when it was absent.
    async fn delete_profile(&self, interface_id: &str, name: &str) -> Result<bool>;

    /// Ask the subsystem to join the named network, waiting at most
    /// `timeout` for the subsystem's own completion signal.
    async fn connect(&self, interface_id: &str, name: &str, timeout: Duration) -> Result<bool>;

    /// Names of the currently-active network associations.
    async fn list_active_associations(&self) -> Result<BTreeSet<String>>;
}

/// Outcome of a successful profile installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Profile installed and usable as-is.
    Installed,
    /// Profile installed, but the method is certificate-based and no client
    /// certificate was supplied: user credentials must still be obtained
    /// out-of-band before the connection can work. Not a failure.
    CredentialsRequired,
}

impl InstallOutcome {
    /// Whether the profile can be used to connect without further input.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Installed)
    }
}

/// Renders and installs join profiles for one session.
pub struct ProfileInstaller<S: NetworkProfileStore + ?Sized> {
    profiles: std::sync::Arc<S>,
}

impl<S: NetworkProfileStore + ?Sized> ProfileInstaller<S> {
    /// Create an installer over the given profile collaborator.
    pub fn new(profiles: std::sync::Arc<S>) -> Self {
        Self { profiles }
    }

    /// Render the declarative join-profile document for a network and
    /// method, referencing the thumbprints collected during reconciliation.
    pub fn render_profile(
        &self,
        ssid: &str,
        method: &AuthenticationMethod,
        collected_thumbprints: &[Fingerprint],
    ) -> ProfileDocument {
        ProfileDocument::render(ssid, method, collected_thumbprints)
    }

    /// Install the document for the session's interface.
    ///
    /// Refuses with [`OnboardError::MissingCertificates`] while the
    /// session's `certificates_installed` flag is false: the document
    /// references fingerprints that must already exist in the trust store.
    /// Overwrites an existing profile of the same name.
    pub async fn install(
        &self,
        session: &InstallationSession,
        method: &AuthenticationMethod,
        document: &ProfileDocument,
    ) -> Result<InstallOutcome> {
        if !session.certificates_installed {
            return Err(OnboardError::MissingCertificates);
        }

        let accepted = self
            .profiles
            .set_profile(&session.interface_id, &document.ssid, document, true)
            .await?;
        if !accepted {
            return Err(OnboardError::store_unavailable(format!(
                "Profile store rejected profile '{}'",
                document.ssid
            )));
        }

        if method.kind.requires_client_certificate() && method.client_certificate.is_none() {
            tracing::info!(ssid = %document.ssid, "Profile installed; client credentials still required");
            return Ok(InstallOutcome::CredentialsRequired);
        }

        tracing::info!(ssid = %document.ssid, auth = %document.auth, "Profile installed");
        Ok(InstallOutcome::Installed)
    }

    /// Attach a username/password payload to the named profile.
    ///
    /// Used by tunneled-credential methods; independent of certificate
    /// reconciliation.
    pub async fn attach_credentials(
        &self,
        interface_id: &str,
        profile_name: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let payload = CredentialPayload {
            username: username.to_string(),
            password: password.to_string(),
        };
        let accepted = self
            .profiles
            .set_profile_user_data(interface_id, profile_name, &payload)
            .await?;
        if !accepted {
            return Err(OnboardError::store_unavailable(format!(
                "Profile store rejected credentials for '{}'",
                profile_name
            )));
        }
        Ok(())
    }

    /// Remove the profile for a network. Safe to call when absent.
    pub async fn remove(&self, interface_id: &str, ssid: &str) -> Result<()> {
        let deleted = self.profiles.delete_profile(interface_id, ssid).await?;
        if !deleted {
            tracing::debug!(%ssid, "No profile to remove");
        }
        Ok(())
    }
}
