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

//! Certificate-store collaborator seams.
//!
//! The pipeline sees exactly two logical stores: a trust store holding
//! certificate authorities, and a personal store holding the user's own
//! client certificates. Platform store mechanics (system keychains, OS
//! certificate databases) live entirely behind these traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Fingerprint;

/// An entry read back from the trust store.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// SHA-256 fingerprint of the stored DER bytes.
    pub fingerprint: Fingerprint,
    /// Subject distinguished name, for display and issuer scans.
    pub subject: String,
    /// Issuer distinguished name.
    pub issuer: String,
}

/// Outcome of asking the trust store to add an authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The authority is now present (freshly added).
    Added,
    /// The operating environment asked the user and the user refused.
    UserDeclined,
}

/// The trusted-roots store.
///
/// Adding an authority may suspend on an interactive OS trust prompt; that
/// is a legitimate long suspension, not an error, and cancellation during it
/// is best-effort only.
#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Look up an entry by exact fingerprint.
    ///
    /// This is the only identity check reconciliation uses; subject or
    /// issuer string matches never establish identity.
    async fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<StoreEntry>>;

    /// Add a DER-encoded authority.
    ///
    /// Returns [`AddOutcome::UserDeclined`] when the user refuses the trust
    /// prompt; store-level failures map to
    /// [`OnboardError::StoreUnavailable`](crate::OnboardError::StoreUnavailable).
    async fn add(&self, der: &[u8]) -> Result<AddOutcome>;

    /// All entries whose issuer distinguished name equals `issuer`.
    ///
    /// Used to collect thumbprints of already-present authorities related to
    /// a client certificate; never used to decide whether an authority needs
    /// installing.
    async fn find_by_issuer_name(&self, issuer: &str) -> Result<Vec<StoreEntry>>;
}

/// Identity of a client certificate after the personal store accepted it.
///
/// The store decodes the credential container (typically PKCS#12), so it is
/// the party that knows the certificate's issuer.
#[derive(Debug, Clone)]
pub struct InstalledIdentity {
    /// Issuer distinguished name of the installed client certificate.
    pub issuer: String,
    /// Fingerprint of the installed client certificate.
    pub fingerprint: Fingerprint,
}

/// The personal certificate store.
#[async_trait]
pub trait PersonalStore: Send + Sync {
    /// Install a client-certificate container.
    ///
    /// Idempotent: re-adding an already-present certificate is a no-op that
    /// still returns its identity. A wrong passphrase or malformed container
    /// maps to
    /// [`OnboardError::CertificateFormatInvalid`](crate::OnboardError::CertificateFormatInvalid).
    async fn add_client_certificate(
        &self,
        container: &[u8],
        passphrase: &str,
    ) -> Result<InstalledIdentity>;
}
