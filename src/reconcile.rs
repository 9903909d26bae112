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

//! Trust reconciliation.
//!
//! Computes and applies the minimal set of certificate-store changes one
//! authentication method demands. The pass is strictly sequential in CA
//! declaration order, idempotent across repeated calls, and aborts without
//! rollback when the user declines a trust prompt: partial trust state is
//! valid and safe to retry later.

use std::sync::Arc;

use crate::certs::{parse_authorities, ParsedAuthority};
use crate::error::{OnboardError, Result};
use crate::stores::{AddOutcome, PersonalStore, TrustStore};
use crate::types::{AuthenticationMethod, InstallationSession, TrustDecision};

/// Reconciles the trust and personal stores with one authentication method.
pub struct TrustReconciler {
    method: AuthenticationMethod,
    trust_store: Arc<dyn TrustStore>,
    personal_store: Arc<dyn PersonalStore>,
}

impl TrustReconciler {
    /// Bind a reconciler to one method and the two stores it may touch.
    pub fn new(
        method: AuthenticationMethod,
        trust_store: Arc<dyn TrustStore>,
        personal_store: Arc<dyn PersonalStore>,
    ) -> Self {
        Self {
            method,
            trust_store,
            personal_store,
        }
    }

    /// The method this reconciler is bound to.
    pub fn method(&self) -> &AuthenticationMethod {
        &self.method
    }

    /// True iff at least one declared authority is absent from the trust
    /// store, by exact fingerprint match.
    ///
    /// An authority re-issued under the same subject but with different
    /// bytes has a different fingerprint and still needs install.
    pub async fn needs_certificate_install(&self) -> Result<bool> {
        for authority in self.declared_authorities()? {
            if self
                .trust_store
                .find_by_fingerprint(&authority.fingerprint)
                .await?
                .is_none()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Apply the store changes this method requires.
    ///
    /// Idempotent, safe to call repeatedly. For each declared authority in
    /// declaration order: if the store already holds its exact fingerprint,
    /// record it as already trusted (no prompt); otherwise add it. A decline
    /// aborts the remainder of the pass immediately — subsequent authorities
    /// and the client certificate are not attempted — while already-applied
    /// authorities stay in place.
    ///
    /// After all authorities succeed, an embedded client certificate is
    /// installed into the personal store, and the trust store is scanned for
    /// existing entries issued by the client certificate's issuer; their
    /// fingerprints join the session's collected thumbprints even though
    /// they were not freshly installed.
    ///
    /// On full success the session's `certificates_installed` flag is set.
    pub async fn install_certificates(
        &self,
        session: &mut InstallationSession,
    ) -> Result<Vec<TrustDecision>> {
        let authorities = self.declared_authorities()?;
        let mut decisions = Vec::with_capacity(authorities.len());

        for authority in &authorities {
            let fp = authority.fingerprint;

            if self.trust_store.find_by_fingerprint(&fp).await?.is_some() {
                tracing::debug!(fingerprint = %fp, subject = %authority.subject, "Authority already trusted");
                decisions.push(TrustDecision {
                    fingerprint: fp,
                    already_trusted: true,
                    installed: false,
                    user_declined: false,
                });
                session.collect_thumbprint(fp);
                continue;
            }

            match self.trust_store.add(&authority.der).await? {
                AddOutcome::Added => {
                    tracing::info!(fingerprint = %fp, subject = %authority.subject, "Installed authority");
                    decisions.push(TrustDecision {
                        fingerprint: fp,
                        already_trusted: false,
                        installed: true,
                        user_declined: false,
                    });
                    session.collect_thumbprint(fp);
                }
                AddOutcome::UserDeclined => {
                    tracing::warn!(fingerprint = %fp, "Trust prompt declined; aborting pass");
                    decisions.push(TrustDecision {
                        fingerprint: fp,
                        already_trusted: false,
                        installed: false,
                        user_declined: true,
                    });
                    // No rollback: already-installed authorities remain.
                    return Err(OnboardError::trust_declined(fp.to_string()));
                }
            }
        }

        if let Some(client) = &self.method.client_certificate {
            let identity = self
                .personal_store
                .add_client_certificate(&client.blob, &client.passphrase)
                .await?;
            tracing::info!(issuer = %identity.issuer, "Client certificate present in personal store");

            // Authorities already in the trust store under the client
            // certificate's issuer are needed by the profile document even
            // though this pass did not install them.
            for entry in self
                .trust_store
                .find_by_issuer_name(&identity.issuer)
                .await?
            {
                session.collect_thumbprint(entry.fingerprint);
            }
        }

        session.certificates_installed = true;
        Ok(decisions)
    }

    fn declared_authorities(&self) -> Result<Vec<ParsedAuthority>> {
        parse_authorities(&self.method.certificate_authorities)
    }
}
