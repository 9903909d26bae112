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

//! Core data model for the onboarding pipeline.
//!
//! Types here flow between the pipeline stages: the discovery directory and
//! its institutions/profiles, the parsed authentication-method model, and the
//! per-attempt installation session.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{OnboardError, Result};

// =============================================================================
// Fingerprints
// =============================================================================

/// SHA-256 fingerprint of a DER-encoded certificate.
///
/// Fingerprint comparison is the only identity check the pipeline performs on
/// certificates; subject/issuer string matching is unreliable and never used
/// for identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of DER-encoded certificate bytes.
    pub fn of_der(der: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(der);
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a fingerprint from a colon-separated hex string.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes: Vec<u8> = s
            .split(':')
            .map(|hex| {
                u8::from_str_radix(hex.trim(), 16)
                    .map_err(|_| OnboardError::certificate_format("Invalid fingerprint format"))
            })
            .collect::<Result<Vec<_>>>()?;

        if bytes.len() != 32 {
            return Err(OnboardError::certificate_format(
                "Fingerprint must be 32 bytes (SHA-256)",
            ));
        }

        let mut fp = [0u8; 32];
        fp.copy_from_slice(&bytes);
        Ok(Self(fp))
    }
}

impl fmt::Display for Fingerprint {
    /// Colon-separated uppercase hex, e.g. "AB:CD:EF:01:...".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

// =============================================================================
// Discovery directory
// =============================================================================

/// A geographic coordinate attached to an institution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// One selectable configuration offering within an institution.
///
/// Immutable once fetched; discarded when the discovery session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionProfile {
    /// Directory-unique profile identifier.
    pub id: String,
    /// Human-readable profile name.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Endpoint serving this profile's configuration bundle.
    #[serde(rename = "eapconfig_endpoint")]
    pub config_endpoint: Url,
    /// Whether the endpoint requires an OAuth access token.
    #[serde(default)]
    pub oauth: bool,
    /// OAuth authorization endpoint, when `oauth` is set.
    #[serde(default)]
    pub authorization_endpoint: Option<Url>,
    /// OAuth token endpoint, when `oauth` is set.
    #[serde(default)]
    pub token_endpoint: Option<Url>,
}

/// One institution in the discovery directory, grouping its profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    /// Institution display name.
    pub name: String,
    /// ISO 3166-1 alpha-2 country code, when known.
    #[serde(default)]
    pub country: Option<String>,
    /// Approximate campus coordinates, when known. May hold several points
    /// for multi-campus institutions.
    #[serde(default)]
    pub geo: Vec<GeoPoint>,
    /// Profiles offered by this institution, in directory order.
    pub profiles: Vec<InstitutionProfile>,
}

/// The versioned directory of institutions, as served by the discovery
/// endpoint.
///
/// Built once per discovery session and immutable afterwards; proximity
/// ordering derives a new ordering without re-fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDirectory {
    /// Directory format version.
    pub version: u32,
    /// Monotonic publication sequence number.
    #[serde(rename = "seq")]
    pub sequence_number: u64,
    /// Institutions, in directory order.
    #[serde(rename = "instances")]
    pub institutions: Vec<Institution>,
}

impl DiscoveryDirectory {
    /// Profiles offered by the institution with the given profile-bearing
    /// identifier (its name), in directory order. Empty when unknown.
    pub fn profiles_for(&self, institution_name: &str) -> Vec<InstitutionProfile> {
        self.institutions
            .iter()
            .filter(|inst| inst.name == institution_name)
            .flat_map(|inst| inst.profiles.iter().cloned())
            .collect()
    }
}

// =============================================================================
// Authentication methods
// =============================================================================

/// Outer tunnel protocol for tunneled-credential methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TunnelKind {
    /// EAP-TTLS (type 21).
    Ttls,
    /// PEAP (type 25).
    Peap,
}

/// Inner authentication inside a tunneled method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InnerAuth {
    /// Plaintext password inside the tunnel.
    Pap,
    /// MSCHAPv2 (both the EAP and the non-EAP variant).
    Mschapv2,
    /// Inner method not declared by the bundle.
    Unspecified,
}

/// The credential mechanism an authentication method uses.
///
/// Only [`MethodKind::TlsClientCertificate`] and
/// [`MethodKind::TunneledCredential`] are installable; other kinds are
/// retained in the parsed model for introspection but skipped when the
/// pipeline enumerates installable methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodKind {
    /// Certificate-based mutual TLS (EAP-TLS, type 13).
    TlsClientCertificate,
    /// Username/password inside an outer TLS tunnel.
    TunneledCredential {
        /// Outer tunnel protocol.
        outer: TunnelKind,
        /// Inner authentication.
        inner: InnerAuth,
    },
    /// Any method kind outside the supported set, by its declared EAP type.
    Other(u32),
}

impl MethodKind {
    /// Whether the pipeline can install this method kind.
    pub fn is_installable(&self) -> bool {
        matches!(
            self,
            Self::TlsClientCertificate | Self::TunneledCredential { .. }
        )
    }

    /// Whether this kind authenticates with a client certificate.
    pub fn requires_client_certificate(&self) -> bool {
        matches!(self, Self::TlsClientCertificate)
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TlsClientCertificate => write!(f, "TLS"),
            Self::TunneledCredential { outer, inner } => {
                let outer = match outer {
                    TunnelKind::Ttls => "TTLS",
                    TunnelKind::Peap => "PEAP",
                };
                let inner = match inner {
                    InnerAuth::Pap => "PAP",
                    InnerAuth::Mschapv2 => "MSCHAPv2",
                    InnerAuth::Unspecified => "unspecified",
                };
                write!(f, "{}/{}", outer, inner)
            }
            Self::Other(n) => write!(f, "EAP-{}", n),
        }
    }
}

/// An undecoded certificate blob as carried by a bundle: DER or PEM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBlob(pub Vec<u8>);

/// Client certificate material from a bundle: an encrypted container plus
/// the passphrase to unlock it.
#[derive(Clone)]
pub struct ClientCertificate {
    /// Raw container bytes (typically PKCS#12).
    pub blob: Vec<u8>,
    /// Container passphrase.
    pub passphrase: String,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never log container bytes or passphrase.
        f.debug_struct("ClientCertificate")
            .field("blob_len", &self.blob.len())
            .finish()
    }
}

/// One supported credential mechanism from a parsed bundle.
///
/// Immutable; owned by the trust reconciler / profile installer for the
/// duration of one install attempt.
#[derive(Debug, Clone)]
pub struct AuthenticationMethod {
    /// The credential mechanism.
    pub kind: MethodKind,
    /// CA certificates this method trusts, in declaration order.
    pub certificate_authorities: Vec<CertificateBlob>,
    /// Server identities the supplicant may accept.
    pub trusted_server_names: BTreeSet<String>,
    /// Client certificate material, when the bundle embeds one.
    pub client_certificate: Option<ClientCertificate>,
    /// Realm suffix the inner identity must carry, when declared.
    pub inner_identity_suffix: Option<String>,
    /// Whether the inner identity must be a hint (anonymous outer identity).
    pub inner_identity_hint_required: bool,
}

// =============================================================================
// Institution info
// =============================================================================

/// Display metadata attached to a parsed bundle. Purely descriptive; every
/// field is optional.
#[derive(Debug, Clone, Default)]
pub struct InstitutionInfo {
    /// Institution display name.
    pub display_name: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Logo bytes and their declared MIME type.
    pub logo: Option<(Vec<u8>, String)>,
    /// Helpdesk email address.
    pub email: Option<String>,
    /// Helpdesk phone number.
    pub phone: Option<String>,
    /// Helpdesk web address.
    pub web: Option<String>,
    /// Terms-of-use text.
    pub terms_of_use: Option<String>,
}

// =============================================================================
// Reconciliation state
// =============================================================================

/// Per-authority outcome of one reconciliation pass.
///
/// Ephemeral: produced and consumed within one `install_certificates` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustDecision {
    /// Fingerprint of the authority this decision is about.
    pub fingerprint: Fingerprint,
    /// The store already held an entry with this exact fingerprint.
    pub already_trusted: bool,
    /// The authority was freshly added to the store in this pass.
    pub installed: bool,
    /// The user refused the trust prompt for this authority.
    pub user_declined: bool,
}

/// Mutable install state for one authentication method across one attempt.
///
/// Created when a reconciler is obtained for a method; destroyed after the
/// network profile is installed or the attempt is abandoned. Holding the
/// per-attempt SSID/interface/profile here (instead of process-global state)
/// lets independent attempts run against different interfaces.
#[derive(Debug)]
pub struct InstallationSession {
    /// Target network name.
    pub ssid: String,
    /// Interface the profile will be installed on.
    pub interface_id: String,
    /// Fingerprints the profile document will reference, in collection order.
    pub collected_thumbprints: Vec<Fingerprint>,
    /// Flips to true only after a successful full reconciliation pass. The
    /// profile installer refuses to proceed while false.
    pub certificates_installed: bool,
}

impl InstallationSession {
    /// Start a session for the given network and interface.
    pub fn new(ssid: impl Into<String>, interface_id: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            interface_id: interface_id.into(),
            collected_thumbprints: Vec::new(),
            certificates_installed: false,
        }
    }

    /// Record a thumbprint if it is not already collected.
    ///
    /// Keeps collection order stable across repeated reconciliation passes,
    /// which downstream profile rendering treats as ordered.
    pub(crate) fn collect_thumbprint(&mut self, fp: Fingerprint) {
        if !self.collected_thumbprints.contains(&fp) {
            self.collected_thumbprints.push(fp);
        }
    }
}
