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

//! # eap-onboard
//!
//! An async Rust library for onboarding a device onto a federated EAP WiFi
//! network (eduroam-style).
//!
//! The pipeline has five independently testable stages:
//!
//! 1. **Discovery** ([`discovery`]): fetch the directory of institutions
//!    (single-flight, cached per session), order it by proximity to the
//!    device, and fetch the selected profile's configuration bundle.
//! 2. **Parsing** ([`parser`]): turn the bundle bytes into institution
//!    metadata plus an ordered list of authentication methods.
//! 3. **Trust reconciliation** ([`reconcile`]): make the trust and personal
//!    certificate stores match what one authentication method requires —
//!    idempotently, in declaration order, with user-declined trust prompts
//!    surfaced as a distinct outcome.
//! 4. **Profile installation** ([`profile`]): render the declarative
//!    join-profile document (fingerprints and server names, never raw CA
//!    bytes) and install it; credentials can be attached separately.
//! 5. **Connection** ([`connect`]): join the network with a bounded timeout
//!    and verify the association independently of the join call's result.
//!
//! The platform surfaces — HTTP, certificate stores, the WiFi subsystem,
//! preference storage, the location sensor — are narrow traits the caller
//! implements ([`Transport`], [`TrustStore`], [`PersonalStore`],
//! [`NetworkProfileStore`], [`PreferenceStore`],
//! [`LocationSensor`](geo::LocationSensor)).
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use eap_onboard::{DiscoveryClient, DiscoveryConfig, HttpTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new(Duration::from_secs(30))?);
//! let config = DiscoveryConfig::builder()
//!     .directory_url("https://discovery.example.org/v2/discovery.json")?
//!     .build()?;
//!
//! let discovery = DiscoveryClient::new(transport, config);
//! let directory = discovery.list_institutions().await?;
//! println!("{} institutions available", directory.institutions.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Ordering invariant
//!
//! The join profile references trust-store entries by fingerprint, so those
//! entries must exist before the profile does. The crate enforces this:
//! [`ProfileInstaller::install`](profile::ProfileInstaller::install) fails
//! with [`OnboardError::MissingCertificates`] until
//! [`TrustReconciler::install_certificates`](reconcile::TrustReconciler::install_certificates)
//! has completed for the session.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod certs;
pub mod connect;
pub mod discovery;
pub mod error;
pub mod geo;
pub mod parser;
pub mod prefs;
pub mod profile;
pub mod reconcile;
pub mod stores;
pub mod transport;
pub mod types;

// Re-export main types at crate root for convenience
pub use connect::{AttemptState, ConnectionDriver};
pub use discovery::{DiscoveryClient, DiscoveryConfig, DiscoveryConfigBuilder};
pub use error::{OnboardError, Result};
pub use parser::{parse, ParsedConfig};
pub use prefs::PreferenceStore;
pub use profile::{InstallOutcome, NetworkProfileStore, ProfileDocument, ProfileInstaller};
pub use reconcile::TrustReconciler;
pub use stores::{PersonalStore, TrustStore};
pub use transport::{HttpTransport, Transport};
pub use types::{
    AuthenticationMethod, DiscoveryDirectory, Fingerprint, InstallationSession, Institution,
    InstitutionInfo, InstitutionProfile, MethodKind, TrustDecision,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent string for HTTP requests.
pub const USER_AGENT: &str = concat!("eap-onboard/", env!("CARGO_PKG_VERSION"));
