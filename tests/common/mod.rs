//! Shared test infrastructure: in-memory collaborator fakes and fixture
//! helpers for building bundles and certificates.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;

use eap_onboard::certs::parse_authority;
use eap_onboard::error::Result;
use eap_onboard::profile::{CredentialPayload, NetworkProfileStore, ProfileDocument};
use eap_onboard::stores::{AddOutcome, InstalledIdentity, PersonalStore, StoreEntry, TrustStore};
use eap_onboard::types::Fingerprint;

// =============================================================================
// Certificate fixtures
// =============================================================================

/// A generated CA with its signing key, for issuing leaf certificates.
pub struct TestCa {
    pub der: Vec<u8>,
    pub cert: rcgen::Certificate,
    pub key: rcgen::KeyPair,
}

/// Generate a self-signed CA with the given common name.
pub fn self_signed_ca(common_name: &str) -> TestCa {
    let key = rcgen::KeyPair::generate().unwrap();
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, common_name);
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key).unwrap();
    let der = cert.der().as_ref().to_vec();
    TestCa { der, cert, key }
}

/// Issue a leaf certificate signed by `ca`, returning its DER bytes.
pub fn issued_by(ca: &TestCa, common_name: &str) -> Vec<u8> {
    let key = rcgen::KeyPair::generate().unwrap();
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, common_name);
    let cert = params.signed_by(&key, &ca.cert, &ca.key).unwrap();
    cert.der().as_ref().to_vec()
}

// =============================================================================
// Bundle fixtures
// =============================================================================

/// Base64 for embedding bytes in a bundle element.
pub fn b64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// A bundle with one EAP-TLS method declaring the given CAs and an optional
/// client-certificate container.
pub fn tls_bundle(ca_ders: &[&[u8]], client_container: Option<&[u8]>) -> String {
    let cas: String = ca_ders
        .iter()
        .map(|der| format!(r#"<CA format="X.509" encoding="base64">{}</CA>"#, b64(der)))
        .collect();
    let client = client_container
        .map(|c| {
            format!(
                r#"<ClientSideCredential>
  <ClientCertificate format="PKCS12" encoding="base64">{}</ClientCertificate>
  <Passphrase>fixture</Passphrase>
</ClientSideCredential>"#,
                b64(c)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<EAPIdentityProviderList>
  <EAPIdentityProvider ID="example.org">
    <AuthenticationMethods>
      <AuthenticationMethod>
        <EAPMethod><Type>13</Type></EAPMethod>
        <ServerSideCredential>
          {}
          <ServerID>radius.example.org</ServerID>
        </ServerSideCredential>
        {}
      </AuthenticationMethod>
    </AuthenticationMethods>
    <ProviderInfo>
      <DisplayName>Example University</DisplayName>
    </ProviderInfo>
  </EAPIdentityProvider>
</EAPIdentityProviderList>"#,
        cas, client
    )
}

// =============================================================================
// Trust store fake
// =============================================================================

/// In-memory trust store with a scriptable decline list.
#[derive(Default)]
pub struct MemoryTrustStore {
    entries: Mutex<Vec<StoreEntry>>,
    decline: Mutex<HashSet<Fingerprint>>,
    /// Number of `add` calls that reached the store (= trust prompts shown).
    pub prompts: AtomicUsize,
}

impl MemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an entry without counting a prompt.
    pub fn seed(&self, der: &[u8]) {
        let authority = parse_authority(der).unwrap();
        self.entries.lock().unwrap().push(StoreEntry {
            fingerprint: authority.fingerprint,
            subject: authority.subject,
            issuer: authority.issuer,
        });
    }

    /// Script the user to decline the prompt for this certificate.
    pub fn decline_for(&self, der: &[u8]) {
        self.decline
            .lock()
            .unwrap()
            .insert(Fingerprint::of_der(der));
    }

    pub fn contains(&self, der: &[u8]) -> bool {
        let fp = Fingerprint::of_der(der);
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.fingerprint == fp)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl TrustStore for MemoryTrustStore {
    async fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<StoreEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| &e.fingerprint == fingerprint)
            .cloned())
    }

    async fn add(&self, der: &[u8]) -> Result<AddOutcome> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let authority = parse_authority(der)?;
        if self
            .decline
            .lock()
            .unwrap()
            .contains(&authority.fingerprint)
        {
            return Ok(AddOutcome::UserDeclined);
        }
        self.entries.lock().unwrap().push(StoreEntry {
            fingerprint: authority.fingerprint,
            subject: authority.subject,
            issuer: authority.issuer,
        });
        Ok(AddOutcome::Added)
    }

    async fn find_by_issuer_name(&self, issuer: &str) -> Result<Vec<StoreEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.issuer == issuer)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Personal store fake
// =============================================================================

/// In-memory personal store. Treats the container bytes as a bare DER
/// certificate, which is what the fixtures supply.
#[derive(Default)]
pub struct MemoryPersonalStore {
    installed: Mutex<Vec<Fingerprint>>,
    pub adds: AtomicUsize,
}

impl MemoryPersonalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.installed.lock().unwrap().len()
    }
}

#[async_trait]
impl PersonalStore for MemoryPersonalStore {
    async fn add_client_certificate(
        &self,
        container: &[u8],
        _passphrase: &str,
    ) -> Result<InstalledIdentity> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        let parsed = parse_authority(container)?;
        let mut installed = self.installed.lock().unwrap();
        // Idempotent: re-adding an already-present certificate is a no-op.
        if !installed.contains(&parsed.fingerprint) {
            installed.push(parsed.fingerprint);
        }
        Ok(InstalledIdentity {
            issuer: parsed.issuer,
            fingerprint: parsed.fingerprint,
        })
    }
}

// =============================================================================
// Network profile store fake
// =============================================================================

/// In-memory WiFi subsystem.
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<(String, String), ProfileDocument>>,
    user_data: Mutex<HashMap<(String, String), CredentialPayload>>,
    associations: Mutex<BTreeSet<String>>,
    /// What `connect` reports.
    pub connect_reports: AtomicBool,
    /// Whether a successful-looking `connect` also creates the association.
    pub associate_on_connect: AtomicBool,
    pub connect_calls: AtomicUsize,
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            user_data: Mutex::new(HashMap::new()),
            associations: Mutex::new(BTreeSet::new()),
            connect_reports: AtomicBool::new(true),
            associate_on_connect: AtomicBool::new(true),
            connect_calls: AtomicUsize::new(0),
        }
    }
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, interface_id: &str, name: &str) -> Option<ProfileDocument> {
        self.profiles
            .lock()
            .unwrap()
            .get(&(interface_id.to_string(), name.to_string()))
            .cloned()
    }

    pub fn credentials(&self, interface_id: &str, name: &str) -> Option<CredentialPayload> {
        self.user_data
            .lock()
            .unwrap()
            .get(&(interface_id.to_string(), name.to_string()))
            .cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    pub fn set_associated(&self, ssid: &str) {
        self.associations.lock().unwrap().insert(ssid.to_string());
    }
}

#[async_trait]
impl NetworkProfileStore for MemoryProfileStore {
    async fn set_profile(
        &self,
        interface_id: &str,
        name: &str,
        document: &ProfileDocument,
        overwrite: bool,
    ) -> Result<bool> {
        let key = (interface_id.to_string(), name.to_string());
        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&key) && !overwrite {
            return Ok(false);
        }
        profiles.insert(key, document.clone());
        Ok(true)
    }

    async fn set_profile_user_data(
        &self,
        interface_id: &str,
        name: &str,
        payload: &CredentialPayload,
    ) -> Result<bool> {
        self.user_data.lock().unwrap().insert(
            (interface_id.to_string(), name.to_string()),
            payload.clone(),
        );
        Ok(true)
    }

    async fn delete_profile(&self, interface_id: &str, name: &str) -> Result<bool> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .remove(&(interface_id.to_string(), name.to_string()))
            .is_some())
    }

    async fn connect(&self, _interface_id: &str, name: &str, _timeout: Duration) -> Result<bool> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let reports = self.connect_reports.load(Ordering::SeqCst);
        if reports && self.associate_on_connect.load(Ordering::SeqCst) {
            self.associations.lock().unwrap().insert(name.to_string());
        }
        Ok(reports)
    }

    async fn list_active_associations(&self) -> Result<BTreeSet<String>> {
        Ok(self.associations.lock().unwrap().clone())
    }
}
