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

//! Configuration-bundle parser.
//!
//! Turns a bundle byte stream (EAP metadata markup) into institution display
//! metadata plus an ordered list of authentication methods. Declaration order
//! is an observable contract: later stages select the first supported method
//! as the fallback when the caller states no preference.
//!
//! Failure modes are split: a byte stream that is not well-formed markup is a
//! structural error; a method entry missing its kind is a semantic error.
//! Missing optional fields never fail the bundle; they default to empty.

use base64::prelude::*;
use roxmltree::{Document, Node};

use crate::error::{OnboardError, Result};
use crate::types::{
    AuthenticationMethod, CertificateBlob, ClientCertificate, InnerAuth, InstitutionInfo,
    MethodKind, TunnelKind,
};

/// A parsed bundle: institution metadata plus its authentication methods in
/// declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParsedConfig {
    /// Display metadata. All fields optional.
    pub institution: InstitutionInfo,
    /// All declared methods, including unsupported kinds, in declaration
    /// order.
    pub methods: Vec<AuthenticationMethod>,
}

impl ParsedConfig {
    /// Methods the pipeline can install, in declaration order.
    pub fn installable_methods(&self) -> impl Iterator<Item = &AuthenticationMethod> {
        self.methods.iter().filter(|m| m.kind.is_installable())
    }

    /// The first installable method in declaration order.
    ///
    /// This is the fallback selection convention when the caller does not
    /// discriminate by kind.
    pub fn first_installable(&self) -> Result<&AuthenticationMethod> {
        self.installable_methods()
            .next()
            .ok_or(OnboardError::UnsupportedMethod)
    }
}

/// Parse a configuration bundle.
pub fn parse(bytes: &[u8]) -> Result<ParsedConfig> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| OnboardError::malformed("Bundle is not valid UTF-8"))?;
    let doc = Document::parse(text)
        .map_err(|e| OnboardError::malformed(format!("Bundle is not well-formed markup: {}", e)))?;

    let provider = doc
        .descendants()
        .find(|n| n.has_tag_name("EAPIdentityProvider"))
        .ok_or_else(|| OnboardError::malformed("Bundle has no EAPIdentityProvider element"))?;

    let institution = provider
        .children()
        .find(|n| n.has_tag_name("ProviderInfo"))
        .map(parse_provider_info)
        .transpose()?
        .unwrap_or_default();

    let mut methods = Vec::new();
    if let Some(list) = provider
        .children()
        .find(|n| n.has_tag_name("AuthenticationMethods"))
    {
        for node in list.children().filter(|n| n.has_tag_name("AuthenticationMethod")) {
            methods.push(parse_method(node)?);
        }
    }

    tracing::debug!(
        methods = methods.len(),
        installable = methods.iter().filter(|m| m.kind.is_installable()).count(),
        "Parsed configuration bundle"
    );

    Ok(ParsedConfig {
        institution,
        methods,
    })
}

fn parse_method(node: Node<'_, '_>) -> Result<AuthenticationMethod> {
    // The method kind is the one mandatory element.
    let eap_type = node
        .children()
        .find(|n| n.has_tag_name("EAPMethod"))
        .and_then(|m| child_text(m, "Type"))
        .ok_or_else(|| {
            OnboardError::malformed("Authentication method entry is missing its EAP method type")
        })?;
    let eap_type: u32 = eap_type
        .trim()
        .parse()
        .map_err(|_| OnboardError::malformed("EAP method type is not numeric"))?;

    let kind = match eap_type {
        13 => MethodKind::TlsClientCertificate,
        21 => MethodKind::TunneledCredential {
            outer: TunnelKind::Ttls,
            inner: parse_inner_auth(node),
        },
        25 => MethodKind::TunneledCredential {
            outer: TunnelKind::Peap,
            inner: parse_inner_auth(node),
        },
        other => MethodKind::Other(other),
    };

    let mut certificate_authorities = Vec::new();
    let mut trusted_server_names = std::collections::BTreeSet::new();
    if let Some(server_side) = node
        .children()
        .find(|n| n.has_tag_name("ServerSideCredential"))
    {
        for ca in server_side.children().filter(|n| n.has_tag_name("CA")) {
            if let Some(text) = ca.text() {
                certificate_authorities.push(CertificateBlob(decode_base64_element(text)?));
            }
        }
        for id in server_side.children().filter(|n| n.has_tag_name("ServerID")) {
            if let Some(text) = id.text() {
                let name = text.trim();
                if !name.is_empty() {
                    trusted_server_names.insert(name.to_string());
                }
            }
        }
    }

    let mut client_certificate = None;
    let mut inner_identity_suffix = None;
    let mut inner_identity_hint_required = false;
    if let Some(client_side) = node
        .children()
        .find(|n| n.has_tag_name("ClientSideCredential"))
    {
        let blob = client_side
            .children()
            .find(|n| n.has_tag_name("ClientCertificate"))
            .and_then(|n| n.text())
            .map(decode_base64_element)
            .transpose()?;
        if let Some(blob) = blob {
            let passphrase = child_text(client_side, "Passphrase").unwrap_or_default();
            client_certificate = Some(ClientCertificate { blob, passphrase });
        }

        inner_identity_suffix =
            child_text(client_side, "InnerIdentitySuffix").filter(|s| !s.is_empty());
        inner_identity_hint_required = child_text(client_side, "InnerIdentityHint")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
    }

    Ok(AuthenticationMethod {
        kind,
        certificate_authorities,
        trusted_server_names,
        client_certificate,
        inner_identity_suffix,
        inner_identity_hint_required,
    })
}

fn parse_inner_auth(method: Node<'_, '_>) -> InnerAuth {
    let Some(inner) = method
        .children()
        .find(|n| n.has_tag_name("InnerAuthenticationMethod"))
    else {
        return InnerAuth::Unspecified;
    };

    // Non-EAP inner: 1 = PAP, 3 = MSCHAPv2. EAP inner: 26 = EAP-MSCHAPv2.
    if let Some(t) = inner
        .children()
        .find(|n| n.has_tag_name("NonEAPAuthMethod"))
        .and_then(|m| child_text(m, "Type"))
    {
        return match t.trim() {
            "1" => InnerAuth::Pap,
            "3" => InnerAuth::Mschapv2,
            _ => InnerAuth::Unspecified,
        };
    }
    if let Some(t) = inner
        .children()
        .find(|n| n.has_tag_name("EAPMethod"))
        .and_then(|m| child_text(m, "Type"))
    {
        if t.trim() == "26" {
            return InnerAuth::Mschapv2;
        }
    }
    InnerAuth::Unspecified
}

fn parse_provider_info(node: Node<'_, '_>) -> Result<InstitutionInfo> {
    let mut info = InstitutionInfo {
        display_name: child_text(node, "DisplayName"),
        description: child_text(node, "Description"),
        terms_of_use: child_text(node, "TermsOfUse"),
        ..Default::default()
    };

    if let Some(logo) = node.children().find(|n| n.has_tag_name("ProviderLogo")) {
        if let Some(text) = logo.text() {
            let mime = logo.attribute("mime").unwrap_or("image/png").to_string();
            info.logo = Some((decode_base64_element(text)?, mime));
        }
    }

    if let Some(helpdesk) = node.children().find(|n| n.has_tag_name("Helpdesk")) {
        info.email = child_text(helpdesk, "EmailAddress");
        info.phone = child_text(helpdesk, "Phone");
        info.web = child_text(helpdesk, "WebAddress");
    }

    Ok(info)
}

/// Trimmed text of the first child with the given tag, when non-empty.
fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Decode a base64 element body, tolerating embedded whitespace.
fn decode_base64_element(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| OnboardError::malformed(format!("Bad base64 in bundle element: {}", e)))
}
