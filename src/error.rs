//! Error types for the onboarding pipeline.
//!
//! This module defines all error types that can occur while configuring a
//! device for a federated network: transport errors, parse errors, trust
//! reconciliation errors, and connection verification errors.

use thiserror::Error;

/// Result type alias using [`OnboardError`].
pub type Result<T> = std::result::Result<T, OnboardError>;

/// Errors that can occur during onboarding operations.
#[derive(Debug, Error)]
pub enum OnboardError {
    /// Network, DNS, or timeout failure while reaching a remote endpoint.
    ///
    /// Retryable: the endpoint may become reachable again.
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    /// The response was reachable but not usable: a structurally malformed
    /// body, or a semantic violation in an otherwise well-formed document.
    ///
    /// Not retryable against the same endpoint.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Response Content-Type header does not match any accepted value.
    #[error("Invalid content-type: expected one of [{expected}], got '{actual}'")]
    InvalidContentType {
        /// Comma-joined accepted content-types.
        expected: String,
        /// Actual content-type received.
        actual: String,
    },

    /// The parsed bundle contains no authentication method this pipeline can
    /// install. Terminal: the user must pick another institution or profile.
    #[error("No installable authentication method in bundle")]
    UnsupportedMethod,

    /// The user refused an interactive trust prompt while a certificate
    /// authority was being added to the trust store.
    ///
    /// Retryable after the user reconsiders; already-installed authorities
    /// are left in place.
    #[error("Trust prompt declined for authority {fingerprint}")]
    TrustPromptDeclined {
        /// Fingerprint of the authority that was declined.
        fingerprint: String,
    },

    /// Profile installation was attempted before trust reconciliation
    /// completed for the session. Usage error: the installer contract
    /// requires `install_certificates` to succeed first.
    #[error("Certificates not installed for this session; run trust reconciliation first")]
    MissingCertificates,

    /// A certificate-based method has no client certificate yet. Expected
    /// intermediate state, not a failure: credentials must be obtained
    /// out-of-band before the connection can work.
    #[error("Client credentials required before connecting")]
    CredentialsRequired,

    /// The join call completed but the target network did not appear among
    /// the active associations. Retryable.
    #[error("Connection to '{ssid}' could not be verified")]
    ConnectionUnverified {
        /// The network name whose association was not observed.
        ssid: String,
    },

    /// Malformed CA or client certificate bytes, or a bad passphrase.
    #[error("Certificate format invalid: {0}")]
    CertificateFormatInvalid(String),

    /// A certificate or profile store could not be opened for read/write.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OnboardError {
    /// Create an unreachable error with the given message.
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Create a malformed-response error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create an invalid content-type error.
    pub fn invalid_content_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidContentType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a trust-prompt-declined error for the given fingerprint.
    pub fn trust_declined(fingerprint: impl Into<String>) -> Self {
        Self::TrustPromptDeclined {
            fingerprint: fingerprint.into(),
        }
    }

    /// Create a certificate-format error with the given message.
    pub fn certificate_format(msg: impl Into<String>) -> Self {
        Self::CertificateFormatInvalid(msg.into())
    }

    /// Create a store-unavailable error with the given message.
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a connection-unverified error for the given network name.
    pub fn unverified(ssid: impl Into<String>) -> Self {
        Self::ConnectionUnverified { ssid: ssid.into() }
    }

    /// Returns true if retrying the same operation later can succeed
    /// without changing endpoint or input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_)
                | Self::TrustPromptDeclined { .. }
                | Self::ConnectionUnverified { .. }
        )
    }
}
