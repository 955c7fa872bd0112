// src/models/credential.rs
//! Passkey credential data model.
//!
//! A credential is owned by the platform authenticator; the application
//! only ever holds a reference to it: the opaque identifier plus cached
//! public-key bytes. Private key material never leaves the authenticator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// COSE signature algorithms an authenticator may mint credentials with.
///
/// Only [`CoseAlgorithm::Ed25519`] can be mapped to a Stellar account
/// key; anything else fails account derivation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoseAlgorithm {
    /// EdDSA over edwards25519 (COSE -8).
    Ed25519,
    /// ECDSA over P-256 with SHA-256 (COSE -7).
    Es256,
}

impl CoseAlgorithm {
    /// The IANA COSE algorithm identifier.
    pub fn cose_id(self) -> i64 {
        match self {
            CoseAlgorithm::Ed25519 => -8,
            CoseAlgorithm::Es256 => -7,
        }
    }
}

/// Opaque credential identifier issued by the authenticator.
///
/// Globally unique per authenticator and origin. The textual form used
/// for backend lookups and persisted references is base64url without
/// padding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CredentialId(Vec<u8>);

impl CredentialId {
    pub fn new(bytes: Vec<u8>) -> Self {
        CredentialId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// base64url (no padding) textual form.
    pub fn encode(&self) -> String {
        base64::encode_config(&self.0, base64::URL_SAFE_NO_PAD)
    }

    /// Parses the base64url textual form back into an identifier.
    pub fn decode(encoded: &str) -> Result<Self, base64::DecodeError> {
        base64::decode_config(encoded, base64::URL_SAFE_NO_PAD).map(CredentialId)
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// The application's reference to a passkey held by the authenticator.
///
/// # Fields
/// - `id`: opaque identifier, the backend lookup key
/// - `public_key`: cached verifying-key bytes (32-byte Ed25519 point)
/// - `algorithm`: COSE algorithm the credential signs with
/// - `counter`: signature counter at the last observed use; monotonically
///   non-decreasing across uses, regression signals a cloned authenticator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub id: CredentialId,
    pub public_key: [u8; 32],
    pub algorithm: CoseAlgorithm,
    pub counter: u32,
}
