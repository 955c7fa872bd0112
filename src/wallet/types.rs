// src/wallet/types.rs
//! Ceremony option and response types exchanged with an authenticator.

use crate::models::credential::CredentialId;

/// Relying-party identity presented to the authenticator.
///
/// Credentials are bound to `id` (the domain); `origin` is folded into
/// the client data each assertion signs over.
#[derive(Clone, Debug)]
pub struct RelyingParty {
    pub id: String,
    pub origin: String,
    pub name: String,
}

/// Parameters for a registration ceremony (credential creation).
#[derive(Clone, Debug)]
pub struct CreationOptions {
    pub rp: RelyingParty,
    /// Stable handle for the user the credential belongs to.
    pub user_handle: String,
    pub challenge: [u8; 32],
}

/// Parameters for an authentication ceremony (assertion request).
#[derive(Clone, Debug)]
pub struct AssertionOptions {
    pub rp: RelyingParty,
    pub challenge: [u8; 32],
    /// Restrict the ceremony to these credentials; `None` lets the
    /// authenticator pick any resident credential for the relying party.
    pub allow_credentials: Option<Vec<CredentialId>>,
}

/// A signed proof-of-possession response to an authentication challenge.
///
/// The signature covers `authenticator_data || client_data_hash`, where
/// `authenticator_data` carries the relying-party id hash, the flags
/// byte, and the big-endian signature counter.
#[derive(Clone, Debug)]
pub struct Assertion {
    pub credential_id: CredentialId,
    pub authenticator_data: Vec<u8>,
    pub client_data_hash: [u8; 32],
    pub signature: Vec<u8>,
    /// Counter value embedded in `authenticator_data`, surfaced for
    /// monotonicity checks.
    pub counter: u32,
}

impl Assertion {
    /// The exact byte sequence the authenticator signed.
    pub fn signed_payload(&self) -> Vec<u8> {
        let mut payload = self.authenticator_data.clone();
        payload.extend_from_slice(&self.client_data_hash);
        payload
    }
}
