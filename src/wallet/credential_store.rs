// src/wallet/credential_store.rs
//! WebAuthn registration/authentication ceremonies and raw signing.
//!
//! Wraps a platform [`Authenticator`] and enforces the signature-counter
//! invariant across uses: a counter that fails to advance past its
//! high-water mark signals a cloned credential and is fatal for that
//! credential.
//!
//! All operations are single-attempt. Platform ceremonies are not safely
//! automatable, so a failed ceremony is retried only by a fresh user
//! action initiated by the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{info, warn};
use rand::RngCore;

use super::authenticator::Authenticator;
use super::types::{Assertion, AssertionOptions, CreationOptions, RelyingParty};
use crate::error::WalletError;
use crate::models::credential::{Credential, CredentialId};

/// Runs passkey ceremonies and tracks per-credential signature counters.
pub struct CredentialStore {
    authenticator: Arc<dyn Authenticator>,
    rp: RelyingParty,
    /// Highest signature counter observed per credential.
    counters: Mutex<HashMap<CredentialId, u32>>,
}

impl CredentialStore {
    pub fn new(authenticator: Arc<dyn Authenticator>, rp: RelyingParty) -> Self {
        CredentialStore {
            authenticator,
            rp,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Requests platform key generation bound to the application's
    /// relying party.
    ///
    /// Suspends on user interaction; cancel by dropping the future.
    ///
    /// # Errors
    /// [`WalletError::UnsupportedPlatform`], [`WalletError::UserCancelled`],
    /// [`WalletError::DuplicateCredential`], all surfaced untouched from
    /// the authenticator.
    pub async fn register(&self, user_handle: &str) -> Result<Credential, WalletError> {
        let options = CreationOptions {
            rp: self.rp.clone(),
            user_handle: user_handle.to_string(),
            challenge: fresh_challenge(),
        };
        let credential = self.authenticator.make_credential(&options).await?;
        self.counters
            .lock()
            .unwrap()
            .insert(credential.id.clone(), credential.counter);
        info!("registered credential {}", credential.id);
        Ok(credential)
    }

    /// Requests an assertion over a fresh random challenge.
    ///
    /// Returns the credential used alongside the signed assertion.
    /// Suspends on user interaction; cancel by dropping the future.
    ///
    /// # Errors
    /// [`WalletError::UserCancelled`], [`WalletError::NoCredentialAvailable`],
    /// or [`WalletError::CounterRegression`] when the signature counter did
    /// not increase, a possible-cloning signal that is fatal for the
    /// credential and must not be ignored.
    pub async fn authenticate(
        &self,
        allowed: Option<&[CredentialId]>,
    ) -> Result<(Credential, Assertion), WalletError> {
        let options = AssertionOptions {
            rp: self.rp.clone(),
            challenge: fresh_challenge(),
            allow_credentials: allowed.map(|ids| ids.to_vec()),
        };
        let (credential, assertion) = self.authenticator.get_assertion(&options).await?;
        self.note_counter(&credential.id, assertion.counter)?;
        Ok((credential, assertion))
    }

    /// Signs a caller-supplied challenge with a specific credential,
    /// proving liveness/binding to the chain layer.
    ///
    /// Triggers a user-presence prompt like any other ceremony; cancel
    /// by dropping the future.
    pub async fn sign(
        &self,
        credential_id: &CredentialId,
        challenge: [u8; 32],
    ) -> Result<Vec<u8>, WalletError> {
        let options = AssertionOptions {
            rp: self.rp.clone(),
            challenge,
            allow_credentials: Some(vec![credential_id.clone()]),
        };
        let (credential, assertion) = self.authenticator.get_assertion(&options).await?;
        self.note_counter(&credential.id, assertion.counter)?;
        Ok(assertion.signature)
    }

    /// The highest counter seen for a credential, if any use was observed.
    pub fn last_counter(&self, credential_id: &CredentialId) -> Option<u32> {
        self.counters.lock().unwrap().get(credential_id).copied()
    }

    fn note_counter(&self, id: &CredentialId, received: u32) -> Result<(), WalletError> {
        let mut counters = self.counters.lock().unwrap();
        if let Some(&stored) = counters.get(id) {
            // Authenticators that do not implement counters report 0
            // forever; that is allowed. A counter that fails to advance
            // past a known value is not.
            if received <= stored && !(stored == 0 && received == 0) {
                warn!(
                    "credential {} counter regressed ({} -> {}); treating as cloned",
                    id, stored, received
                );
                return Err(WalletError::CounterRegression {
                    credential_id: id.encode(),
                    stored,
                    received,
                });
            }
        }
        counters.insert(id.clone(), received);
        Ok(())
    }
}

fn fresh_challenge() -> [u8; 32] {
    let mut challenge = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut challenge);
    challenge
}
