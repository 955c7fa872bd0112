// src/services/account_resolver.rs
//! Maps a passkey credential to its bound smart-wallet account.
//!
//! Two paths exist: derivation plus registration for a brand-new
//! credential, and verified lookup for an existing one. Both end in the
//! same binding: for a given credential, `public_key` and `contract_id`
//! are stable and deterministic across resolutions.

use log::{debug, info, warn};

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::backend::client::BackendClient;
use crate::error::WalletError;
use crate::models::account::StellarAccount;
use crate::models::credential::{CoseAlgorithm, Credential};
use crate::utils::{crypto, strkey};
use crate::wallet::types::Assertion;

/// Whether a refreshed balance is live or the retained prior snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceFreshness {
    Fresh,
    Stale,
}

/// Resolves credentials to accounts against the backend service.
pub struct AccountResolver {
    backend: BackendClient,
}

impl AccountResolver {
    pub fn new(backend: BackendClient) -> Self {
        AccountResolver { backend }
    }

    /// Derives the account verifying key for a credential.
    ///
    /// SHA-256 over the raw credential public key, strkey-encoded. The
    /// transform is one-way and collision-resistant, and is pinned with
    /// the backend: the same credential must always yield the same key,
    /// or resolution breaks irrecoverably for existing users.
    ///
    /// # Errors
    /// [`WalletError::DerivationError`] for any algorithm other than
    /// Ed25519 (COSE -8).
    pub fn derive_public_key(credential: &Credential) -> Result<String, WalletError> {
        if credential.algorithm != CoseAlgorithm::Ed25519 {
            return Err(WalletError::DerivationError {
                algorithm: credential.algorithm.cose_id(),
            });
        }
        let key = crypto::derive_account_key(&credential.public_key);
        debug!(
            "derived account key {} for credential {}",
            hex::encode(key),
            credential.id
        );
        Ok(strkey::encode_account(&key))
    }

    /// Binds a freshly registered credential to a new account.
    ///
    /// Registers the binding with the backend so future lookups succeed,
    /// then reads the account back so the returned balance is the
    /// backend's opening value.
    ///
    /// # Errors
    /// - [`WalletError::DerivationError`] for unsupported key algorithms
    /// - [`WalletError::RegistrationConflict`] when the backend reports
    ///   the account bound to a different credential, or hands back a
    ///   binding that does not match the local derivation
    /// - [`WalletError::BackendUnavailable`] on transport failure
    pub async fn resolve_new(&self, credential: &Credential) -> Result<StellarAccount, WalletError> {
        let derived = Self::derive_public_key(credential)?;
        let credential_ref = credential.id.encode();

        let contract_id = self
            .backend
            .register_account(&credential_ref, &derived)
            .await?;
        let account = self.backend.fetch_account(&credential_ref).await?;
        strkey::decode_contract(&account.contract_id)
            .map_err(|e| WalletError::InvalidAccount(e.to_string()))?;

        if account.public_key != derived || account.contract_id != contract_id {
            warn!(
                "backend binding for credential {} disagrees with registration",
                credential.id
            );
            return Err(WalletError::RegistrationConflict);
        }

        info!(
            "bound credential {} to contract {}",
            credential.id, account.contract_id
        );
        Ok(StellarAccount {
            public_key: account.public_key,
            contract_id: account.contract_id,
            balance: account.balance,
        })
    }

    /// Looks up the account previously bound to a credential.
    ///
    /// The assertion signature is verified locally against the
    /// credential's public key before the backend response is trusted,
    /// and the backend's claimed account key is cross-checked against
    /// the local derivation, so a compromised transport can
    /// neither skip proof-of-possession nor substitute another account.
    ///
    /// # Errors
    /// - [`WalletError::SignatureMismatch`] when local verification or
    ///   the derivation cross-check fails; fatal, never retried here
    /// - [`WalletError::AccountNotFound`] when no binding exists
    /// - [`WalletError::BackendUnavailable`] once read retries are
    ///   exhausted
    pub async fn resolve_existing(
        &self,
        credential: &Credential,
        assertion: &Assertion,
    ) -> Result<StellarAccount, WalletError> {
        verify_assertion(credential, assertion)?;
        let derived = Self::derive_public_key(credential)?;

        let account = self.backend.fetch_account(&credential.id.encode()).await?;
        strkey::decode_contract(&account.contract_id)
            .map_err(|e| WalletError::InvalidAccount(e.to_string()))?;
        if account.public_key != derived {
            warn!(
                "backend account key for credential {} does not match local derivation",
                credential.id
            );
            return Err(WalletError::SignatureMismatch);
        }

        Ok(StellarAccount {
            public_key: account.public_key,
            contract_id: account.contract_id,
            balance: account.balance,
        })
    }

    /// Re-fetches the balance snapshot only; `public_key`/`contract_id`
    /// are never touched.
    ///
    /// Best-effort: on any backend failure the prior account comes back
    /// unchanged, tagged [`BalanceFreshness::Stale`]. A degraded balance
    /// display beats blocking the session.
    pub async fn refresh_balance(
        &self,
        account: &StellarAccount,
    ) -> (StellarAccount, BalanceFreshness) {
        match self.backend.fetch_balance(&account.contract_id).await {
            Ok(balance) => (account.with_balance(balance), BalanceFreshness::Fresh),
            Err(e) => {
                warn!("balance refresh failed, keeping prior snapshot: {}", e);
                (account.clone(), BalanceFreshness::Stale)
            }
        }
    }
}

fn verify_assertion(credential: &Credential, assertion: &Assertion) -> Result<(), WalletError> {
    let verifying_key =
        VerifyingKey::from_bytes(&credential.public_key).map_err(|_| WalletError::SignatureMismatch)?;
    let signature =
        Signature::from_slice(&assertion.signature).map_err(|_| WalletError::SignatureMismatch)?;
    verifying_key
        .verify(&assertion.signed_payload(), &signature)
        .map_err(|_| WalletError::SignatureMismatch)
}
