// src/wallet/authenticator.rs
//! The seam between this library and the platform authenticator.

use async_trait::async_trait;

use super::types::{Assertion, AssertionOptions, CreationOptions};
use crate::error::WalletError;
use crate::models::credential::Credential;

/// Platform authenticator operations.
///
/// Both ceremonies suspend on user interaction (presence/biometric
/// prompt) and may suspend indefinitely; a caller cancels by dropping
/// the returned future. Implementations are single-attempt: a failed
/// ceremony is only ever retried by a fresh user action, never
/// automatically.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Creates a new credential bound to the relying party.
    ///
    /// # Errors
    /// - [`WalletError::UnsupportedPlatform`] when no authenticator exists
    /// - [`WalletError::UserCancelled`] when the user aborts the prompt
    /// - [`WalletError::DuplicateCredential`] when a credential already
    ///   exists for this user handle on this authenticator
    async fn make_credential(&self, options: &CreationOptions) -> Result<Credential, WalletError>;

    /// Signs a challenge with an existing credential's private key.
    ///
    /// Returns the credential reference that produced the assertion
    /// (including its cached public-key bytes) alongside the assertion.
    ///
    /// # Errors
    /// - [`WalletError::UserCancelled`] when the user aborts the prompt
    /// - [`WalletError::NoCredentialAvailable`] when no (allowed)
    ///   credential exists on this authenticator
    async fn get_assertion(
        &self,
        options: &AssertionOptions,
    ) -> Result<(Credential, Assertion), WalletError>;
}

/// Authenticator for platforms without passkey support.
///
/// Every ceremony fails with [`WalletError::UnsupportedPlatform`],
/// letting embedders keep one code path and surface the error kind to
/// the user.
pub struct UnavailableAuthenticator;

#[async_trait]
impl Authenticator for UnavailableAuthenticator {
    async fn make_credential(&self, _options: &CreationOptions) -> Result<Credential, WalletError> {
        Err(WalletError::UnsupportedPlatform)
    }

    async fn get_assertion(
        &self,
        _options: &AssertionOptions,
    ) -> Result<(Credential, Assertion), WalletError> {
        Err(WalletError::UnsupportedPlatform)
    }
}
