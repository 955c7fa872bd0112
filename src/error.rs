// src/error.rs
//! Typed failure taxonomy for the identity/session layer.
//!
//! Every fallible operation in the crate surfaces a [`WalletError`].
//! Variants are grouped into four policy categories (see
//! [`ErrorCategory`]):
//! - **UserAction**: surfaced to the user, retried only by a fresh user
//!   action (platform ceremonies are not safely automatable)
//! - **Integrity**: fatal for the credential in use; the session is
//!   forced to unauthenticated and the failure is never auto-retried
//! - **Transient**: safe to retry with backoff; callers degrade
//!   gracefully (e.g. keep showing a cached balance)
//! - **Corruption**: self-healing; the offending record is purged and
//!   the session falls back to unauthenticated
//!
//! The controller is the only place that turns these failures into state
//! transitions; the presentation layer sees a [`LastError`] descriptor,
//! never a raw transport error.

use thiserror::Error;

/// Policy category of a [`WalletError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Needs a fresh user action; never retried by the library.
    UserAction,
    /// Fatal for the credential in use; forces unauthenticated.
    Integrity,
    /// Safe to retry with backoff.
    Transient,
    /// Self-healing; the offending record is purged.
    Corruption,
    /// Everything else (programming or environment faults).
    Internal,
}

/// All failures surfaced by the identity/session layer.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No platform authenticator is available on this device.
    #[error("no platform authenticator is available")]
    UnsupportedPlatform,

    /// The user dismissed or aborted the ceremony prompt.
    #[error("the user cancelled the ceremony")]
    UserCancelled,

    /// A credential already exists for this user handle on this
    /// authenticator.
    #[error("a credential is already registered for user handle '{0}'")]
    DuplicateCredential(String),

    /// The authenticator holds no credential usable for the ceremony.
    #[error("no credential is available on this authenticator")]
    NoCredentialAvailable,

    /// The signature counter failed to advance. Signals a cloned
    /// authenticator; fatal for this credential.
    #[error(
        "signature counter regressed for credential {credential_id}: \
         stored {stored}, received {received}"
    )]
    CounterRegression {
        credential_id: String,
        stored: u32,
        received: u32,
    },

    /// The credential's key algorithm cannot be mapped to an account key.
    #[error("cannot derive an account key from COSE algorithm {algorithm}")]
    DerivationError { algorithm: i64 },

    /// The backend reports the derived account already bound to a
    /// different credential.
    #[error("account is already bound to a different credential")]
    RegistrationConflict,

    /// No account is bound to the presented credential.
    #[error("no account is bound to credential {0}")]
    AccountNotFound(String),

    /// Local verification of an assertion (or of the backend's claimed
    /// account key) failed. Fatal; never auto-retried.
    #[error("assertion signature did not verify against the credential public key")]
    SignatureMismatch,

    /// The backend could not be reached or answered with a server error.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A second ceremony was requested while one is already in flight.
    #[error("another authentication ceremony is already in flight")]
    ConcurrentAuthentication,

    /// An operation that requires an authenticated session was called
    /// without one.
    #[error("no authenticated session")]
    NotAuthenticated,

    /// The persisted session record was malformed and has been purged.
    #[error("persisted session record was malformed and has been purged")]
    CorruptSession,

    /// An account identifier failed strkey validation.
    #[error("invalid account encoding: {0}")]
    InvalidAccount(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

impl WalletError {
    /// The retry/transition policy bucket this failure belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            WalletError::UnsupportedPlatform
            | WalletError::UserCancelled
            | WalletError::DuplicateCredential(_)
            | WalletError::NoCredentialAvailable
            | WalletError::ConcurrentAuthentication => ErrorCategory::UserAction,
            WalletError::CounterRegression { .. }
            | WalletError::RegistrationConflict
            | WalletError::SignatureMismatch => ErrorCategory::Integrity,
            WalletError::BackendUnavailable(_) => ErrorCategory::Transient,
            WalletError::CorruptSession => ErrorCategory::Corruption,
            WalletError::DerivationError { .. }
            | WalletError::AccountNotFound(_)
            | WalletError::NotAuthenticated
            | WalletError::InvalidAccount(_)
            | WalletError::Serialization(_)
            | WalletError::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// True when a retry with backoff is safe (read-only transient faults).
    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

/// Presentation-facing descriptor of the last failure.
///
/// Carries the policy category plus a display message; intentionally
/// detached from the error value so transport internals never leak into
/// the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&WalletError> for LastError {
    fn from(error: &WalletError) -> Self {
        LastError {
            category: error.category(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_failures_are_never_transient() {
        let regression = WalletError::CounterRegression {
            credential_id: "abc".to_string(),
            stored: 4,
            received: 2,
        };
        assert_eq!(regression.category(), ErrorCategory::Integrity);
        assert!(!regression.is_transient());
        assert_eq!(
            WalletError::SignatureMismatch.category(),
            ErrorCategory::Integrity
        );
    }

    #[test]
    fn backend_outage_is_transient() {
        let outage = WalletError::BackendUnavailable("connection refused".to_string());
        assert!(outage.is_transient());
    }

    #[test]
    fn last_error_hides_nothing_needed_by_presentation() {
        let error = WalletError::UserCancelled;
        let descriptor = LastError::from(&error);
        assert_eq!(descriptor.category, ErrorCategory::UserAction);
        assert_eq!(descriptor.message, error.to_string());
    }
}
