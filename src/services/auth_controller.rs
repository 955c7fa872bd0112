// src/services/auth_controller.rs
//! The authenticated/unauthenticated state machine.
//!
//! `AuthSessionController` orchestrates the credential store, the
//! account resolver, and the session cache into two flows
//! (register/login and resume) and is the only place in the crate that
//! mutates the [`Session`]. The presentation layer observes `state()`,
//! `account()`, and `last_error()`; it never sees raw transport errors.
//!
//! States: `Initializing -> {Unauthenticated, Authenticated}`;
//! `Unauthenticated -> Authenticating -> {Authenticated, Unauthenticated}`;
//! `Authenticated -> logout -> Unauthenticated`.
//!
//! Only one ceremony may be in flight at a time. A second
//! `login_or_register` while `Authenticating` is rejected with
//! [`WalletError::ConcurrentAuthentication`] rather than queued or
//! raced. A login future dropped mid-ceremony (tab closed, navigation)
//! releases the in-flight guard and leaves the machine
//! `Unauthenticated` with no partial writes.

use std::sync::Mutex;

use log::{debug, info, warn};

use super::account_resolver::{AccountResolver, BalanceFreshness};
use crate::error::{ErrorCategory, LastError, WalletError};
use crate::models::account::StellarAccount;
use crate::models::credential::CredentialId;
use crate::models::session::Session;
use crate::storage::session_cache::SessionCache;
use crate::wallet::credential_store::CredentialStore;

/// Externally observable controller states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Unauthenticated,
    Authenticating,
    Authenticated,
}

struct ControllerInner {
    state: AuthState,
    session: Session,
    credential_id: Option<CredentialId>,
    last_error: Option<LastError>,
}

/// Orchestrates passkey ceremonies, account resolution, and session
/// persistence behind a single state machine.
pub struct AuthSessionController {
    store: CredentialStore,
    resolver: AccountResolver,
    cache: SessionCache,
    inner: Mutex<ControllerInner>,
}

/// Releases the in-flight flag when a ceremony future is dropped before
/// committing, so cancellation cannot wedge the machine in
/// `Authenticating`.
struct CeremonyGuard<'a> {
    inner: &'a Mutex<ControllerInner>,
    armed: bool,
}

impl Drop for CeremonyGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.state == AuthState::Authenticating {
            inner.state = AuthState::Unauthenticated;
        }
    }
}

impl AuthSessionController {
    pub fn new(store: CredentialStore, resolver: AccountResolver, cache: SessionCache) -> Self {
        AuthSessionController {
            store,
            resolver,
            cache,
            inner: Mutex::new(ControllerInner {
                state: AuthState::Initializing,
                session: Session::absent(),
                credential_id: None,
                last_error: None,
            }),
        }
    }

    /// Restores the session from the cache, or settles unauthenticated.
    ///
    /// A well-formed authenticated record transitions straight to
    /// `Authenticated` without re-running a ceremony. The security
    /// boundary of this trust-on-persisted-session model is the
    /// storage's same-origin isolation plus the configured TTL, not
    /// re-authentication on every load; embedders wanting stricter
    /// guarantees re-assert before sensitive operations instead.
    pub fn start(&self) -> AuthState {
        let restored = self.cache.try_load();
        let mut inner = self.inner.lock().unwrap();
        match restored {
            Ok(Some(session)) if session.authenticated && session.account.is_some() => {
                inner.credential_id = self.cache.credential_id();
                inner.session = session;
                inner.state = AuthState::Authenticated;
                info!("session restored from storage");
            }
            Ok(_) => {
                inner.session = Session::absent();
                inner.state = AuthState::Unauthenticated;
                debug!("no restorable session, starting unauthenticated");
            }
            Err(error) => {
                // The cache already healed itself; report what happened
                warn!("session restore failed: {}", error);
                inner.last_error = Some(LastError::from(&error));
                inner.session = Session::absent();
                inner.state = AuthState::Unauthenticated;
            }
        }
        inner.state
    }

    /// Runs the login-or-register flow.
    ///
    /// Attempts an assertion with any persisted credential reference;
    /// when the authenticator holds no usable credential, falls back to
    /// registering a new one and binding a new account. On success the
    /// session is persisted and the bound account returned. On any fatal
    /// failure the machine returns to `Unauthenticated` and the error
    /// kind is surfaced; a failed user ceremony is never silently
    /// retried. Integrity failures additionally clear the persisted
    /// session, forcing the logged-out state to survive a reload.
    ///
    /// Invoking this while a ceremony is already in flight returns
    /// [`WalletError::ConcurrentAuthentication`] and leaves the running
    /// ceremony untouched. Invoking it while `Authenticated` runs a
    /// fresh ceremony (re-assertion).
    pub async fn login_or_register(
        &self,
        user_handle: &str,
    ) -> Result<StellarAccount, WalletError> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == AuthState::Authenticating {
                return Err(WalletError::ConcurrentAuthentication);
            }
            inner.state = AuthState::Authenticating;
            inner.last_error = None;
        }

        let mut guard = CeremonyGuard {
            inner: &self.inner,
            armed: true,
        };
        let outcome = self.run_ceremony(user_handle).await;
        // Committing below; the guard's cancellation path is no longer needed
        guard.armed = false;
        drop(guard);

        match outcome {
            Ok((account, credential_id)) => {
                let session = Session::authenticated(account.clone());
                if let Err(e) = self.cache.save(&session, Some(&credential_id)) {
                    warn!("failed to persist session: {}", e);
                }
                let mut inner = self.inner.lock().unwrap();
                inner.state = AuthState::Authenticated;
                inner.session = session;
                inner.credential_id = Some(credential_id);
                info!("authenticated; bound contract {}", account.contract_id);
                Ok(account)
            }
            Err(error) => {
                warn!("authentication failed: {}", error);
                if error.category() == ErrorCategory::Integrity {
                    // Fatal for the credential in use: the logged-out
                    // state must also survive a reload
                    if let Err(e) = self.cache.clear() {
                        warn!("failed to clear session storage: {}", e);
                    }
                }
                let mut inner = self.inner.lock().unwrap();
                inner.state = AuthState::Unauthenticated;
                inner.session = Session::absent();
                inner.credential_id = None;
                inner.last_error = Some(LastError::from(&error));
                Err(error)
            }
        }
    }

    /// Clears the persisted session and the in-memory account.
    ///
    /// Idempotent: logging out while already unauthenticated is a no-op.
    pub fn logout(&self) {
        {
            let inner = self.inner.lock().unwrap();
            if inner.state != AuthState::Authenticated {
                return;
            }
        }
        if let Err(e) = self.cache.clear() {
            warn!("failed to clear session storage: {}", e);
        }
        let mut inner = self.inner.lock().unwrap();
        inner.state = AuthState::Unauthenticated;
        inner.session = Session::absent();
        inner.credential_id = None;
        info!("logged out");
    }

    /// Refreshes the bound account's balance snapshot.
    ///
    /// Never transitions session state: a failed refresh keeps the prior
    /// snapshot and tags it stale. A fresh snapshot is persisted so a
    /// later restore sees the updated balance.
    pub async fn refresh_balance(
        &self,
    ) -> Result<(StellarAccount, BalanceFreshness), WalletError> {
        let account = {
            let inner = self.inner.lock().unwrap();
            match (inner.state, &inner.session.account) {
                (AuthState::Authenticated, Some(account)) => account.clone(),
                _ => return Err(WalletError::NotAuthenticated),
            }
        };

        let (refreshed, freshness) = self.resolver.refresh_balance(&account).await;
        if freshness == BalanceFreshness::Fresh {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == AuthState::Authenticated {
                inner.session = Session::authenticated(refreshed.clone());
                if let Err(e) = self
                    .cache
                    .save(&inner.session, inner.credential_id.as_ref())
                {
                    warn!("failed to persist refreshed balance: {}", e);
                }
            }
        }
        Ok((refreshed, freshness))
    }

    /// Current state of the machine.
    pub fn state(&self) -> AuthState {
        self.inner.lock().unwrap().state
    }

    /// The bound account while authenticated.
    pub fn account(&self) -> Option<StellarAccount> {
        self.inner.lock().unwrap().session.account.clone()
    }

    /// Descriptor of the most recent failure, if any.
    pub fn last_error(&self) -> Option<LastError> {
        self.inner.lock().unwrap().last_error.clone()
    }

    async fn run_ceremony(
        &self,
        user_handle: &str,
    ) -> Result<(StellarAccount, CredentialId), WalletError> {
        // Re-arm the ceremony with the persisted credential reference
        let allowed = self.cache.credential_id();
        let allowed = allowed.as_ref().map(std::slice::from_ref);

        match self.store.authenticate(allowed).await {
            Ok((credential, assertion)) => {
                let account = self.resolver.resolve_existing(&credential, &assertion).await?;
                Ok((account, credential.id))
            }
            Err(WalletError::NoCredentialAvailable) => {
                debug!("no existing credential, falling back to registration");
                let credential = self.store.register(user_handle).await?;
                let account = self.resolver.resolve_new(&credential).await?;
                Ok((account, credential.id))
            }
            Err(e) => Err(e),
        }
    }
}
