// src/models/session.rs
//! Session state and its persisted snapshot.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::account::StellarAccount;

/// The client's current authentication status plus the bound account.
///
/// Exactly one `Session` exists per controller. It is created at startup
/// (restored or absent), mutated only by the controller's login/logout
/// operations, and cleared on logout or restore-integrity failure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub authenticated: bool,
    pub account: Option<StellarAccount>,
}

impl Session {
    /// An authenticated session holding the given account.
    pub fn authenticated(account: StellarAccount) -> Self {
        Session {
            authenticated: true,
            account: Some(account),
        }
    }

    /// The logged-out session.
    pub fn absent() -> Self {
        Session::default()
    }
}

/// Persisted snapshot of a [`Session`].
///
/// Serialized under a fixed storage key as
/// `{"isAuthenticated": …, "stellarAccount": …, "savedAt": …}`.
/// Client storage is same-origin-readable by any script, so the record
/// only ever repopulates the authenticated flag and the public account
/// triple; it never contains private key material.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub is_authenticated: bool,
    pub stellar_account: Option<StellarAccount>,
    /// Unix seconds at save time; drives the configured expiry policy.
    /// Records written before this field existed read as 0 and expire
    /// whenever a TTL is configured.
    #[serde(default)]
    pub saved_at: i64,
}

impl SessionRecord {
    /// Snapshots a session, stamping the save time.
    pub fn from_session(session: &Session) -> Self {
        SessionRecord {
            is_authenticated: session.authenticated,
            stellar_account: session.account.clone(),
            saved_at: Utc::now().timestamp(),
        }
    }

    /// Rehydrates the in-memory session; the timestamp is dropped once
    /// the expiry check has passed.
    pub fn into_session(self) -> Session {
        Session {
            authenticated: self.is_authenticated,
            account: self.stellar_account,
        }
    }
}
