// src/storage/session_cache.rs
//! Durable, tamper-evident persistence of the session across restarts.
//!
//! The cache writes exactly two keys: the session record and the
//! credential reference used to re-arm later ceremonies. `clear` removes
//! both; logout must leave no orphaned fragments. A record that is
//! malformed, expired, or carries an ill-formed account is purged and
//! reported absent: the fail-safe direction is logged-out, never
//! logged-in.
//!
//! Everything written here is public material (the identity triple, the
//! authenticated flag, a timestamp, the credential id). Private keys
//! never leave the authenticator and must never reach this layer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};

use super::store::StorageBackend;
use crate::error::WalletError;
use crate::models::credential::CredentialId;
use crate::models::session::{Session, SessionRecord};

/// Storage key for the serialized [`SessionRecord`].
pub const SESSION_KEY: &str = "wallet.session";
/// Storage key for the persisted credential reference.
pub const CREDENTIAL_KEY: &str = "wallet.credential_id";

/// Session persistence over a [`StorageBackend`].
pub struct SessionCache {
    store: Arc<dyn StorageBackend>,
    ttl: Option<Duration>,
}

impl SessionCache {
    /// `ttl` bounds how long a persisted session stays trusted; `None`
    /// disables expiry.
    pub fn new(store: Arc<dyn StorageBackend>, ttl: Option<Duration>) -> Self {
        SessionCache { store, ttl }
    }

    /// Serializes the session (and, when present, the credential
    /// reference) under the fixed keys, overwriting atomically.
    pub fn save(
        &self,
        session: &Session,
        credential_id: Option<&CredentialId>,
    ) -> Result<(), WalletError> {
        let record = SessionRecord::from_session(session);
        self.store
            .put(SESSION_KEY, &serde_json::to_string(&record)?)?;
        if let Some(id) = credential_id {
            self.store.put(CREDENTIAL_KEY, &id.encode())?;
        }
        Ok(())
    }

    /// Restores the persisted session, or reports absence.
    ///
    /// Malformed or unparsable content is purged before returning
    /// absent, as are expired records and records whose account fails
    /// strkey validation. Storage read failures also read as absent:
    /// a broken cache must degrade to logged-out, not block startup.
    pub fn load(&self) -> Option<Session> {
        self.try_load().unwrap_or(None)
    }

    /// Like [`load`](Self::load), but a purged corrupt record surfaces
    /// as [`WalletError::CorruptSession`] so the caller can report the
    /// self-healing. Expired records read as plain absence.
    pub fn try_load(&self) -> Result<Option<Session>, WalletError> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("session storage unreadable: {}", e);
                return Ok(None);
            }
        };

        let record: SessionRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("purging malformed session record: {}", e);
                self.purge();
                return Err(WalletError::CorruptSession);
            }
        };

        if self.expired(&record) {
            debug!("session record expired, purging");
            self.purge();
            return Ok(None);
        }

        let session = record.into_session();
        if session.authenticated {
            match &session.account {
                Some(account) if account.is_well_formed() => {}
                _ => {
                    warn!("purging session record with ill-formed account");
                    self.purge();
                    return Err(WalletError::CorruptSession);
                }
            }
        }
        Ok(Some(session))
    }

    /// The persisted credential reference, if one survives validation.
    pub fn credential_id(&self) -> Option<CredentialId> {
        let raw = self.store.get(CREDENTIAL_KEY).ok().flatten()?;
        match CredentialId::decode(&raw) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("purging undecodable credential reference");
                self.store.remove(CREDENTIAL_KEY).ok();
                None
            }
        }
    }

    /// Removes every key this cache ever writes.
    pub fn clear(&self) -> Result<(), WalletError> {
        self.store.remove(SESSION_KEY)?;
        self.store.remove(CREDENTIAL_KEY)?;
        Ok(())
    }

    fn expired(&self, record: &SessionRecord) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        let age = Utc::now().timestamp() - record.saved_at;
        // A clock that moved backwards past the save time also fails the
        // trust window
        age < 0 || age as u64 > ttl.as_secs()
    }

    fn purge(&self) {
        if let Err(e) = self.clear() {
            warn!("failed to purge session storage: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::StellarAccount;
    use crate::storage::store::MemoryStore;
    use crate::utils::strkey;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn account() -> StellarAccount {
        StellarAccount {
            public_key: strkey::encode_account(&[3u8; 32]),
            contract_id: strkey::encode_contract(&[4u8; 32]),
            balance: Decimal::from_str("50.25").unwrap(),
        }
    }

    fn cache_over(store: Arc<MemoryStore>, ttl: Option<Duration>) -> SessionCache {
        SessionCache::new(store, ttl)
    }

    #[test]
    fn saved_session_restores_with_credential_reference() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store, None);
        let id = CredentialId::new(vec![1, 2, 3]);

        cache
            .save(&Session::authenticated(account()), Some(&id))
            .unwrap();

        let restored = cache.load().unwrap();
        assert!(restored.authenticated);
        assert_eq!(restored.account, Some(account()));
        assert_eq!(cache.credential_id(), Some(id));
    }

    #[test]
    fn clear_then_load_is_absent() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), None);
        cache
            .save(
                &Session::authenticated(account()),
                Some(&CredentialId::new(vec![9])),
            )
            .unwrap();

        cache.clear().unwrap();
        assert!(cache.load().is_none());
        assert!(cache.credential_id().is_none());
        // No orphaned fragments under either key
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
    }

    #[test]
    fn malformed_record_is_purged_not_trusted() {
        let store = Arc::new(MemoryStore::new());
        store.put(SESSION_KEY, "{not valid json").unwrap();
        let cache = cache_over(store.clone(), None);

        assert!(cache.load().is_none());
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn expired_record_behaves_like_a_corrupt_one() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), Some(Duration::from_secs(60)));

        // Hand-write a record saved well outside the trust window
        let stale = serde_json::json!({
            "isAuthenticated": true,
            "stellarAccount": account(),
            "savedAt": Utc::now().timestamp() - 3600,
        });
        store.put(SESSION_KEY, &stale.to_string()).unwrap();

        assert!(cache.load().is_none());
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn ill_formed_account_is_purged() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), None);

        let bogus = serde_json::json!({
            "isAuthenticated": true,
            "stellarAccount": {
                "publicKey": "not-a-strkey",
                "contractId": "also-not-one",
                "balance": 1.0,
            },
            "savedAt": Utc::now().timestamp(),
        });
        store.put(SESSION_KEY, &bogus.to_string()).unwrap();

        assert!(cache.load().is_none());
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn fresh_record_survives_the_ttl_check() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store, Some(Duration::from_secs(3600)));
        cache
            .save(&Session::authenticated(account()), None)
            .unwrap();
        assert!(cache.load().is_some());
    }
}
