// src/models/account.rs
//! Bound smart-wallet account data model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::strkey;

/// A Stellar smart-wallet account bound to a passkey credential.
///
/// # Fields
/// - `public_key`: the account's verifying key, strkey-encoded (`G…`),
///   derived deterministically from the credential
/// - `contract_id`: the deployed smart-wallet contract address,
///   strkey-encoded (`C…`), recorded at registration time
/// - `balance`: last fetched balance snapshot
///
/// # Invariants
/// `public_key` and `contract_id` are immutable once bound to a
/// credential. `balance` is refreshable and may be stale; it is never
/// authoritative for spending decisions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StellarAccount {
    pub public_key: String,
    pub contract_id: String,
    pub balance: Decimal,
}

impl StellarAccount {
    /// Both identifiers decode as the expected strkey kinds.
    ///
    /// Used when restoring a persisted session: a record whose account
    /// fails this check is discarded rather than trusted.
    pub fn is_well_formed(&self) -> bool {
        strkey::decode_account(&self.public_key).is_ok()
            && strkey::decode_contract(&self.contract_id).is_ok()
    }

    /// The same binding with a replaced balance snapshot.
    pub fn with_balance(&self, balance: Decimal) -> Self {
        StellarAccount {
            public_key: self.public_key.clone(),
            contract_id: self.contract_id.clone(),
            balance,
        }
    }
}
