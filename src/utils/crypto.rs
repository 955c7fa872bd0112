// src/utils/crypto.rs
//! Cryptographic utilities for account-key derivation.
//!
//! Uses SHA-256 for the one-way transform from credential public-key
//! material to the bound account key.

use sha2::{Digest, Sha256};

/// Computes a SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// The one-way transform from credential public-key material to the
/// 32-byte account key.
///
/// The same credential always yields the same key, and the transform is
/// collision-resistant and irreversible: the account key reveals nothing
/// about the credential. This mapping is agreed with the backend; any
/// change breaks account resolution irrecoverably for existing users.
pub fn derive_account_key(credential_public_key: &[u8]) -> [u8; 32] {
    sha256(credential_public_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let material = [0x42u8; 32];
        assert_eq!(derive_account_key(&material), derive_account_key(&material));
    }

    #[test]
    fn distinct_credentials_derive_distinct_keys() {
        let first = derive_account_key(&[1u8; 32]);
        let second = derive_account_key(&[2u8; 32]);
        assert_ne!(first, second);
    }

    #[test]
    fn derived_key_is_not_the_input() {
        // One-way: output must differ from the raw material
        let material = [9u8; 32];
        assert_ne!(derive_account_key(&material), material);
    }
}
