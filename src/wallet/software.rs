// src/wallet/software.rs
//! Software authenticator holding resident Ed25519 keys in memory.
//!
//! Stands in for platform hardware in tests and in embedders running
//! where no platform authenticator exists. Keys live in process memory
//! only and are never serialized; the rest of the library cannot tell it
//! apart from a hardware authenticator.
//!
//! The human side of a ceremony (presence prompts, dismissals, slow
//! interaction) is driven through simulation hooks:
//! [`deny_next_prompt`](SoftwareAuthenticator::deny_next_prompt),
//! [`set_prompt_delay`](SoftwareAuthenticator::set_prompt_delay), and
//! [`set_counter`](SoftwareAuthenticator::set_counter) (a cloned-device
//! rewind).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;

use super::authenticator::Authenticator;
use super::types::{Assertion, AssertionOptions, CreationOptions};
use crate::error::WalletError;
use crate::models::credential::{CoseAlgorithm, Credential, CredentialId};
use crate::utils::crypto::sha256;

// Authenticator-data flags: user present | user verified
const FLAGS_UP_UV: u8 = 0x05;

struct StoredKey {
    user_handle: String,
    signing_key: SigningKey,
    counter: u32,
}

enum KeySource {
    Os,
    Seeded { seed: u64, next: u64 },
}

/// In-memory Ed25519 authenticator.
pub struct SoftwareAuthenticator {
    keys: Mutex<HashMap<CredentialId, StoredKey>>,
    source: Mutex<KeySource>,
    deny_next: AtomicBool,
    prompt_delay: Mutex<Option<Duration>>,
    ceremonies: AtomicUsize,
}

impl SoftwareAuthenticator {
    /// An authenticator minting credentials from the system RNG.
    pub fn new() -> Self {
        SoftwareAuthenticator {
            keys: Mutex::new(HashMap::new()),
            source: Mutex::new(KeySource::Os),
            deny_next: AtomicBool::new(false),
            prompt_delay: Mutex::new(None),
            ceremonies: AtomicUsize::new(0),
        }
    }

    /// An authenticator minting deterministic credentials from a seed.
    ///
    /// Two authenticators built from the same seed mint identical key
    /// material in identical order, which lets a test predict credential
    /// ids and derived account keys before the ceremony runs.
    pub fn with_seed(seed: u64) -> Self {
        SoftwareAuthenticator {
            keys: Mutex::new(HashMap::new()),
            source: Mutex::new(KeySource::Seeded { seed, next: 0 }),
            deny_next: AtomicBool::new(false),
            prompt_delay: Mutex::new(None),
            ceremonies: AtomicUsize::new(0),
        }
    }

    /// The next ceremony fails as if the user dismissed the prompt.
    pub fn deny_next_prompt(&self) {
        self.deny_next.store(true, Ordering::SeqCst);
    }

    /// Makes every ceremony suspend for `delay` before completing,
    /// simulating a user taking their time at the presence prompt.
    pub fn set_prompt_delay(&self, delay: Option<Duration>) {
        *self.prompt_delay.lock().unwrap() = delay;
    }

    /// Rewinds a credential's signature counter, simulating a cloned
    /// authenticator that diverged from the device the relying party has
    /// seen. Returns false when the credential does not exist.
    pub fn set_counter(&self, credential_id: &CredentialId, value: u32) -> bool {
        match self.keys.lock().unwrap().get_mut(credential_id) {
            Some(stored) => {
                stored.counter = value;
                true
            }
            None => false,
        }
    }

    /// Number of ceremonies (of either kind) this authenticator ran.
    pub fn ceremony_count(&self) -> usize {
        self.ceremonies.load(Ordering::SeqCst)
    }

    async fn simulate_prompt(&self) -> Result<(), WalletError> {
        self.ceremonies.fetch_add(1, Ordering::SeqCst);
        let delay = *self.prompt_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.deny_next.swap(false, Ordering::SeqCst) {
            return Err(WalletError::UserCancelled);
        }
        Ok(())
    }

    fn mint_key(&self) -> (CredentialId, SigningKey) {
        let mut source = self.source.lock().unwrap();
        match &mut *source {
            KeySource::Os => {
                let signing_key = SigningKey::generate(&mut OsRng);
                let mut id = [0u8; 16];
                OsRng.fill_bytes(&mut id);
                (CredentialId::new(id.to_vec()), signing_key)
            }
            KeySource::Seeded { seed, next } => {
                let index = *next;
                *next += 1;
                let key_bytes = sha256(&seeded_material(*seed, b"key", index));
                let id_bytes = sha256(&seeded_material(*seed, b"id", index));
                (
                    CredentialId::new(id_bytes[..16].to_vec()),
                    SigningKey::from_bytes(&key_bytes),
                )
            }
        }
    }
}

impl Default for SoftwareAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

fn seeded_material(seed: u64, label: &[u8], index: u64) -> Vec<u8> {
    let mut material = Vec::with_capacity(8 + label.len() + 8);
    material.extend_from_slice(&seed.to_le_bytes());
    material.extend_from_slice(label);
    material.extend_from_slice(&index.to_le_bytes());
    material
}

#[async_trait]
impl Authenticator for SoftwareAuthenticator {
    async fn make_credential(&self, options: &CreationOptions) -> Result<Credential, WalletError> {
        self.simulate_prompt().await?;

        let mut keys = self.keys.lock().unwrap();
        if keys
            .values()
            .any(|stored| stored.user_handle == options.user_handle)
        {
            return Err(WalletError::DuplicateCredential(
                options.user_handle.clone(),
            ));
        }

        let (id, signing_key) = self.mint_key();
        let public_key = signing_key.verifying_key().to_bytes();
        keys.insert(
            id.clone(),
            StoredKey {
                user_handle: options.user_handle.clone(),
                signing_key,
                counter: 0,
            },
        );

        Ok(Credential {
            id,
            public_key,
            algorithm: CoseAlgorithm::Ed25519,
            counter: 0,
        })
    }

    async fn get_assertion(
        &self,
        options: &AssertionOptions,
    ) -> Result<(Credential, Assertion), WalletError> {
        self.simulate_prompt().await?;

        let mut keys = self.keys.lock().unwrap();
        let id = match &options.allow_credentials {
            Some(allowed) => allowed.iter().find(|id| keys.contains_key(*id)).cloned(),
            None => keys.keys().next().cloned(),
        };
        let id = id.ok_or(WalletError::NoCredentialAvailable)?;
        let stored = keys
            .get_mut(&id)
            .ok_or(WalletError::NoCredentialAvailable)?;

        stored.counter += 1;
        let counter = stored.counter;

        let mut authenticator_data = Vec::with_capacity(37);
        authenticator_data.extend_from_slice(&sha256(options.rp.id.as_bytes()));
        authenticator_data.push(FLAGS_UP_UV);
        authenticator_data.extend_from_slice(&counter.to_be_bytes());

        let client_data = format!(
            r#"{{"type":"webauthn.get","challenge":"{}","origin":"{}"}}"#,
            base64::encode_config(options.challenge, base64::URL_SAFE_NO_PAD),
            options.rp.origin,
        );
        let client_data_hash = sha256(client_data.as_bytes());

        let mut payload = authenticator_data.clone();
        payload.extend_from_slice(&client_data_hash);
        let signature = stored.signing_key.sign(&payload);

        let credential = Credential {
            id: id.clone(),
            public_key: stored.signing_key.verifying_key().to_bytes(),
            algorithm: CoseAlgorithm::Ed25519,
            counter,
        };
        let assertion = Assertion {
            credential_id: id,
            authenticator_data,
            client_data_hash,
            signature: signature.to_bytes().to_vec(),
            counter,
        };
        Ok((credential, assertion))
    }
}
