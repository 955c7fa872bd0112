// src/lib.rs

//! # Passkey Wallet
//!
//! Client-side identity and session layer for a passkey-bound Stellar
//! smart wallet. The library authenticates a user through a hardware-backed
//! passkey (WebAuthn), binds the credential to a non-custodial smart-wallet
//! account (public key + deployed contract id), and keeps a resumable
//! session across restarts without ever persisting private key material.
//!
//! ## Architecture Overview
//! 1. **Wallet Layer**: [`CredentialStore`] runs registration and
//!    authentication ceremonies against a platform [`Authenticator`]
//! 2. **Services Layer**: [`AccountResolver`] maps credentials to accounts;
//!    [`AuthSessionController`] owns the authenticated/unauthenticated
//!    state machine
//! 3. **Backend Layer**: typed REST client for the account service
//! 4. **Storage Layer**: durable, tamper-evident session persistence
//!
//! The presentation layer consumes the controller's four public
//! operations (`start`, `login_or_register`, `logout`, `refresh_balance`)
//! and only ever observes the resulting state plus an optional last-error
//! descriptor, never raw transport failures.

pub mod backend; // REST account-service client
pub mod config; // Environment-driven configuration
pub mod error; // Typed failure taxonomy
pub mod models; // Data structures
pub mod services; // Orchestration: resolver + state machine
pub mod storage; // Durable session persistence
pub mod utils; // Derivation transform + strkey codec
pub mod wallet; // Passkey ceremonies

pub use backend::client::BackendClient;
pub use config::Config;
pub use error::{ErrorCategory, LastError, WalletError};
pub use models::account::StellarAccount;
pub use models::credential::{CoseAlgorithm, Credential, CredentialId};
pub use models::session::{Session, SessionRecord};
pub use services::account_resolver::{AccountResolver, BalanceFreshness};
pub use services::auth_controller::{AuthSessionController, AuthState};
pub use storage::session_cache::SessionCache;
pub use storage::store::{FileStore, MemoryStore, StorageBackend};
pub use wallet::authenticator::Authenticator;
pub use wallet::credential_store::CredentialStore;
pub use wallet::software::SoftwareAuthenticator;
pub use wallet::types::RelyingParty;
