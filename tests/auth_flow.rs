// tests/auth_flow.rs
//! End-to-end flows through the controller: fresh-device registration,
//! resume, corruption self-healing, single-flight enforcement, cloned
//! credential handling, logout, and balance degradation. The platform
//! authenticator is the software implementation; the account service is
//! mocked at the HTTP boundary.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use mockito::{mock, Matcher, Mock};
use rust_decimal::Decimal;

use passkey_wallet::storage::session_cache::{CREDENTIAL_KEY, SESSION_KEY};
use passkey_wallet::utils::strkey;
use passkey_wallet::{
    AccountResolver, AuthSessionController, AuthState, BackendClient, Config, Credential,
    CredentialId, CredentialStore, ErrorCategory, MemoryStore, RelyingParty, Session,
    SessionCache, SoftwareAuthenticator, StellarAccount, StorageBackend, WalletError,
};
use passkey_wallet::services::account_resolver::BalanceFreshness;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rp() -> RelyingParty {
    RelyingParty {
        id: "localhost".to_string(),
        origin: "http://localhost:3000".to_string(),
        name: "Smart Wallet".to_string(),
    }
}

fn test_config() -> Config {
    Config {
        backend_url: mockito::server_url(),
        retry_attempts: 0,
        retry_base_delay: Duration::from_millis(5),
        session_ttl: Some(Duration::from_secs(3600)),
        ..Config::default()
    }
}

fn controller_with(
    authenticator: Arc<SoftwareAuthenticator>,
    storage: Arc<MemoryStore>,
) -> AuthSessionController {
    let config = test_config();
    let store = CredentialStore::new(authenticator, rp());
    let resolver = AccountResolver::new(BackendClient::new(&config).unwrap());
    let cache = SessionCache::new(storage, config.session_ttl);
    AuthSessionController::new(store, resolver, cache)
}

/// Predicts the first credential a seeded authenticator will mint, so
/// backend mocks can be registered before the real ceremony runs.
async fn preview_first_credential(seed: u64) -> Credential {
    let authenticator = Arc::new(SoftwareAuthenticator::with_seed(seed));
    let store = CredentialStore::new(authenticator, rp());
    store.register("preview").await.unwrap()
}

/// Registers the two mocks the registration flow hits: the binding POST
/// and the account lookup.
fn mock_registration(credential: &Credential, contract: &str, balance: &str) -> (Mock, Mock) {
    let derived = AccountResolver::derive_public_key(credential).unwrap();
    let credential_ref = credential.id.encode();
    let register = mock("POST", "/accounts/register")
        .match_body(Matcher::Json(serde_json::json!({
            "credentialId": credential_ref,
            "derivedPublicKey": derived,
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(serde_json::json!({ "contractId": contract }).to_string())
        .create();
    let lookup = mock("GET", format!("/accounts/{}", credential_ref).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "publicKey": derived,
                "contractId": contract,
                "balance": Decimal::from_str(balance).unwrap(),
            })
            .to_string(),
        )
        .create();
    (register, lookup)
}

fn restored_account() -> StellarAccount {
    StellarAccount {
        public_key: strkey::encode_account(&[0xa1; 32]),
        contract_id: strkey::encode_contract(&[0xa2; 32]),
        balance: Decimal::from_str("42.5").unwrap(),
    }
}

#[tokio::test]
async fn fresh_device_registers_and_binds_an_account() {
    init_logs();
    let credential = preview_first_credential(100).await;
    let contract = strkey::encode_contract(&[0x51; 32]);
    let (_register, _lookup) = mock_registration(&credential, &contract, "125.5");

    let authenticator = Arc::new(SoftwareAuthenticator::with_seed(100));
    let storage = Arc::new(MemoryStore::new());
    let controller = controller_with(authenticator.clone(), storage.clone());

    // No stored session, no existing credential
    assert_eq!(controller.start(), AuthState::Unauthenticated);

    let account = controller.login_or_register("alice").await.unwrap();
    assert_eq!(controller.state(), AuthState::Authenticated);
    assert_eq!(account.contract_id, contract);
    // Balance is the value the backend lookup returned
    assert_eq!(account.balance, Decimal::from_str("125.5").unwrap());

    // One failed assertion attempt, then the registration ceremony
    assert_eq!(authenticator.ceremony_count(), 2);

    // Session and credential reference persisted for later resume
    assert!(storage.get(SESSION_KEY).unwrap().is_some());
    assert_eq!(
        storage.get(CREDENTIAL_KEY).unwrap(),
        Some(credential.id.encode())
    );
}

#[tokio::test]
async fn resume_never_reinvokes_the_authenticator() {
    init_logs();
    let storage = Arc::new(MemoryStore::new());
    let cache = SessionCache::new(storage.clone(), None);
    cache
        .save(
            &Session::authenticated(restored_account()),
            Some(&CredentialId::new(vec![7, 7, 7])),
        )
        .unwrap();

    let authenticator = Arc::new(SoftwareAuthenticator::new());
    let controller = controller_with(authenticator.clone(), storage);

    assert_eq!(controller.start(), AuthState::Authenticated);
    assert_eq!(controller.account(), Some(restored_account()));
    assert_eq!(authenticator.ceremony_count(), 0);
}

#[tokio::test]
async fn corrupted_record_heals_to_unauthenticated() {
    init_logs();
    let storage = Arc::new(MemoryStore::new());
    storage.put(SESSION_KEY, "{not valid json").unwrap();

    let controller = controller_with(Arc::new(SoftwareAuthenticator::new()), storage.clone());
    assert_eq!(controller.start(), AuthState::Unauthenticated);
    // No residual storage key survives the purge
    assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
    assert_eq!(storage.get(CREDENTIAL_KEY).unwrap(), None);
    // The healing is reported, not hidden
    assert_eq!(
        controller.last_error().unwrap().category,
        ErrorCategory::Corruption
    );
}

#[tokio::test]
async fn second_login_while_one_is_in_flight_is_rejected() {
    init_logs();
    let credential = preview_first_credential(101).await;
    let contract = strkey::encode_contract(&[0x52; 32]);
    let (_register, _lookup) = mock_registration(&credential, &contract, "10");

    let authenticator = Arc::new(SoftwareAuthenticator::with_seed(101));
    authenticator.set_prompt_delay(Some(Duration::from_millis(200)));
    let controller = Arc::new(controller_with(
        authenticator.clone(),
        Arc::new(MemoryStore::new()),
    ));
    controller.start();

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.login_or_register("alice").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = controller.login_or_register("alice").await;
    assert!(matches!(
        second,
        Err(WalletError::ConcurrentAuthentication)
    ));

    // The in-flight ceremony is untouched and completes its binding
    let account = first.await.unwrap().unwrap();
    assert_eq!(account.contract_id, contract);
    assert_eq!(controller.state(), AuthState::Authenticated);
    assert_eq!(controller.account().unwrap().contract_id, contract);
}

#[tokio::test]
async fn counter_regression_always_lands_unauthenticated() {
    init_logs();
    let credential = preview_first_credential(102).await;
    let contract = strkey::encode_contract(&[0x53; 32]);
    let (_register, _lookup) = mock_registration(&credential, &contract, "99");

    let authenticator = Arc::new(SoftwareAuthenticator::with_seed(102));
    let storage = Arc::new(MemoryStore::new());
    let controller = controller_with(authenticator.clone(), storage.clone());
    controller.start();

    // Register, then authenticate once so a high-water mark exists
    controller.login_or_register("alice").await.unwrap();
    controller.login_or_register("alice").await.unwrap();
    assert_eq!(controller.state(), AuthState::Authenticated);

    // A cloned device re-signs from an older counter
    authenticator.set_counter(&credential.id, 0);
    let result = controller.login_or_register("alice").await;
    assert!(matches!(result, Err(WalletError::CounterRegression { .. })));
    assert_eq!(controller.state(), AuthState::Unauthenticated);
    assert_eq!(
        controller.last_error().unwrap().category,
        ErrorCategory::Integrity
    );

    // Integrity failures clear persistence: the forced logout survives a reload
    assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
    assert_eq!(storage.get(CREDENTIAL_KEY).unwrap(), None);
}

#[tokio::test]
async fn logout_clears_everything_and_is_idempotent() {
    init_logs();
    let storage = Arc::new(MemoryStore::new());
    let cache = SessionCache::new(storage.clone(), None);
    cache
        .save(
            &Session::authenticated(restored_account()),
            Some(&CredentialId::new(vec![1])),
        )
        .unwrap();

    let controller = controller_with(Arc::new(SoftwareAuthenticator::new()), storage.clone());
    assert_eq!(controller.start(), AuthState::Authenticated);

    controller.logout();
    assert_eq!(controller.state(), AuthState::Unauthenticated);
    assert_eq!(controller.account(), None);
    assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
    assert_eq!(storage.get(CREDENTIAL_KEY).unwrap(), None);

    // Logging out again is a no-op
    controller.logout();
    assert_eq!(controller.state(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn unreachable_backend_keeps_the_session_and_tags_the_balance_stale() {
    init_logs();
    // A contract no test registers a balance mock for: the fetch fails
    let marooned = StellarAccount {
        public_key: strkey::encode_account(&[0xb1; 32]),
        contract_id: strkey::encode_contract(&[0xb2; 32]),
        balance: Decimal::from_str("42.5").unwrap(),
    };
    let storage = Arc::new(MemoryStore::new());
    let cache = SessionCache::new(storage.clone(), None);
    cache
        .save(&Session::authenticated(marooned.clone()), None)
        .unwrap();

    let controller = controller_with(Arc::new(SoftwareAuthenticator::new()), storage);
    controller.start();

    let (account, freshness) = controller.refresh_balance().await.unwrap();
    assert_eq!(freshness, BalanceFreshness::Stale);
    assert_eq!(account, marooned);
    assert_eq!(controller.state(), AuthState::Authenticated);
}

#[tokio::test]
async fn refreshed_balance_is_persisted_for_the_next_restore() {
    init_logs();
    let account = restored_account();
    let _m = mock(
        "GET",
        format!("/accounts/{}/balance", account.contract_id).as_str(),
    )
    .with_status(200)
    .with_header("content-type", "application/json")
    .with_body(r#"{"balance": 200.25}"#)
    .create();

    let storage = Arc::new(MemoryStore::new());
    let cache = SessionCache::new(storage.clone(), None);
    cache.save(&Session::authenticated(account), None).unwrap();

    let controller = controller_with(Arc::new(SoftwareAuthenticator::new()), storage.clone());
    controller.start();

    let (refreshed, freshness) = controller.refresh_balance().await.unwrap();
    assert_eq!(freshness, BalanceFreshness::Fresh);
    assert_eq!(refreshed.balance, Decimal::from_str("200.25").unwrap());

    // A second controller restoring from the same storage sees the new snapshot
    let restored = controller_with(Arc::new(SoftwareAuthenticator::new()), storage);
    restored.start();
    assert_eq!(
        restored.account().unwrap().balance,
        Decimal::from_str("200.25").unwrap()
    );
}

#[tokio::test]
async fn cancelled_login_releases_the_machine() {
    init_logs();
    let credential = preview_first_credential(103).await;
    let contract = strkey::encode_contract(&[0x54; 32]);
    let (_register, _lookup) = mock_registration(&credential, &contract, "0");

    let authenticator = Arc::new(SoftwareAuthenticator::with_seed(103));
    authenticator.set_prompt_delay(Some(Duration::from_secs(5)));
    let controller = Arc::new(controller_with(
        authenticator.clone(),
        Arc::new(MemoryStore::new()),
    ));
    controller.start();

    // User navigates away mid-prompt: the login future is dropped
    let abandoned = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.login_or_register("alice").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    abandoned.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(controller.state(), AuthState::Unauthenticated);

    // A fresh user action succeeds afterwards
    authenticator.set_prompt_delay(None);
    let account = controller.login_or_register("alice").await.unwrap();
    assert_eq!(account.contract_id, contract);
    assert_eq!(controller.state(), AuthState::Authenticated);
}
