// src/backend/client.rs
//! REST client for the smart-wallet account service.
//!
//! Provides a high-level interface to the three endpoints this library
//! consumes:
//! - `POST /accounts/register`: record a credential→account binding
//! - `GET /accounts/{credentialId}`: look up the bound account
//! - `GET /accounts/{contractId}/balance`: fetch a balance snapshot
//!
//! Read-only calls retry with exponential backoff on transport failures
//! and server errors; the registration POST is single-attempt because it
//! is not idempotent. The service's health endpoints are deployment
//! probes and are not consumed here.

use std::time::Duration;

use log::{debug, warn};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::WalletError;

/// Request payload for recording a credential→account binding.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterAccountRequest<'a> {
    credential_id: &'a str,
    derived_public_key: &'a str,
}

/// Response for the binding registration.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterAccountResponse {
    contract_id: String,
}

/// Account document returned by the lookup endpoint.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub public_key: String,
    pub contract_id: String,
    pub balance: Decimal,
}

/// Response for the balance endpoint.
#[derive(Deserialize)]
struct BalanceResponse {
    balance: Decimal,
}

/// Client for the account service.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    retry_attempts: u32,
    retry_base_delay: Duration,
}

impl BackendClient {
    /// Builds a client from the runtime configuration.
    pub fn new(config: &Config) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WalletError::BackendUnavailable(e.to_string()))?;
        Ok(BackendClient {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            retry_attempts: config.retry_attempts,
            retry_base_delay: config.retry_base_delay,
        })
    }

    /// Records a credential→account binding and returns the contract id
    /// the backend deployed or assigned.
    ///
    /// Single-attempt: the POST is not idempotent, so transient failures
    /// surface to the caller instead of being retried here.
    ///
    /// # Errors
    /// - [`WalletError::RegistrationConflict`] when the backend answers 409
    /// - [`WalletError::BackendUnavailable`] on transport failure or 5xx
    pub async fn register_account(
        &self,
        credential_id: &str,
        derived_public_key: &str,
    ) -> Result<String, WalletError> {
        let url = format!("{}/accounts/register", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&RegisterAccountRequest {
                credential_id,
                derived_public_key,
            })
            .send()
            .await
            .map_err(|e| WalletError::BackendUnavailable(e.to_string()))?;

        match response.status() {
            StatusCode::CONFLICT => Err(WalletError::RegistrationConflict),
            status if status.is_success() => {
                let body: RegisterAccountResponse = response
                    .json()
                    .await
                    .map_err(|e| WalletError::BackendUnavailable(e.to_string()))?;
                debug!(
                    "registered binding for credential {} at contract {}",
                    credential_id, body.contract_id
                );
                Ok(body.contract_id)
            }
            status => Err(WalletError::BackendUnavailable(format!(
                "{} returned {}",
                url, status
            ))),
        }
    }

    /// Looks up the account bound to a credential.
    ///
    /// # Errors
    /// - [`WalletError::AccountNotFound`] when the backend answers 404
    /// - [`WalletError::BackendUnavailable`] once retries are exhausted
    pub async fn fetch_account(&self, credential_id: &str) -> Result<AccountResponse, WalletError> {
        let url = format!("{}/accounts/{}", self.base_url, credential_id);
        let response = self.get_with_retry(&url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(WalletError::AccountNotFound(credential_id.to_string())),
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| WalletError::BackendUnavailable(e.to_string())),
            status => Err(WalletError::BackendUnavailable(format!(
                "{} returned {}",
                url, status
            ))),
        }
    }

    /// Fetches the current balance snapshot for a contract.
    pub async fn fetch_balance(&self, contract_id: &str) -> Result<Decimal, WalletError> {
        let url = format!("{}/accounts/{}/balance", self.base_url, contract_id);
        let response = self.get_with_retry(&url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(WalletError::AccountNotFound(contract_id.to_string())),
            status if status.is_success() => {
                let body: BalanceResponse = response
                    .json()
                    .await
                    .map_err(|e| WalletError::BackendUnavailable(e.to_string()))?;
                Ok(body.balance)
            }
            status => Err(WalletError::BackendUnavailable(format!(
                "{} returned {}",
                url, status
            ))),
        }
    }

    /// GET with exponential backoff. Retries transport failures and 5xx
    /// responses; anything else is handed back for status mapping.
    /// Safe only because these endpoints are read-only.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response, WalletError> {
        let mut delay = self.retry_base_delay;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.http.get(url).send().await {
                Ok(response) if response.status().is_server_error() => {
                    if attempt > self.retry_attempts {
                        return Err(WalletError::BackendUnavailable(format!(
                            "{} returned {}",
                            url,
                            response.status()
                        )));
                    }
                    warn!(
                        "GET {} returned {}, retrying in {:?}",
                        url,
                        response.status(),
                        delay
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt > self.retry_attempts {
                        return Err(WalletError::BackendUnavailable(e.to_string()));
                    }
                    warn!("GET {} failed ({}), retrying in {:?}", url, e, delay);
                }
            }
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }
}
