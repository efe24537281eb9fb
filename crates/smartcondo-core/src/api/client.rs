//! API client for communicating with the Smart Condominium REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the resident directory and finance endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{Role, SessionData};
use crate::models::{AccountSnapshot, ResidentId, ResidentSummary, Receipt};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(alias = "key", alias = "access")]
    token: String,
    #[serde(alias = "usuario")]
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default = "unknown_role", alias = "rol")]
    role: Role,
}

fn unknown_role() -> Role {
    Role::Unknown
}

#[derive(Debug, Serialize)]
struct PaymentRequest<'a> {
    referencia: &'a str,
    observaciones: &'a str,
}

/// API client for the condominium backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for the given base URL (e.g. `http://host/api`)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Authenticate against the backend and return session data
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<SessionData> {
        let url = self.url("auth/login/");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .context("Failed to send authentication request")?;

        let response = Self::check_response(response).await?;

        let auth: AuthResponse = response.json().await.context("Failed to parse auth response")?;

        Ok(SessionData {
            token: auth.token,
            user_id: auth.user.id,
            username: auth.user.username.unwrap_or_else(|| username.to_string()),
            role: auth.user.role,
            created_at: Utc::now(),
        })
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()
                .headers(self.auth_headers()?)
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", url))?;

            if response.status().as_u16() != 429 {
                return Self::check_response(response).await;
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited.into());
            }
            warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2; // Exponential backoff
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send_with_retry(url, || self.client.get(url)).await?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", url))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get_text(url).await?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<B: Serialize>(&self, url: &str, body: &B) -> Result<String> {
        let response = self
            .send_with_retry(url, || self.client.post(url).json(body))
            .await?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", url))
    }

    // ===== Resident Directory =====

    /// Fetch every resident known to the backend, active or not
    pub async fn fetch_residents(&self) -> Result<Vec<ResidentSummary>> {
        let url = self.url("usuarios/residentes/");
        let text = self.get_text(&url).await?;

        // Plain array first
        if let Ok(residents) = serde_json::from_str::<Vec<ResidentSummary>>(&text) {
            debug!(count = residents.len(), "Residents parsed as array");
            return Ok(residents);
        }

        // Paginated or wrapped list
        #[derive(Deserialize)]
        struct ResidentsWrapper {
            #[serde(default)]
            results: Vec<ResidentSummary>,
            #[serde(default)]
            data: Vec<ResidentSummary>,
        }

        let wrapper: ResidentsWrapper = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("residents: {}", e)))?;
        if !wrapper.results.is_empty() {
            return Ok(wrapper.results);
        }
        Ok(wrapper.data)
    }

    // ===== Account Statement =====

    /// Fetch the account statement for one resident
    pub async fn fetch_account_snapshot(&self, resident_id: ResidentId) -> Result<AccountSnapshot> {
        let url = self.url(&format!("finanzas/estado-cuenta/{}/", resident_id));
        let mut snapshot: AccountSnapshot = self.get(&url).await?;
        snapshot.resident_id = resident_id;
        debug!(
            resident_id,
            pending = snapshot.pending_charges.len(),
            overdue = snapshot.overdue_charges.len(),
            "Account snapshot received"
        );
        Ok(snapshot)
    }

    /// Register a payment for a charge
    pub async fn pay_charge(&self, charge_id: i64, reference: &str, notes: &str) -> Result<Receipt> {
        let url = self.url(&format!("finanzas/cargos/{}/pagar/", charge_id));
        let body = PaymentRequest {
            referencia: reference,
            observaciones: notes,
        };
        let text = self.post(&url, &body).await?;

        #[derive(Deserialize)]
        struct ReceiptWrapper {
            #[serde(alias = "recibo")]
            receipt: Receipt,
        }

        if let Ok(wrapper) = serde_json::from_str::<ReceiptWrapper>(&text) {
            return Ok(wrapper.receipt);
        }
        if text.trim().is_empty() {
            return Ok(Receipt {
                charge_id: Some(charge_id),
                ..Receipt::default()
            });
        }
        let mut receipt: Receipt = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("payment receipt: {}", e)))?;
        receipt.charge_id.get_or_insert(charge_id);
        Ok(receipt)
    }

    /// Cancel an open charge
    pub async fn cancel_charge(&self, charge_id: i64) -> Result<()> {
        let url = self.url(&format!("finanzas/cargos/{}/cancelar/", charge_id));
        self.post(&url, &serde_json::json!({})).await?;
        Ok(())
    }

    /// Download the PDF receipt for a paid charge
    pub async fn fetch_receipt(&self, charge_id: i64) -> Result<Vec<u8>> {
        let url = self.url(&format!("finanzas/cargos/{}/comprobante/", charge_id));
        let response = self
            .send_with_retry(&url, || {
                self.client
                    .get(&url)
                    .header(header::ACCEPT, "application/pdf")
            })
            .await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read receipt from {}", url))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let api = ApiClient::new("http://localhost:8000/api/").expect("client");
        assert_eq!(api.base_url(), "http://localhost:8000/api");
        assert_eq!(
            api.url("/usuarios/residentes/"),
            "http://localhost:8000/api/usuarios/residentes/"
        );
    }

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"token": "tok", "usuario": {"id": 3, "username": "admin", "rol": "administrador"}}"#;
        let auth: AuthResponse = serde_json::from_str(json).expect("auth json");
        assert_eq!(auth.token, "tok");
        assert_eq!(auth.user.id, 3);
        assert!(auth.user.role.is_admin());

        let without_role: AuthResponse =
            serde_json::from_str(r#"{"key": "k", "user": {"id": 4}}"#).expect("auth json");
        assert_eq!(without_role.user.role, Role::Unknown);
    }

    #[test]
    fn test_with_token_keeps_base_url() {
        let api = ApiClient::new("http://condo.test/api").expect("client");
        let authed = api.with_token("tok".to_string());
        assert_eq!(authed.base_url(), "http://condo.test/api");
        let headers = authed.auth_headers().expect("headers");
        assert_eq!(
            headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer tok")
        );
    }
}
