use anyhow::anyhow;
use async_trait::async_trait;
use ledger_core::dto::*;
use ledger_core::error::ErrorBody;
use ledger_core::{AppError, LedgerClient, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mirrors `ledger-service`'s `{ success, data, error }` response envelope
/// (§6.1, §4.3). Duplicated here rather than imported because the two
/// services are independently deployable (§1) and share only `ledger-core`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[allow(dead_code)]
    success: bool,
    data: Option<T>,
    error: Option<ErrorBody>,
}

/// `reqwest`-backed implementation of [`LedgerClient`], dispatching over
/// the Ledger's HTTP surface (§6.1). The saga programs against the trait;
/// this is the one production-facing transport.
pub struct HttpLedgerClient {
    http: Client,
    base_url: String,
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn send<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Req>,
    ) -> Result<Resp> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.http.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::DeadlineExceeded(format!("ledger request to {url} timed out"))
            } else {
                AppError::Internal(anyhow!("ledger request to {url} failed: {e}"))
            }
        })?;

        if response.status() == StatusCode::GATEWAY_TIMEOUT {
            return Err(AppError::DeadlineExceeded(format!(
                "ledger returned 504 for {url}"
            )));
        }

        let envelope: ApiResponse<Resp> = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to decode ledger response from {url}: {e}")))?;

        match envelope.data {
            Some(data) => Ok(data),
            None => {
                let err = envelope
                    .error
                    .ok_or_else(|| AppError::Internal(anyhow!("ledger returned neither data nor error from {url}")))?;
                Err(err.into_app_error())
            }
        }
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn get_balance(&self, req: GetBalanceRequest) -> Result<GetBalanceResponse> {
        let path = format!("/v1/accounts/{}/balance", req.account_id);
        self.send::<(), _>(reqwest::Method::GET, &path, None).await
    }

    async fn reserve_balance(&self, req: ReserveBalanceRequest) -> Result<ReserveBalanceResponse> {
        self.send(reqwest::Method::POST, "/v1/reservations", Some(&req)).await
    }

    async fn commit_reservation(&self, req: CommitReservationRequest) -> Result<()> {
        self.send::<_, Empty>(reqwest::Method::POST, "/v1/reservations/commit", Some(&req))
            .await
            .map(|_| ())
    }

    async fn release_reservation(&self, req: ReleaseReservationRequest) -> Result<()> {
        self.send::<_, Empty>(reqwest::Method::POST, "/v1/reservations/release", Some(&req))
            .await
            .map(|_| ())
    }

    async fn credit_balance(&self, req: CreditBalanceRequest) -> Result<CreditBalanceResponse> {
        self.send(reqwest::Method::POST, "/v1/accounts/credit", Some(&req)).await
    }
}
