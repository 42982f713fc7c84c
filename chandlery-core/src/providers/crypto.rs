//! Crypto-pay provider client.
//!
//! This integration receives no webhooks from the provider, so order
//! confirmation always goes through `query_order` polling.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use url::Url;

use super::{CryptoOrderState, CryptoPrepay, CryptoProvider, ProviderError};

/// HTTP client for the crypto-pay prepay API.
pub struct CryptoPayClient {
    http: reqwest::Client,
    api_base: Url,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct CreatePrepayRequest<'a> {
    amount: Decimal,
    reference: &'a str,
}

impl CryptoPayClient {
    pub fn new(api_base: Url, api_key: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_base,
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.api_base.join(path).map_err(|_| ProviderError::Rejected {
            status: 0,
            body: format!("invalid endpoint path: {path}"),
        })
    }

    async fn read_error(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ProviderError::Rejected { status, body }
    }
}

#[async_trait]
impl CryptoProvider for CryptoPayClient {
    #[tracing::instrument(skip_all, err, fields(reference = %reference))]
    async fn create_prepay(
        &self,
        amount: Decimal,
        reference: &str,
    ) -> Result<CryptoPrepay, ProviderError> {
        let url = self.endpoint("v1/prepay")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&CreatePrepayRequest { amount, reference })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json::<CryptoPrepay>().await?)
    }

    #[tracing::instrument(skip_all, err, fields(prepay_id = %prepay_id))]
    async fn query_order(&self, prepay_id: &str) -> Result<CryptoOrderState, ProviderError> {
        let url = self.endpoint(&format!("v1/orders/{prepay_id}"))?;
        let response = self.http.get(url).bearer_auth(&self.api_key).send().await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json::<CryptoOrderState>().await?)
    }
}
