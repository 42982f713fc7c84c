//! Hosted-checkout card provider client.

use async_trait::async_trait;
use url::Url;

use super::{CardProvider, CardSession, CardSessionState, CreateSessionRequest, ProviderError};

/// HTTP client for the hosted card checkout API.
///
/// `create_session` opens a provider-hosted payment page the buyer is
/// redirected to; `retrieve_session` reads the session back for
/// reconciliation.
pub struct HostedCheckoutClient {
    http: reqwest::Client,
    api_base: Url,
    api_key: String,
}

impl HostedCheckoutClient {
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
impl CardProvider for HostedCheckoutClient {
    #[tracing::instrument(skip_all, err, fields(order_id = %req.order_id))]
    async fn create_session(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<CardSession, ProviderError> {
        let url = self.endpoint("v1/checkout/sessions")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json::<CardSession>().await?)
    }

    #[tracing::instrument(skip_all, err, fields(session_id = %session_id))]
    async fn retrieve_session(&self, session_id: &str) -> Result<CardSessionState, ProviderError> {
        let url = self.endpoint(&format!("v1/checkout/sessions/{session_id}"))?;
        let response = self.http.get(url).bearer_auth(&self.api_key).send().await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json::<CardSessionState>().await?)
    }
}
