//! Direct Charge Client
//!
//! One-time charges against the LiveChat billing API. Every call is sent
//! exactly once; retrying is the caller's business.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use widget_core::{
    AccessToken, ActivatedCharge, BillingService, Charge, ChargeRequest, CreatedCharge, RequestError,
    RequestResult, Result, WidgetConfig, WidgetError,
};

/// `GET /v1/direct_charge` body
#[derive(Debug, Deserialize)]
struct ChargeList {
    result: Vec<Charge>,
}

/// Billing API client
#[derive(Clone, Debug)]
pub struct HttpBillingClient {
    http: reqwest::Client,
    base_url: Url,
    test_mode: bool,
}

impl HttpBillingClient {
    /// Create a client; `test_mode` marks every created charge as a test charge
    pub fn new(base_url: &str, test_mode: bool) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WidgetError::Config(format!("invalid billing API URL {base_url:?}: {e}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            test_mode,
        })
    }

    /// Create from widget configuration
    pub fn from_config(config: &WidgetConfig) -> Result<Self> {
        Self::new(&config.billing_api_url, config.direct_charge_test)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Create a direct charge; only `201 Created` counts as success
    pub async fn create_charge(&self, token: &AccessToken, request: &ChargeRequest) -> RequestResult<CreatedCharge> {
        const ENDPOINT: &str = "POST /v1/direct_charge";

        let form = [
            ("return_url", request.return_url.clone()),
            ("name", request.name.clone()),
            ("price", request.price_cents.to_string()),
            ("quantity", request.quantity.to_string()),
            ("test", if self.test_mode { "1" } else { "0" }.to_string()),
        ];

        let response = self
            .http
            .post(self.endpoint(&["v1", "direct_charge"]))
            .bearer_auth(token.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| RequestError::transport(ENDPOINT, e))?;

        let created: CreatedCharge = read_json(ENDPOINT, response, StatusCode::CREATED).await?;
        tracing::debug!(charge_id = ?created.id, test = self.test_mode, "Direct charge created");
        Ok(created)
    }

    /// Activate an accepted charge; only `200 OK` counts as success
    pub async fn confirm_payment(&self, token: &AccessToken, payment_id: &str) -> RequestResult<ActivatedCharge> {
        let endpoint = format!("PUT /v1/direct_charge/{payment_id}/activate");

        let response = self
            .http
            .put(self.endpoint(&["v1", "direct_charge", payment_id, "activate"]))
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| RequestError::transport(&endpoint, e))?;

        read_json(&endpoint, response, StatusCode::OK).await
    }

    /// List the account's direct charges; only `200 OK` counts as success
    pub async fn fetch_charges(&self, token: &AccessToken) -> RequestResult<Vec<Charge>> {
        const ENDPOINT: &str = "GET /v1/direct_charge";

        let response = self
            .http
            .get(self.endpoint(&["v1", "direct_charge"]))
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| RequestError::transport(ENDPOINT, e))?;

        let list: ChargeList = read_json(ENDPOINT, response, StatusCode::OK).await?;
        Ok(list.result)
    }
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
    expected: StatusCode,
) -> RequestResult<T> {
    let status = response.status();
    if status != expected {
        return Err(RequestError::status(endpoint, status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| RequestError::transport(endpoint, e))?;
    serde_json::from_slice(&body).map_err(|e| RequestError::decode(endpoint, e))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl BillingService for HttpBillingClient {
    async fn create_charge(&self, token: &AccessToken, request: &ChargeRequest) -> RequestResult<CreatedCharge> {
        HttpBillingClient::create_charge(self, token, request).await
    }

    async fn confirm_payment(&self, token: &AccessToken, payment_id: &str) -> RequestResult<ActivatedCharge> {
        HttpBillingClient::confirm_payment(self, token, payment_id).await
    }

    async fn fetch_charges(&self, token: &AccessToken) -> RequestResult<Vec<Charge>> {
        HttpBillingClient::fetch_charges(self, token).await
    }
}
