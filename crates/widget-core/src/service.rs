//! Service Contracts
//!
//! The state machine talks to the billing and weather APIs only through
//! these traits, so drivers inject real HTTP clients and tests inject fakes.
//!
//! Browser futures are not `Send`, so the wasm build relaxes the bound.

use async_trait::async_trait;

use crate::error::RequestResult;
use crate::model::{AccessToken, ActivatedCharge, Charge, ChargeRequest, CreatedCharge, Geolocation, Weather};

/// Direct charge operations of the billing API
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait BillingService: Send + Sync {
    /// Create a charge; resolves to the confirmation page the operator must visit
    async fn create_charge(&self, token: &AccessToken, request: &ChargeRequest) -> RequestResult<CreatedCharge>;

    /// Activate a charge the operator has accepted
    async fn confirm_payment(&self, token: &AccessToken, payment_id: &str) -> RequestResult<ActivatedCharge>;

    /// List every direct charge of the account
    async fn fetch_charges(&self, token: &AccessToken) -> RequestResult<Vec<Charge>>;
}

/// Current-conditions lookup
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait WeatherService: Send + Sync {
    async fn fetch_weather(&self, location: Geolocation) -> RequestResult<Weather>;
}
