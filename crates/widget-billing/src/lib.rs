//! # widget-billing
//!
//! Client for the LiveChat billing API's one-time direct charges.
//!
//! ## Purchase Flow
//!
//! ```text
//! ┌─────────────┐  POST /v1/direct_charge  ┌──────────────────┐  ?id=<charge>  ┌─────────────┐
//! │   Widget    │─────────────────────────▶│ Billing confirm- │───────────────▶│   Widget    │
//! │ (Buy now)   │    confirmation_url      │   ation page     │   return_url   │ (activate)  │
//! └─────────────┘                          └──────────────────┘                └──────┬──────┘
//!                                                                                     │
//!                          PUT /v1/direct_charge/{id}/activate, then poll             │
//!                          GET /v1/direct_charge until a charge reports success ◀─────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use widget_billing::HttpBillingClient;
//! use widget_core::{AccessToken, ChargeRequest, WEATHER_ICON_OFFER};
//!
//! let client = HttpBillingClient::new("https://billing.livechatinc.com", true)?;
//! let token = AccessToken::new("...");
//!
//! let created = client
//!     .create_charge(&token, &ChargeRequest::for_offer(&WEATHER_ICON_OFFER, "https://my-app.example/"))
//!     .await?;
//!
//! // Redirect the operator to: created.confirmation_url
//! ```

mod client;

pub use client::HttpBillingClient;
