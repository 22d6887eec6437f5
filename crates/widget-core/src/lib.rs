//! # widget-core
//!
//! State machine, view model and service contracts of the LiveChat weather
//! widget: an Agent App Extension that shows the selected visitor's local
//! weather and sells a weather icon through the LiveChat billing API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  HostEvent   ┌───────────────┐   Effect    ┌──────────────────┐
//! │  Chat host + │─────────────▶│    Session    │────────────▶│      Driver      │
//! │ identity SDK │              │   (reducer)   │◀────────────│ (runtime / web)  │
//! └──────────────┘              └───────┬───────┘   Event     └────────┬─────────┘
//!                                       │ render                       │
//!                                       ▼                              ▼
//!                                 ┌──────────┐          BillingService / WeatherService
//!                                 │   View   │
//!                                 └──────────┘
//! ```
//!
//! The billing and weather clients live in their own crates and are injected
//! as trait objects, so the session can be exercised without a network.

pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod session;
pub mod view;

#[cfg(not(target_arch = "wasm32"))]
pub mod runtime;

pub use config::WidgetConfig;
pub use error::{AuthError, RequestError, RequestFailure, RequestResult, Result, WidgetError};
pub use model::{
    AccessToken, ActivatedCharge, Charge, ChargeRequest, ChargeStatus, CreatedCharge, Geolocation, Identity,
    IdentityFailure, Offer, PaymentStatus, Visitor, Weather, WEATHER_ICON_OFFER,
};
pub use service::{BillingService, WeatherService};
pub use session::{AppState, Effect, Event, HostEvent, Session, VisitorState};
pub use view::{render, BillingPanel, View, VisitorPanel};

#[cfg(not(target_arch = "wasm32"))]
pub use runtime::{EventSource, Host, PollHandle, WidgetRuntime};
