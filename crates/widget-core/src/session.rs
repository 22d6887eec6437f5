//! Session State Machine
//!
//! The session is a reducer: [`Session::update`] applies one [`Event`] and
//! returns the [`Effect`]s a driver must carry out. Effects that talk to the
//! network come back later as further events, so every handler runs to
//! completion and the session never awaits anything itself.
//!
//! ```text
//!            ┌──────────── not embedded ───────────▶ not_iframe
//!  loading ──┤
//!            └─ identity ─┬─ error ───────────────▶ not_authorized | access_denied | error
//!                         └─ token ─▶ charges ─▶ (confirm payment) ─▶ loaded
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::WidgetConfig;
use crate::error::{AuthError, RequestError, RequestResult};
use crate::model::{
    AccessToken, ActivatedCharge, Charge, ChargeRequest, ChargeStatus, CreatedCharge, Geolocation,
    Identity, PaymentStatus, Visitor, Weather, WEATHER_ICON_OFFER,
};

/// Top-level widget state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Loading,
    /// Opened directly in a browser tab instead of inside the host
    NotIframe,
    NotAuthorized,
    AccessDenied,
    Error,
    Loaded,
}

/// Progress of the visitor panel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorState {
    #[default]
    NotSelected,
    Fetching,
    Fetched,
}

/// Inputs coming from the chat host, the identity SDK and the operator
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// The widget was mounted; `payment_id` is the `id` query parameter
    Mounted {
        embedded: bool,
        payment_id: Option<String>,
    },

    /// Identity SDK callback
    IdentityFetched(Result<Identity, AuthError>),

    /// The host selected (or re-sent) a customer profile
    CustomerProfile(Visitor),

    /// The operator pressed "Buy now"
    BuyClicked,

    /// The widget is going away; tears down the poll
    Unmounted,
}

/// Everything the session reacts to
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Host(HostEvent),

    ChargesFetched {
        epoch: u64,
        result: RequestResult<Vec<Charge>>,
    },

    PaymentConfirmed(RequestResult<ActivatedCharge>),

    WeatherFetched {
        epoch: u64,
        result: RequestResult<Weather>,
    },

    ChargeCreated(RequestResult<CreatedCharge>),

    /// The billing poll fired
    PollTick,
}

impl From<HostEvent> for Event {
    fn from(event: HostEvent) -> Self {
        Event::Host(event)
    }
}

/// Work the driver performs on behalf of the session
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Initialize the host SDK and start the identity flow
    InitHost,

    /// Render the identity provider's sign-in button
    DisplayLogin,

    FetchCharges {
        token: AccessToken,
        epoch: u64,
    },

    ConfirmPayment {
        token: AccessToken,
        payment_id: String,
    },

    FetchWeather {
        epoch: u64,
        location: Geolocation,
    },

    CreateCharge {
        token: AccessToken,
        request: ChargeRequest,
    },

    /// Arm the recurring billing poll; at most one is ever armed
    StartPolling {
        every: Duration,
    },

    StopPolling,

    /// Send the operator's browser elsewhere
    Redirect(String),

    /// A request failed; the host decides what to do with it
    Report(RequestError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Boot {
    AwaitingIdentity,
    FetchingCharges,
    ConfirmingPayment,
    Done,
}

/// Operator session state
#[derive(Clone, Debug)]
pub struct Session {
    access_token: Option<AccessToken>,
    has_billing_access: bool,
    app_state: AppState,
    visitor_state: VisitorState,
    payment_status: Option<PaymentStatus>,
    visitor: Option<Visitor>,
    weather: Option<Weather>,
    purchase_pending: bool,
    purchase_error: Option<String>,

    boot: Boot,
    pending_payment_id: Option<String>,
    visitor_epoch: u64,
    charges_epoch: u64,
    /// Epoch of the newest charge list applied so far
    charges_applied: u64,
    polling: bool,
    ended: bool,

    return_url: String,
    poll_interval: Duration,
}

impl Session {
    /// Create a session; `return_url` is where billing sends the operator back to
    pub fn new(return_url: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            access_token: None,
            has_billing_access: false,
            app_state: AppState::Loading,
            visitor_state: VisitorState::NotSelected,
            payment_status: None,
            visitor: None,
            weather: None,
            purchase_pending: false,
            purchase_error: None,
            boot: Boot::AwaitingIdentity,
            pending_payment_id: None,
            visitor_epoch: 0,
            charges_epoch: 0,
            charges_applied: 0,
            polling: false,
            ended: false,
            return_url: return_url.into(),
            poll_interval,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.app_url.clone(), config.poll_interval())
    }

    pub fn app_state(&self) -> AppState {
        self.app_state
    }

    pub fn visitor_state(&self) -> VisitorState {
        self.visitor_state
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.payment_status
    }

    pub fn has_billing_access(&self) -> bool {
        self.has_billing_access
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn visitor(&self) -> Option<&Visitor> {
        self.visitor.as_ref()
    }

    pub fn weather(&self) -> Option<&Weather> {
        self.weather.as_ref()
    }

    /// Last charge creation failure, cleared by the next attempt
    pub fn purchase_error(&self) -> Option<&str> {
        self.purchase_error.as_deref()
    }

    pub fn purchase_pending(&self) -> bool {
        self.purchase_pending
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Whether "Buy now" is both shown and accepted
    pub fn can_purchase(&self) -> bool {
        self.app_state == AppState::Loaded
            && self.visitor_state == VisitorState::Fetched
            && self.has_billing_access
            && self.payment_status.is_none()
            && self.weather.is_some()
            && !self.purchase_pending
    }

    /// Apply one event and return the effects it requires
    pub fn update(&mut self, event: impl Into<Event>) -> Vec<Effect> {
        let event = event.into();
        if self.ended {
            tracing::debug!(?event, "Session ended, ignoring event");
            return Vec::new();
        }

        match event {
            Event::Host(HostEvent::Mounted { embedded, payment_id }) => self.on_mounted(embedded, payment_id),
            Event::Host(HostEvent::IdentityFetched(result)) => self.on_identity(result),
            Event::Host(HostEvent::CustomerProfile(visitor)) => self.on_customer_profile(visitor),
            Event::Host(HostEvent::BuyClicked) => self.on_buy_clicked(),
            Event::Host(HostEvent::Unmounted) => self.on_unmounted(),
            Event::ChargesFetched { epoch, result } => self.on_charges_fetched(epoch, result),
            Event::PaymentConfirmed(result) => self.on_payment_confirmed(result),
            Event::WeatherFetched { epoch, result } => self.on_weather_fetched(epoch, result),
            Event::ChargeCreated(result) => self.on_charge_created(result),
            Event::PollTick => self.on_poll_tick(),
        }
    }

    fn on_mounted(&mut self, embedded: bool, payment_id: Option<String>) -> Vec<Effect> {
        if self.app_state != AppState::Loading || self.boot != Boot::AwaitingIdentity {
            tracing::debug!("Widget already mounted");
            return Vec::new();
        }

        if !embedded {
            tracing::info!("Widget opened outside the host frame");
            self.app_state = AppState::NotIframe;
            return Vec::new();
        }

        self.pending_payment_id = payment_id.filter(|id| !id.trim().is_empty());
        vec![Effect::InitHost]
    }

    fn on_identity(&mut self, result: Result<Identity, AuthError>) -> Vec<Effect> {
        if self.app_state != AppState::Loading || self.boot != Boot::AwaitingIdentity {
            tracing::debug!("Identity already resolved, ignoring callback");
            return Vec::new();
        }

        match result {
            Ok(identity) => {
                self.has_billing_access = identity.has_billing_access();
                self.access_token = Some(identity.access_token);
                self.boot = Boot::FetchingCharges;
                tracing::info!(billing_access = self.has_billing_access, "Operator authorized");

                self.request_charges().into_iter().collect()
            }
            Err(err) => {
                tracing::warn!(error = %err, "Identity provider rejected the operator");
                self.app_state = match err {
                    AuthError::Unauthorized => AppState::NotAuthorized,
                    AuthError::AccessDenied => AppState::AccessDenied,
                    AuthError::Other(_) => AppState::Error,
                };

                if self.app_state == AppState::NotAuthorized {
                    vec![Effect::DisplayLogin]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn on_charges_fetched(&mut self, epoch: u64, result: RequestResult<Vec<Charge>>) -> Vec<Effect> {
        // polls may overlap; only a list newer than the last applied one counts
        if epoch <= self.charges_applied || epoch > self.charges_epoch {
            tracing::debug!(epoch, applied = self.charges_applied, "Discarding stale charge list");
            return Vec::new();
        }
        self.charges_applied = epoch;

        let mut effects = Vec::new();
        let next = match result {
            Ok(charges) => PaymentStatus::from_charges(&charges),
            Err(err) => {
                tracing::warn!(error = %err, "Could not fetch charges");
                effects.push(Effect::Report(err));
                Some(PaymentStatus::Error)
            }
        };
        effects.extend(self.set_payment_status(next));

        if self.boot == Boot::FetchingCharges {
            effects.extend(self.after_charges());
        }
        effects
    }

    fn after_charges(&mut self) -> Vec<Effect> {
        match (self.pending_payment_id.take(), self.access_token.clone()) {
            (Some(payment_id), Some(token)) => {
                self.boot = Boot::ConfirmingPayment;
                vec![Effect::ConfirmPayment { token, payment_id }]
            }
            _ => {
                self.finish_boot();
                Vec::new()
            }
        }
    }

    fn on_payment_confirmed(&mut self, result: RequestResult<ActivatedCharge>) -> Vec<Effect> {
        let effects = match result {
            Ok(activated) if activated.status == Some(ChargeStatus::Processed) => {
                self.set_payment_status(Some(PaymentStatus::Processed))
            }
            Ok(activated) => {
                tracing::debug!(status = ?activated.status, "Payment confirmation left status unchanged");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, "Could not confirm payment");
                vec![Effect::Report(err)]
            }
        };

        if self.boot == Boot::ConfirmingPayment {
            self.finish_boot();
        }
        effects
    }

    fn finish_boot(&mut self) {
        self.boot = Boot::Done;
        self.app_state = AppState::Loaded;
        tracing::info!(payment_status = ?self.payment_status, "Widget loaded");
    }

    fn on_customer_profile(&mut self, visitor: Visitor) -> Vec<Effect> {
        if self.visitor.as_ref().is_some_and(|current| current.id == visitor.id) {
            self.visitor = Some(visitor);
            return Vec::new();
        }

        self.visitor_epoch += 1;
        self.weather = None;
        tracing::info!(visitor_id = %visitor.id, epoch = self.visitor_epoch, "Visitor selected");

        let effects = match visitor.geolocation {
            Some(location) => {
                self.visitor_state = VisitorState::Fetching;
                vec![Effect::FetchWeather {
                    epoch: self.visitor_epoch,
                    location,
                }]
            }
            None => {
                tracing::debug!(visitor_id = %visitor.id, "Visitor has no location, skipping weather");
                self.visitor_state = VisitorState::Fetched;
                Vec::new()
            }
        };
        self.visitor = Some(visitor);
        effects
    }

    fn on_weather_fetched(&mut self, epoch: u64, result: RequestResult<Weather>) -> Vec<Effect> {
        if epoch != self.visitor_epoch {
            tracing::debug!(epoch, current = self.visitor_epoch, "Discarding weather for a previous visitor");
            return Vec::new();
        }

        match result {
            Ok(weather) => {
                self.visitor_state = VisitorState::Fetched;
                self.weather = Some(weather);
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, "Could not fetch weather");
                vec![Effect::Report(err)]
            }
        }
    }

    fn on_poll_tick(&mut self) -> Vec<Effect> {
        if !self.polling {
            return Vec::new();
        }
        self.request_charges().into_iter().collect()
    }

    fn on_buy_clicked(&mut self) -> Vec<Effect> {
        if !self.can_purchase() {
            tracing::debug!("Purchase not available, ignoring click");
            return Vec::new();
        }
        let Some(token) = self.access_token.clone() else {
            return Vec::new();
        };

        self.purchase_pending = true;
        self.purchase_error = None;
        vec![Effect::CreateCharge {
            token,
            request: ChargeRequest::for_offer(&WEATHER_ICON_OFFER, self.return_url.clone()),
        }]
    }

    fn on_charge_created(&mut self, result: RequestResult<CreatedCharge>) -> Vec<Effect> {
        self.purchase_pending = false;
        match result {
            Ok(created) => {
                tracing::info!(charge_id = ?created.id, "Charge created, redirecting to confirmation");
                vec![Effect::Redirect(created.confirmation_url)]
            }
            Err(err) => {
                tracing::warn!(error = %err, "Could not create charge");
                self.purchase_error = Some(err.to_string());
                vec![Effect::Report(err)]
            }
        }
    }

    fn on_unmounted(&mut self) -> Vec<Effect> {
        self.ended = true;
        self.sync_polling().into_iter().collect()
    }

    fn request_charges(&mut self) -> Option<Effect> {
        let token = self.access_token.clone()?;
        self.charges_epoch += 1;
        Some(Effect::FetchCharges {
            token,
            epoch: self.charges_epoch,
        })
    }

    /// Paid is final; any other status follows the latest charge list.
    fn set_payment_status(&mut self, next: Option<PaymentStatus>) -> Vec<Effect> {
        if self.payment_status == Some(PaymentStatus::Paid) && next != Some(PaymentStatus::Paid) {
            tracing::debug!(?next, "Payment already settled, keeping paid");
            return Vec::new();
        }
        if self.payment_status == next {
            return Vec::new();
        }

        tracing::info!(from = ?self.payment_status, to = ?next, "Payment status changed");
        self.payment_status = next;
        self.sync_polling().into_iter().collect()
    }

    fn sync_polling(&mut self) -> Option<Effect> {
        let wanted = !self.ended && self.payment_status == Some(PaymentStatus::Processed);
        match (self.polling, wanted) {
            (false, true) => {
                self.polling = true;
                Some(Effect::StartPolling {
                    every: self.poll_interval,
                })
            }
            (true, false) => {
                self.polling = false;
                Some(Effect::StopPolling)
            }
            _ => None,
        }
    }
}
