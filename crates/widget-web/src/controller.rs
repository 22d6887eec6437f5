//! Session Controller
//!
//! Browser driver for [`Session`]: events go in through [`Controller::dispatch`],
//! the returned effects are carried out with `spawn_local` tasks, a
//! `setInterval` poll and the host SDK bindings.

use std::future::Future;
use std::sync::Arc;

use leptos::prelude::*;
use leptos::task::spawn_local;

use widget_core::{
    render, AuthError, BillingService, Effect, Event, HostEvent, Session, View, WeatherService, WidgetConfig,
};

use crate::host;

#[derive(Clone)]
struct Services {
    client_id: String,
    billing: Arc<dyn BillingService>,
    weather: Arc<dyn WeatherService>,
}

/// Reactive handle on the operator session
#[derive(Clone, Copy)]
pub struct Controller {
    session: RwSignal<Session>,
    poll: StoredValue<Option<IntervalHandle>>,
    services: StoredValue<Services>,
}

impl Controller {
    pub fn new(config: &WidgetConfig, billing: Arc<dyn BillingService>, weather: Arc<dyn WeatherService>) -> Self {
        Self {
            session: RwSignal::new(Session::from_config(config)),
            poll: StoredValue::new(None),
            services: StoredValue::new(Services {
                client_id: config.client_id.clone(),
                billing,
                weather,
            }),
        }
    }

    /// Current view; tracks the session signal
    pub fn view(self) -> View {
        self.session.with(render)
    }

    /// Apply an event and carry out the resulting effects
    pub fn dispatch(self, event: impl Into<Event>) {
        let event = event.into();
        let effects = self.session.try_update(|session| session.update(event)).unwrap_or_default();
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(self, effect: Effect) {
        match effect {
            Effect::InitHost => self.init_host(),
            Effect::DisplayLogin => request_animation_frame(|| {
                if let Err(err) = host::show_login_button() {
                    leptos::logging::error!("Cannot display login button: {}", host::describe(&err));
                }
            }),
            Effect::FetchCharges { token, epoch } => {
                let billing = self.services.with_value(|s| Arc::clone(&s.billing));
                self.spawn_request(async move {
                    Event::ChargesFetched {
                        epoch,
                        result: billing.fetch_charges(&token).await,
                    }
                });
            }
            Effect::ConfirmPayment { token, payment_id } => {
                let billing = self.services.with_value(|s| Arc::clone(&s.billing));
                self.spawn_request(async move {
                    Event::PaymentConfirmed(billing.confirm_payment(&token, &payment_id).await)
                });
            }
            Effect::FetchWeather { epoch, location } => {
                let weather = self.services.with_value(|s| Arc::clone(&s.weather));
                self.spawn_request(async move {
                    Event::WeatherFetched {
                        epoch,
                        result: weather.fetch_weather(location).await,
                    }
                });
            }
            Effect::CreateCharge { token, request } => {
                let billing = self.services.with_value(|s| Arc::clone(&s.billing));
                self.spawn_request(async move { Event::ChargeCreated(billing.create_charge(&token, &request).await) });
            }
            Effect::StartPolling { every } => {
                self.stop_polling();
                match set_interval_with_handle(move || self.dispatch(Event::PollTick), every) {
                    Ok(handle) => self.poll.set_value(Some(handle)),
                    Err(err) => leptos::logging::error!("Cannot start billing poll: {}", host::describe(&err)),
                }
            }
            Effect::StopPolling => self.stop_polling(),
            Effect::Redirect(url) => {
                if let Some(window) = web_sys::window() {
                    if let Err(err) = window.location().set_href(&url) {
                        leptos::logging::error!("Redirect to {url} failed: {}", host::describe(&err));
                    }
                }
            }
            Effect::Report(err) => leptos::logging::warn!("{err}"),
        }
    }

    fn init_host(self) {
        let client_id = self.services.with_value(|s| s.client_id.clone());
        let result = host::init(
            &client_id,
            move |visitor| self.dispatch(HostEvent::CustomerProfile(visitor)),
            move |identity| self.dispatch(HostEvent::IdentityFetched(identity)),
        );

        if let Err(err) = result {
            let reason = host::describe(&err);
            leptos::logging::error!("Host SDK unavailable: {reason}");
            self.dispatch(HostEvent::IdentityFetched(Err(AuthError::Other(reason))));
        }
    }

    fn stop_polling(self) {
        if let Some(handle) = self.poll.try_update_value(Option::take).flatten() {
            handle.clear();
        }
    }

    fn spawn_request(self, request: impl Future<Output = Event> + 'static) {
        spawn_local(async move {
            let event = request.await;
            self.dispatch(event);
        });
    }
}
