//! Native Runtime
//!
//! Drives a [`Session`] on tokio. Host events arrive through an injected
//! [`EventSource`]; service calls run as spawned tasks whose results are fed
//! back through an internal channel. The loop applies one event at a time,
//! so session transitions never interleave.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::RequestError;
use crate::service::{BillingService, WeatherService};
use crate::session::{Effect, Event, HostEvent, Session};
use crate::view::{render, View};

/// The embedding host: chat application plus identity SDK
pub trait Host: Send + Sync {
    /// Initialize the host SDK and start the identity flow
    fn initialize(&self);

    /// Render the identity provider's sign-in button
    fn display_login(&self) {}

    /// Navigate the operator's browser away from the widget
    fn redirect(&self, url: &str);

    /// A billing or weather call failed
    fn report(&self, error: &RequestError) {
        tracing::warn!(error = %error, "Request failed");
    }

    /// Show the current view
    fn render(&self, view: &View);
}

/// Inbound host events
///
/// `next_event` must be cancel safe: the runtime races it against service
/// completions and drops it when a completion wins.
#[async_trait]
pub trait EventSource: Send {
    /// `None` ends the session
    async fn next_event(&mut self) -> Option<HostEvent>;
}

#[async_trait]
impl EventSource for mpsc::Receiver<HostEvent> {
    async fn next_event(&mut self) -> Option<HostEvent> {
        self.recv().await
    }
}

#[async_trait]
impl EventSource for mpsc::UnboundedReceiver<HostEvent> {
    async fn next_event(&mut self) -> Option<HostEvent> {
        self.recv().await
    }
}

/// Recurring billing poll; aborted when dropped
#[derive(Debug)]
pub struct PollHandle(JoinHandle<()>);

impl PollHandle {
    fn start(every: Duration, ticks: mpsc::UnboundedSender<Event>) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(Event::PollTick).is_err() {
                    break;
                }
            }
        });
        Self(task)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Session driver for native hosts
pub struct WidgetRuntime {
    session: Session,
    billing: Arc<dyn BillingService>,
    weather: Arc<dyn WeatherService>,
    host: Arc<dyn Host>,
    poll: Option<PollHandle>,
    completions: mpsc::UnboundedSender<Event>,
    inbox: mpsc::UnboundedReceiver<Event>,
}

impl WidgetRuntime {
    pub fn new(
        session: Session,
        billing: Arc<dyn BillingService>,
        weather: Arc<dyn WeatherService>,
        host: Arc<dyn Host>,
    ) -> Self {
        let (completions, inbox) = mpsc::unbounded_channel();
        Self {
            session,
            billing,
            weather,
            host,
            poll: None,
            completions,
            inbox,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether a poll task is currently armed
    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    /// Process events until the source closes, then tear the session down
    pub async fn run<S: EventSource>(mut self, mut source: S) -> Session {
        self.host.render(&render(&self.session));

        loop {
            let next = tokio::select! {
                host_event = source.next_event() => host_event.map(Event::Host),
                Some(done) = self.inbox.recv() => Some(done),
            };
            let Some(event) = next else {
                break;
            };
            self.dispatch(event);
        }

        tracing::debug!("Event source closed, ending session");
        self.dispatch(Event::Host(HostEvent::Unmounted));
        self.poll = None;
        self.session
    }

    /// Apply one event, carry out its effects and re-render
    pub fn dispatch(&mut self, event: Event) {
        for effect in self.session.update(event) {
            self.execute(effect);
        }
        self.host.render(&render(&self.session));
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::InitHost => self.host.initialize(),
            Effect::DisplayLogin => self.host.display_login(),
            Effect::FetchCharges { token, epoch } => {
                let billing = Arc::clone(&self.billing);
                self.spawn_request(async move {
                    let result = billing.fetch_charges(&token).await;
                    Event::ChargesFetched { epoch, result }
                });
            }
            Effect::ConfirmPayment { token, payment_id } => {
                let billing = Arc::clone(&self.billing);
                self.spawn_request(async move {
                    Event::PaymentConfirmed(billing.confirm_payment(&token, &payment_id).await)
                });
            }
            Effect::FetchWeather { epoch, location } => {
                let weather = Arc::clone(&self.weather);
                self.spawn_request(async move {
                    let result = weather.fetch_weather(location).await;
                    Event::WeatherFetched { epoch, result }
                });
            }
            Effect::CreateCharge { token, request } => {
                let billing = Arc::clone(&self.billing);
                self.spawn_request(async move {
                    Event::ChargeCreated(billing.create_charge(&token, &request).await)
                });
            }
            Effect::StartPolling { every } => {
                tracing::info!(every_secs = every.as_secs(), "Polling charge status");
                self.poll = Some(PollHandle::start(every, self.completions.clone()));
            }
            Effect::StopPolling => {
                if self.poll.take().is_some() {
                    tracing::info!("Stopped polling charge status");
                }
            }
            Effect::Redirect(url) => self.host.redirect(&url),
            Effect::Report(error) => self.host.report(&error),
        }
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let completions = self.completions.clone();
        tokio::spawn(async move {
            // the receiver only goes away with the runtime itself
            let _ = completions.send(request.await);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::RequestResult;
    use crate::model::{
        AccessToken, ActivatedCharge, Charge, ChargeRequest, ChargeStatus, CreatedCharge, Geolocation, Identity,
        PaymentStatus, Visitor, Weather,
    };
    use crate::session::{AppState, VisitorState};
    use crate::view::BillingPanel;

    /// Billing fake; charge lists are served in order, the last one repeats
    #[derive(Default)]
    struct FakeBilling {
        charge_lists: Mutex<VecDeque<Vec<ChargeStatus>>>,
        fetches: AtomicUsize,
        activation: Option<ChargeStatus>,
        created: Mutex<Vec<ChargeRequest>>,
    }

    impl FakeBilling {
        fn with_lists(lists: Vec<Vec<ChargeStatus>>) -> Self {
            Self {
                charge_lists: Mutex::new(lists.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl BillingService for FakeBilling {
        async fn create_charge(&self, _token: &AccessToken, request: &ChargeRequest) -> RequestResult<CreatedCharge> {
            self.created.lock().unwrap().push(request.clone());
            Ok(CreatedCharge {
                id: Some("ch_1".into()),
                confirmation_url: "https://pay/x".into(),
            })
        }

        async fn confirm_payment(&self, _token: &AccessToken, payment_id: &str) -> RequestResult<ActivatedCharge> {
            assert_eq!(payment_id, "abc123");
            Ok(ActivatedCharge {
                status: self.activation,
            })
        }

        async fn fetch_charges(&self, token: &AccessToken) -> RequestResult<Vec<Charge>> {
            assert_eq!(token.as_str(), "token");
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut lists = self.charge_lists.lock().unwrap();
            let statuses = if lists.len() > 1 {
                lists.pop_front().unwrap_or_default()
            } else {
                lists.front().cloned().unwrap_or_default()
            };
            Ok(statuses.into_iter().map(Charge::with_status).collect())
        }
    }

    struct FakeWeather {
        fail: bool,
    }

    #[async_trait]
    impl WeatherService for FakeWeather {
        async fn fetch_weather(&self, location: Geolocation) -> RequestResult<Weather> {
            if self.fail {
                return Err(RequestError::status("GET /weather", 401));
            }
            assert_eq!(location, Geolocation { latitude: 10.0, longitude: 20.0 });
            Ok(Weather {
                temperature: 5.0,
                icon: "01d".into(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        initialized: AtomicUsize,
        logins: AtomicUsize,
        redirects: Mutex<Vec<String>>,
        reports: Mutex<Vec<RequestError>>,
        views: Mutex<Vec<View>>,
    }

    impl RecordingHost {
        fn last_view(&self) -> Option<View> {
            self.views.lock().unwrap().last().cloned()
        }
    }

    impl Host for RecordingHost {
        fn initialize(&self) {
            self.initialized.fetch_add(1, Ordering::SeqCst);
        }

        fn display_login(&self) {
            self.logins.fetch_add(1, Ordering::SeqCst);
        }

        fn redirect(&self, url: &str) {
            self.redirects.lock().unwrap().push(url.to_string());
        }

        fn report(&self, error: &RequestError) {
            self.reports.lock().unwrap().push(error.clone());
        }

        fn render(&self, view: &View) {
            self.views.lock().unwrap().push(view.clone());
        }
    }

    async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    fn start(
        billing: Arc<FakeBilling>,
        weather: FakeWeather,
        host: Arc<RecordingHost>,
        poll_every: Duration,
    ) -> (mpsc::UnboundedSender<HostEvent>, JoinHandle<Session>) {
        let session = Session::new("https://widget.example.com/", poll_every);
        let runtime = WidgetRuntime::new(session, billing, Arc::new(weather), host);
        let (events, source) = mpsc::unbounded_channel();
        (events, tokio::spawn(runtime.run(source)))
    }

    fn mounted(payment_id: Option<&str>) -> HostEvent {
        HostEvent::Mounted {
            embedded: true,
            payment_id: payment_id.map(ToString::to_string),
        }
    }

    #[tokio::test]
    async fn test_visitor_and_purchase_flow() {
        let billing = Arc::new(FakeBilling::with_lists(vec![vec![]]));
        let host = Arc::new(RecordingHost::default());
        let (events, task) = start(
            Arc::clone(&billing),
            FakeWeather { fail: false },
            Arc::clone(&host),
            Duration::from_secs(15),
        );

        events.send(mounted(None)).unwrap();
        events
            .send(HostEvent::IdentityFetched(Ok(Identity::new("token", &["billing_manage"]))))
            .unwrap();
        eventually("loaded", || host.last_view() == Some(View::SelectVisitor)).await;
        assert_eq!(host.initialized.load(Ordering::SeqCst), 1);

        events
            .send(HostEvent::CustomerProfile(Visitor::new("1", "Ann").located_at(10.0, 20.0)))
            .unwrap();
        eventually("offer", || host.last_view().is_some_and(|v| v.offers_purchase())).await;

        events.send(HostEvent::BuyClicked).unwrap();
        eventually("redirect", || !host.redirects.lock().unwrap().is_empty()).await;
        assert_eq!(*host.redirects.lock().unwrap(), vec!["https://pay/x".to_string()]);
        assert_eq!(billing.created.lock().unwrap()[0].price_cents, 125);

        drop(events);
        let session = task.await.unwrap();
        assert_eq!(session.app_state(), AppState::Loaded);
        assert_eq!(session.visitor_state(), VisitorState::Fetched);
        assert!(session.is_ended());
    }

    #[tokio::test]
    async fn test_confirmed_payment_polls_until_paid() {
        let billing = Arc::new(FakeBilling {
            activation: Some(ChargeStatus::Processed),
            ..FakeBilling::with_lists(vec![
                vec![],
                vec![ChargeStatus::Processed],
                vec![ChargeStatus::Success],
            ])
        });
        let host = Arc::new(RecordingHost::default());
        let (events, task) = start(
            Arc::clone(&billing),
            FakeWeather { fail: false },
            Arc::clone(&host),
            Duration::from_millis(20),
        );

        events.send(mounted(Some("abc123"))).unwrap();
        events
            .send(HostEvent::IdentityFetched(Ok(Identity::new("token", &["billing_manage"]))))
            .unwrap();
        events
            .send(HostEvent::CustomerProfile(Visitor::new("1", "Ann").located_at(10.0, 20.0)))
            .unwrap();

        eventually("paid", || {
            matches!(
                host.last_view(),
                Some(View::Visitor(ref panel)) if matches!(panel.billing, BillingPanel::Paid { .. })
            )
        })
        .await;

        // the poll is gone once paid
        tokio::time::sleep(Duration::from_millis(30)).await;
        let fetches = billing.fetches.load(Ordering::SeqCst);
        assert!(fetches >= 3);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(billing.fetches.load(Ordering::SeqCst), fetches);

        drop(events);
        let session = task.await.unwrap();
        assert_eq!(session.payment_status(), Some(PaymentStatus::Paid));
        assert!(!session.is_polling());
    }

    #[tokio::test]
    async fn test_closing_source_cancels_poll() {
        let billing = Arc::new(FakeBilling::with_lists(vec![vec![ChargeStatus::Processed]]));
        let host = Arc::new(RecordingHost::default());
        let (events, task) = start(
            Arc::clone(&billing),
            FakeWeather { fail: false },
            Arc::clone(&host),
            Duration::from_millis(20),
        );

        events.send(mounted(None)).unwrap();
        events
            .send(HostEvent::IdentityFetched(Ok(Identity::new("token", &["billing_manage"]))))
            .unwrap();
        eventually("a poll", || billing.fetches.load(Ordering::SeqCst) >= 2).await;

        drop(events);
        let session = task.await.unwrap();
        assert!(session.is_ended());
        assert!(!session.is_polling());

        // let requests spawned before shutdown land first
        tokio::time::sleep(Duration::from_millis(30)).await;
        let fetches = billing.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(billing.fetches.load(Ordering::SeqCst), fetches);
    }

    #[tokio::test]
    async fn test_unauthorized_displays_login() {
        let host = Arc::new(RecordingHost::default());
        let (events, task) = start(
            Arc::new(FakeBilling::default()),
            FakeWeather { fail: false },
            Arc::clone(&host),
            Duration::from_secs(15),
        );

        events.send(mounted(None)).unwrap();
        events
            .send(HostEvent::IdentityFetched(Err(crate::AuthError::Unauthorized)))
            .unwrap();
        eventually("sign-in", || host.last_view() == Some(View::SignIn)).await;
        assert_eq!(host.logins.load(Ordering::SeqCst), 1);

        drop(events);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_weather_failure_reaches_host() {
        let host = Arc::new(RecordingHost::default());
        let (events, task) = start(
            Arc::new(FakeBilling::with_lists(vec![vec![]])),
            FakeWeather { fail: true },
            Arc::clone(&host),
            Duration::from_secs(15),
        );

        events
            .send(HostEvent::CustomerProfile(Visitor::new("1", "Ann").located_at(10.0, 20.0)))
            .unwrap();
        eventually("report", || !host.reports.lock().unwrap().is_empty()).await;
        assert_eq!(
            host.reports.lock().unwrap()[0],
            RequestError::status("GET /weather", 401)
        );

        drop(events);
        let session = task.await.unwrap();
        assert_eq!(session.visitor_state(), VisitorState::Fetching);
    }
}
