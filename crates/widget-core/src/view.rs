//! View Model
//!
//! [`render`] maps a session to what the widget shows. It has no side effects;
//! frontends turn a [`View`] into markup and wire the purchase button back to
//! [`HostEvent::BuyClicked`](crate::HostEvent::BuyClicked).

use std::fmt;

use crate::model::{PaymentStatus, WEATHER_ICON_OFFER};
use crate::session::{AppState, Session, VisitorState};

/// Developer console address shown in the installation guide
pub const DEVELOPER_CONSOLE_URL: &str = "https://developers.livechatinc.com/console";

/// Agent App Extension documentation
pub const EXTENSION_DOCS_URL: &str = "https://docs.livechatinc.com/agent-app-extension/";

/// Installation guide shown when the widget is opened outside the host
pub const INSTALL_STEPS: [&str; 5] = [
    "Create new app in LiveChat Developers Console. Choose \"Web app\" as an app type.",
    "In Authorization page, enter the address your app will be deployed to (\"Redirect URI whitelist\" field). \
     For example: https://my-company.com/livechat-extension/",
    "Check \"offer in-app payments\" scope from the \"Access scopes\" list.",
    "In Features, enter your \"Plugin source URL\" for Agent App Extension feature. It should be the same as \
     previous \"Redirect URI whitelist\" value, for example: https://my-company.com/livechat-extension/",
    "Finally, in Distribution, install the app on your LiveChat account.",
];

/// What the widget displays
#[derive(Clone, Debug, PartialEq)]
pub enum View {
    /// Installation guide
    NotEmbedded,
    Loading,
    /// Sign-in prompt; the frontend places the login button here
    SignIn,
    AccessDenied,
    Failed,
    SelectVisitor,
    FetchingVisitor,
    Visitor(VisitorPanel),
}

/// Details of the selected visitor
#[derive(Clone, Debug, PartialEq)]
pub struct VisitorPanel {
    pub id: String,
    pub name: String,

    /// Degrees Celsius
    pub temperature: Option<f64>,

    pub billing: BillingPanel,

    /// Shown when the last purchase attempt failed
    pub purchase_error: Option<String>,
}

/// Purchase area below the visitor details
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BillingPanel {
    /// Operator lacks the billing scope
    OwnerOnly,

    Offer {
        name: String,
        price_label: String,
        /// A charge is being created; the button is disabled
        pending: bool,
    },

    AwaitingPayment,

    Paid {
        icon_url: String,
    },

    /// Charge history is unavailable
    Unavailable,

    /// No weather icon to sell for this visitor
    Hidden,
}

/// Map the session to its view
pub fn render(session: &Session) -> View {
    match session.app_state() {
        AppState::NotIframe => View::NotEmbedded,
        AppState::Loading => View::Loading,
        AppState::NotAuthorized => View::SignIn,
        AppState::AccessDenied => View::AccessDenied,
        AppState::Error => View::Failed,
        AppState::Loaded => match session.visitor_state() {
            VisitorState::NotSelected => View::SelectVisitor,
            VisitorState::Fetching => View::FetchingVisitor,
            VisitorState::Fetched => match session.visitor() {
                Some(visitor) => View::Visitor(VisitorPanel {
                    id: visitor.id.clone(),
                    name: visitor.name.clone(),
                    temperature: session.weather().map(|w| w.temperature),
                    billing: billing_panel(session),
                    purchase_error: session.purchase_error().map(ToString::to_string),
                }),
                None => View::SelectVisitor,
            },
        },
    }
}

fn billing_panel(session: &Session) -> BillingPanel {
    if !session.has_billing_access() {
        return BillingPanel::OwnerOnly;
    }
    let Some(weather) = session.weather() else {
        return BillingPanel::Hidden;
    };

    match session.payment_status() {
        None => BillingPanel::Offer {
            name: WEATHER_ICON_OFFER.name.to_string(),
            price_label: WEATHER_ICON_OFFER.price_label(),
            pending: session.purchase_pending(),
        },
        Some(PaymentStatus::Processed) => BillingPanel::AwaitingPayment,
        Some(PaymentStatus::Paid) => BillingPanel::Paid {
            icon_url: weather.icon_url(),
        },
        Some(PaymentStatus::Error) => BillingPanel::Unavailable,
    }
}

impl View {
    /// Whether the purchase control is part of this view
    pub fn offers_purchase(&self) -> bool {
        matches!(
            self,
            View::Visitor(VisitorPanel {
                billing: BillingPanel::Offer { .. },
                ..
            })
        )
    }
}

/// Plain-text rendering for hosts without markup
impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::NotEmbedded => {
                writeln!(f, "This app is an Agent App Extension ({EXTENSION_DOCS_URL}).")?;
                writeln!(
                    f,
                    "It cannot be opened directly in the browser window. It must be installed on your \
                     LiveChat account and loaded inside LiveChat agent app."
                )?;
                writeln!(f, "To do this:")?;
                for (n, step) in INSTALL_STEPS.iter().enumerate() {
                    writeln!(f, "{}. {step}", n + 1)?;
                }
                write!(
                    f,
                    "From now on, when you sign in to LiveChat agent app, you will see a new extension \
                     loaded in the right sidebar. This is your app!"
                )
            }
            View::Loading => write!(f, "Loading…"),
            View::SignIn => write!(
                f,
                "You must sign in with your LiveChat account before you can make a test purchase."
            ),
            View::AccessDenied => write!(
                f,
                "Access denied.\nProbably this application is installed on a different account and you \
                 do not have access to it."
            ),
            View::Failed => write!(f, "Something is wrong. Check developer tools console to see error details."),
            View::SelectVisitor => write!(f, "Please select a visitor."),
            View::FetchingVisitor => write!(f, "Fetching…"),
            View::Visitor(panel) => write!(f, "{panel}"),
        }
    }
}

impl fmt::Display for VisitorPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Visitor ID: {}", self.id)?;
        write!(f, "Visitor name: {}", self.name)?;
        if let Some(temperature) = self.temperature {
            write!(f, "\nTemperature: {temperature}°C")?;
        }
        match &self.billing {
            BillingPanel::OwnerOnly => write!(
                f,
                "\n\"Buy now\" button should be there, but it's only available to your LiveChat account \
                 owner.\nYou can still use the app, though."
            )?,
            BillingPanel::Offer { name, price_label, .. } => {
                write!(f, "\nBuy {} for {price_label}! [Buy now]", name.to_lowercase())?;
            }
            BillingPanel::AwaitingPayment => write!(f, "\nwaiting for payment…")?,
            BillingPanel::Paid { icon_url } => write!(f, "\nWeather icon: {icon_url} (paid)")?,
            BillingPanel::Unavailable => write!(f, "\nPayment status is unavailable right now.")?,
            BillingPanel::Hidden => {}
        }
        if let Some(error) = &self.purchase_error {
            write!(f, "\nPurchase failed: {error}")?;
        }
        Ok(())
    }
}
