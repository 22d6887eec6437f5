//! UI Components

use leptos::prelude::*;

use widget_core::view::{DEVELOPER_CONSOLE_URL, EXTENSION_DOCS_URL, INSTALL_STEPS};
use widget_core::{BillingPanel, HostEvent, VisitorPanel};

use crate::controller::Controller;

/// Installation guide for pages opened outside the agent app
#[component]
pub fn InstallGuide() -> impl IntoView {
    view! {
        <div>
            <p>"This app is an "<a href=EXTENSION_DOCS_URL>"Agent App Extension"</a>"."</p>
            <p>
                <strong>"It cannot be opened directly in the browser window"</strong>
                ". It must be installed on your LiveChat account and loaded inside LiveChat agent app."
            </p>
            <p>"To do this:"</p>
            <ol>
                <li>
                    "Create new app in "<a href=DEVELOPER_CONSOLE_URL>"LiveChat Developers Console"</a>
                    ". Choose \"Web app\" as an app type."
                </li>
                {INSTALL_STEPS[1..].iter().map(|step| view! { <li>{*step}</li> }).collect_view()}
            </ol>
            <p>
                "From now on, when you sign in to LiveChat agent app, you will see a new extension loaded in the \
                 right sidebar. This is your app!"
            </p>
        </div>
    }
}

/// Sign-in prompt; the identity SDK renders its button into the placeholder
#[component]
pub fn SignIn() -> impl IntoView {
    view! {
        <div>
            <p>"You must sign in with your LiveChat account before you can make a test purchase."</p>
            <div class="livechat-login-button"></div>
        </div>
    }
}

#[component]
pub fn VisitorDetails(panel: VisitorPanel, controller: Controller) -> impl IntoView {
    let VisitorPanel {
        id,
        name,
        temperature,
        billing,
        purchase_error,
    } = panel;

    view! {
        <ul class="visitor-details">
            <li><strong>"Visitor ID:"</strong>" "{id}</li>
            <li><strong>"Visitor name:"</strong>" "{name}</li>
            {temperature.map(|t| view! { <li><strong>"Temperature:"</strong>" "{format!("{t}°C")}</li> })}
            <Billing panel=billing controller=controller />
            {purchase_error.map(|e| view! { <li class="purchase-error">"Purchase failed: "{e}</li> })}
        </ul>
    }
}

#[component]
fn Billing(panel: BillingPanel, controller: Controller) -> impl IntoView {
    match panel {
        BillingPanel::OwnerOnly => view! {
            <div>
                <p>"\"Buy now\" button should be there, but it's only available to your LiveChat account owner."</p>
                <p>"You can still use the app, though."</p>
            </div>
        }
        .into_any(),
        BillingPanel::Offer {
            name,
            price_label,
            pending,
        } => view! {
            <li>
                <hr />
                "Buy "{name.to_lowercase()}" for "<strong>{format!("{price_label}!")}</strong>
                <br />
                <button disabled=pending on:click=move |_| controller.dispatch(HostEvent::BuyClicked)>
                    "Buy now"
                </button>
            </li>
        }
        .into_any(),
        BillingPanel::AwaitingPayment => view! {
            <li>
                <hr />
                <span class="waiting-badge">"waiting for payment…"</span>
            </li>
        }
        .into_any(),
        BillingPanel::Paid { icon_url } => view! {
            <li>
                <strong>"Weather icon:"</strong>
                <img class="weather-icon" src=icon_url alt="" />
                <span class="paid-badge">
                    <span role="img" aria-label="moneybag">"💰"</span>
                    " paid"
                </span>
            </li>
        }
        .into_any(),
        BillingPanel::Unavailable => view! {
            <li class="payment-error">"Payment status is unavailable right now."</li>
        }
        .into_any(),
        BillingPanel::Hidden => ().into_any(),
    }
}
