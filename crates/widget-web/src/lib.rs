//! LiveChat weather widget frontend
//!
//! Leptos-based WASM frontend loaded by the agent app as an Agent App
//! Extension.
//!
//! ```text
//! main ─▶ GET /config.json ─▶ Controller ─▶ mount App ─▶ dispatch(Mounted)
//!                                  ▲                          │
//!                                  └── LiveChat / AccountsSDK ┘
//! ```

mod api;
mod app;
mod components;
mod controller;
mod host;

pub use app::App;
pub use controller::Controller;

use std::sync::Arc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;

use widget_billing::HttpBillingClient;
use widget_core::{HostEvent, WidgetConfig, WidgetError};
use widget_weather::OpenWeatherClient;

use crate::app::Unconfigured;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    leptos::task::spawn_local(async {
        match api::load_config().await.and_then(|config| start(&config)) {
            Ok(()) => {}
            Err(err) => {
                leptos::logging::error!("Widget failed to start: {err}");
                let message = err.user_message();
                leptos::mount::mount_to_body(move || view! { <Unconfigured message=message.clone() /> });
            }
        }
    });
}

fn start(config: &WidgetConfig) -> Result<(), WidgetError> {
    let billing = HttpBillingClient::from_config(config)?;
    let weather = OpenWeatherClient::from_widget(config)?;
    let controller = Controller::new(config, Arc::new(billing), Arc::new(weather));

    leptos::mount::mount_to_body(move || view! { <App controller=controller /> });

    controller.dispatch(HostEvent::Mounted {
        embedded: api::is_embedded(),
        payment_id: api::payment_id(),
    });
    Ok(())
}
