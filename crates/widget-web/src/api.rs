//! Widget Settings
//!
//! The bundle is served next to `/config.json`; the browser needs absolute
//! URLs, so the page origin is prepended.

use widget_core::{RequestError, WidgetConfig, WidgetError};

const ENDPOINT: &str = "GET /config.json";

/// Fetch and validate the widget settings
pub async fn load_config() -> Result<WidgetConfig, WidgetError> {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .ok_or_else(|| WidgetError::Config("page origin is unavailable".into()))?;

    let response = reqwest::Client::new()
        .get(format!("{origin}/config.json"))
        .send()
        .await
        .map_err(|e| RequestError::transport(ENDPOINT, e))?;

    if !response.status().is_success() {
        return Err(RequestError::status(ENDPOINT, response.status().as_u16()).into());
    }

    let config: WidgetConfig = response
        .json()
        .await
        .map_err(|e| RequestError::decode(ENDPOINT, e))?;
    config.validate()?;
    Ok(config)
}

/// `id` query parameter set by the billing confirmation redirect
pub fn payment_id() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    web_sys::UrlSearchParams::new_with_str(&search).ok()?.get("id")
}

/// Whether the page runs inside the agent app iframe
pub fn is_embedded() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    match window.top() {
        Ok(Some(top)) => wasm_bindgen::JsValue::from(top) != wasm_bindgen::JsValue::from(window),
        // cross-origin parents may refuse access; that still means a frame
        Ok(None) | Err(_) => true,
    }
}
