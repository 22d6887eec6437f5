//! Host SDK Bindings
//!
//! Bindings to the two scripts the agent app page provides: `LiveChat`
//! (Agent App Extension SDK, delivers customer profiles) and `AccountsSDK`
//! (identity, delivers the access token or an auth failure).
//!
//! Callback payloads cross the boundary as JSON and are decoded with serde.

use std::cell::RefCell;

use serde_json::Value;
use wasm_bindgen::prelude::*;

use widget_core::{AuthError, Identity, IdentityFailure, Visitor};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = LiveChat, js_name = init)]
    fn livechat_init(options: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = LiveChat, js_name = on)]
    fn livechat_on(event: &str, handler: &JsValue) -> Result<(), JsValue>;

    type AccountsSdk;

    #[wasm_bindgen(catch, js_namespace = AccountsSDK, js_name = init)]
    fn accounts_init(options: &JsValue) -> Result<AccountsSdk, JsValue>;

    #[wasm_bindgen(catch, method, js_name = displayButtons)]
    fn display_buttons(this: &AccountsSdk) -> Result<(), JsValue>;
}

thread_local! {
    static ACCOUNTS: RefCell<Option<AccountsSdk>> = const { RefCell::new(None) };
}

/// Initialize the extension without its built-in authorization, subscribe to
/// customer profiles and start the identity flow
pub fn init(
    client_id: &str,
    on_profile: impl Fn(Visitor) + 'static,
    on_identity: impl Fn(Result<Identity, AuthError>) + 'static,
) -> Result<(), JsValue> {
    let options = js_sys::Object::new();
    js_sys::Reflect::set(&options, &"authorize".into(), &JsValue::FALSE)?;
    livechat_init(&options)?;

    let profile = Closure::<dyn FnMut(JsValue)>::new(move |data: JsValue| {
        match to_json(&data).map(serde_json::from_value::<Visitor>) {
            Some(Ok(visitor)) => on_profile(visitor),
            Some(Err(err)) => leptos::logging::warn!("Ignoring malformed customer profile: {err}"),
            None => leptos::logging::warn!("Ignoring empty customer profile"),
        }
    });
    livechat_on("customer_profile", profile.as_ref())?;
    // lives as long as the page
    profile.forget();

    let identity = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |error: JsValue, data: JsValue| {
        on_identity(identity_result(to_json(&error), to_json(&data)));
    });
    let options = js_sys::Object::new();
    js_sys::Reflect::set(&options, &"client_id".into(), &client_id.into())?;
    js_sys::Reflect::set(&options, &"onIdentityFetched".into(), identity.as_ref())?;
    let sdk = accounts_init(&options)?;
    identity.forget();

    ACCOUNTS.with_borrow_mut(|slot| *slot = Some(sdk));
    Ok(())
}

/// Render the sign-in button into `.livechat-login-button`
pub fn show_login_button() -> Result<(), JsValue> {
    ACCOUNTS.with_borrow(|sdk| match sdk {
        Some(sdk) => sdk.display_buttons(),
        None => Err(JsValue::from_str("identity SDK is not initialized")),
    })
}

fn to_json(value: &JsValue) -> Option<Value> {
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let text = js_sys::JSON::stringify(value).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

/// Decode an `onIdentityFetched(error, data)` call
fn identity_result(error: Option<Value>, data: Option<Value>) -> Result<Identity, AuthError> {
    if let Some(error) = error {
        leptos::logging::warn!("Identity error: {error}");
        return Err(match serde_json::from_value::<IdentityFailure>(error.clone()) {
            Ok(failure) => failure.into_auth_error(),
            Err(_) => AuthError::Other(error.to_string()),
        });
    }

    let data = data.ok_or_else(|| AuthError::Other("identity callback without data".into()))?;
    serde_json::from_value(data).map_err(|e| AuthError::Other(format!("malformed identity: {e}")))
}

/// Human readable form of a thrown JS value
pub fn describe(error: &JsValue) -> String {
    error
        .as_string()
        .or_else(|| to_json(error).map(|v| v.to_string()))
        .unwrap_or_else(|| format!("{error:?}"))
}
