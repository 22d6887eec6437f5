//! Widget Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WidgetError};

/// Default weather provider endpoint
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Default billing API endpoint
pub const DEFAULT_BILLING_API_URL: &str = "https://billing.livechatinc.com";

/// How often a processed charge is re-checked
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Externally supplied widget settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// OAuth client id registered with the identity provider
    pub client_id: String,

    /// Public address of the widget; billing returns the operator here
    pub app_url: String,

    pub billing_api_url: String,

    #[serde(default = "default_weather_api_url")]
    pub weather_api_url: String,

    pub weather_api_key: String,

    /// Create charges in test mode
    #[serde(default)]
    pub direct_charge_test: bool,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_weather_api_url() -> String {
    DEFAULT_WEATHER_API_URL.into()
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl WidgetConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = required("WIDGET_CLIENT_ID")?;
        let app_url = required("WIDGET_APP_URL")?;
        let weather_api_key = required("WEATHER_API_KEY")?;

        let billing_api_url =
            std::env::var("BILLING_API_URL").unwrap_or_else(|_| DEFAULT_BILLING_API_URL.into());
        let weather_api_url = std::env::var("WEATHER_API_URL").unwrap_or_else(|_| default_weather_api_url());
        let direct_charge_test = std::env::var("DIRECT_CHARGE_TEST")
            .ok()
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"));
        let poll_interval_secs = std::env::var("BILLING_POLL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let config = Self {
            client_id,
            app_url,
            billing_api_url,
            weather_api_url,
            weather_api_key,
            direct_charge_test,
            poll_interval_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the widget cannot run with
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("app_url", &self.app_url),
            ("billing_api_url", &self.billing_api_url),
            ("weather_api_url", &self.weather_api_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(WidgetError::Config(format!("{name} must be an http(s) URL, got {url:?}")));
            }
        }
        if self.poll_interval_secs == 0 {
            return Err(WidgetError::Config("poll_interval_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| WidgetError::Config(format!("{name} not set")))
}
