//! OpenWeatherMap Client
//!
//! Implementation of `WeatherService` over the current-weather endpoint.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use widget_core::{
    Geolocation, RequestError, RequestResult, Result, Weather, WeatherService, WidgetConfig, WidgetError,
};

const ENDPOINT: &str = "GET /weather";

/// Client configuration
#[derive(Clone, Debug)]
pub struct OpenWeatherConfig {
    /// API root, e.g. `https://api.openweathermap.org/data/2.5`
    pub base_url: String,

    pub api_key: String,

    /// `metric`, `imperial` or `standard`
    pub units: String,
}

impl OpenWeatherConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            units: "metric".into(),
        }
    }

    pub fn from_widget(config: &WidgetConfig) -> Self {
        Self::new(config.weather_api_url.clone(), config.weather_api_key.clone())
    }
}

/// Current conditions response, trimmed to what the widget shows
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    icon: String,
}

impl CurrentWeather {
    fn into_weather(self) -> RequestResult<Weather> {
        let icon = self
            .weather
            .into_iter()
            .next()
            .map(|c| c.icon)
            .ok_or_else(|| RequestError::decode(ENDPOINT, "no weather condition in response"))?;

        Ok(Weather {
            temperature: self.main.temp,
            icon,
        })
    }
}

/// OpenWeatherMap weather provider
#[derive(Clone, Debug)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    url: Url,
    config: OpenWeatherConfig,
}

impl OpenWeatherClient {
    pub fn from_config(config: OpenWeatherConfig) -> Result<Self> {
        let mut url = Url::parse(&config.base_url)
            .map_err(|e| WidgetError::Config(format!("invalid weather API URL {:?}: {e}", config.base_url)))?;
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("weather");
        }

        Ok(Self {
            http: reqwest::Client::new(),
            url,
            config,
        })
    }

    /// Create from widget configuration
    pub fn from_widget(config: &WidgetConfig) -> Result<Self> {
        Self::from_config(OpenWeatherConfig::from_widget(config))
    }

    /// Current conditions at a coordinate; only `200 OK` counts as success
    pub async fn fetch_weather(&self, latitude: f64, longitude: f64) -> RequestResult<Weather> {
        let response = self
            .http
            .get(self.url.clone())
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.config.api_key.clone()),
                ("units", self.config.units.clone()),
            ])
            .send()
            .await
            .map_err(|e| RequestError::transport(ENDPOINT, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Weather provider not responding");
            return Err(RequestError::status(ENDPOINT, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::transport(ENDPOINT, e))?;
        let current: CurrentWeather =
            serde_json::from_slice(&body).map_err(|e| RequestError::decode(ENDPOINT, e))?;

        current.into_weather()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl WeatherService for OpenWeatherClient {
    async fn fetch_weather(&self, location: Geolocation) -> RequestResult<Weather> {
        OpenWeatherClient::fetch_weather(self, location.latitude, location.longitude).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Query, State},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use widget_core::RequestFailure;

    use super::*;

    type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn current(State(seen): State<Seen>, Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
        seen.lock().unwrap().push(query);
        Json(json!({
            "coord": { "lon": 20, "lat": 10 },
            "main": { "temp": 5, "humidity": 80 },
            "weather": [{ "id": 800, "main": "Clear", "icon": "01d" }]
        }))
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/data/2.5")
    }

    #[test]
    fn test_config_defaults_to_metric() {
        let config = OpenWeatherConfig::new("https://api.openweathermap.org/data/2.5", "key");
        assert_eq!(config.units, "metric");
    }

    #[tokio::test]
    async fn test_fetch_weather() {
        let seen = Seen::default();
        let app = Router::new()
            .route("/data/2.5/weather", get(current))
            .with_state(Arc::clone(&seen));
        let client = OpenWeatherClient::from_config(OpenWeatherConfig::new(serve(app).await, "secret")).unwrap();

        let weather = WeatherService::fetch_weather(
            &client,
            Geolocation {
                latitude: 10.0,
                longitude: 20.0,
            },
        )
        .await;
        assert_eq!(
            weather,
            Ok(Weather {
                temperature: 5.0,
                icon: "01d".into()
            })
        );

        let query = seen.lock().unwrap()[0].clone();
        assert_eq!(query["lat"], "10");
        assert_eq!(query["lon"], "20");
        assert_eq!(query["appid"], "secret");
        assert_eq!(query["units"], "metric");
    }

    #[tokio::test]
    async fn test_non_200_is_request_error() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "cod": 401, "message": "Invalid API key" }))) }),
        );
        let client = OpenWeatherClient::from_config(OpenWeatherConfig::new(serve(app).await, "bad")).unwrap();

        let err = client.fetch_weather(10.0, 20.0).await.unwrap_err();
        assert_eq!(err, RequestError::status("GET /weather", 401));
    }

    #[tokio::test]
    async fn test_missing_condition_is_decode_error() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|| async { Json(json!({ "main": { "temp": 5 }, "weather": [] })) }),
        );
        let client = OpenWeatherClient::from_config(OpenWeatherConfig::new(serve(app).await, "key")).unwrap();

        let err = client.fetch_weather(10.0, 20.0).await.unwrap_err();
        assert!(matches!(err.failure, RequestFailure::Decode(_)));
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let client =
            OpenWeatherClient::from_config(OpenWeatherConfig::new("https://api.openweathermap.org/data/2.5/", "k"))
                .unwrap();
        assert_eq!(client.url.as_str(), "https://api.openweathermap.org/data/2.5/weather");
    }
}
