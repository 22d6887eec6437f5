//! # widget-weather
//!
//! Current-weather lookup for the visitor panel, backed by OpenWeatherMap.
//!
//! ```text
//! Visitor.geolocation ──▶ GET {base}/weather?lat=..&lon=..&appid=..&units=metric
//!                                   │
//!                                   ▼
//!                         { main.temp, weather[0].icon } ──▶ Weather
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use widget_core::WeatherService;
//! use widget_weather::{OpenWeatherClient, OpenWeatherConfig};
//!
//! let client = OpenWeatherClient::from_config(OpenWeatherConfig::new(
//!     "https://api.openweathermap.org/data/2.5",
//!     std::env::var("WEATHER_API_KEY")?,
//! ))?;
//! let weather = client.fetch_weather(52.23, 21.01).await?;
//! println!("{}°C {}", weather.temperature, weather.icon_url());
//! ```

mod openweather;

pub use openweather::{OpenWeatherClient, OpenWeatherConfig};
