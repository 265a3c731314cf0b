//! Current weather via the RapidAPI WeatherAPI endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use aura_core::config::WeatherConfig;

use super::{ensure_success, require, transport_error};
use crate::error::ModuleError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    pub temperature: f64,
    pub condition: String,
    pub humidity: f64,
    pub wind_speed: f64,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: &str) -> Result<WeatherReport, ModuleError>;
}

pub struct RapidWeatherClient {
    client: Client,
    config: WeatherConfig,
    timeout_secs: u64,
}

impl RapidWeatherClient {
    pub fn new(client: Client, config: WeatherConfig, timeout_secs: u64) -> Self {
        Self {
            client,
            config,
            timeout_secs,
        }
    }
}

#[async_trait]
impl WeatherProvider for RapidWeatherClient {
    async fn current(&self, location: &str) -> Result<WeatherReport, ModuleError> {
        require(&self.config.api_key, "weather api_key")?;

        let response = self
            .client
            .get(&self.config.url)
            .header("x-rapidapi-key", &self.config.api_key)
            .header("x-rapidapi-host", &self.config.api_host)
            .query(&[("q", location)])
            .send()
            .await
            .map_err(transport_error("Weather", self.timeout_secs))?;

        let body: CurrentResponse = ensure_success("Weather", response)
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream("Weather", e))?;

        Ok(body.into_report())
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    location: Location,
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Location {
    name: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
    condition: Condition,
    humidity: f64,
    wind_kph: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

impl CurrentResponse {
    fn into_report(self) -> WeatherReport {
        WeatherReport {
            location: format!("{}, {}", self.location.name, self.location.country),
            temperature: self.current.temp_c,
            condition: self.current.condition.text,
            humidity: self.current.humidity,
            wind_speed: self.current.wind_kph,
        }
    }
}
