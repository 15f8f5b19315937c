use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    /// Rounded temperature in Celsius
    pub temperature: i32,
    pub condition: String,
    pub icon: String,
    /// Relative humidity percentage
    pub humidity: i32,
    /// Rounded wind speed in metres per second
    pub wind_speed: i32,
    pub is_raining: bool,
    /// Probability of precipitation percentage (0-100)
    pub chance_of_rain: i32,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    /// Provider timestamp text, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    pub temperature: i32,
    pub condition: String,
    pub icon: String,
    pub chance_of_rain: i32,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub current: CurrentWeather,
    pub hourly: Vec<WeatherForecast>,
    pub daily: Vec<WeatherForecast>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}
