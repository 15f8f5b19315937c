use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use cloudguard_api::models::{CurrentWeather, WeatherForecast, WeatherResponse};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::configs::Weather;
use crate::errors::WeatherError;
use crate::services::CacheService;

const HOURLY_ENTRIES: usize = 24;
const DAILY_ENTRIES: usize = 7;

#[derive(Debug, Deserialize)]
struct Condition {
    id: i32,
    main: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct Measurements {
    temp: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentPayload {
    weather: Vec<Condition>,
    main: Measurements,
    wind: Wind,
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt_txt: String,
    main: Measurements,
    weather: Vec<Condition>,
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastPayload {
    list: Vec<ForecastItem>,
}

/// OpenWeatherMap proxy with per-location caching.
pub struct WeatherService {
    http: reqwest::Client,
    settings: Weather,
    cache: Arc<CacheService>,
}

impl WeatherService {
    pub fn new(settings: Weather, cache: Arc<CacheService>) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            cache,
        }
    }

    pub async fn report(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherResponse, WeatherError> {
        Ok(WeatherResponse {
            current: self.current(latitude, longitude).await?,
            hourly: self.hourly(latitude, longitude).await?,
            daily: self.daily(latitude, longitude).await?,
        })
    }

    pub async fn current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentWeather, WeatherError> {
        let key = format!("weather:current:{latitude}:{longitude}");
        let ttl = Duration::from_secs(self.settings.current_ttl);

        self.cache
            .remember(&key, ttl, || async {
                let payload: CurrentPayload = self.fetch("weather", latitude, longitude).await?;
                let condition = primary(&payload.weather)?;

                Ok(CurrentWeather {
                    temperature: payload.main.temp.round() as i32,
                    condition: condition.main.clone(),
                    icon: condition.icon.clone(),
                    humidity: payload.main.humidity.round() as i32,
                    wind_speed: payload.wind.speed.round() as i32,
                    is_raining: is_raining(condition.id),
                    chance_of_rain: chance_of_rain(payload.pop),
                })
            })
            .await
    }

    pub async fn hourly(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<WeatherForecast>, WeatherError> {
        let key = format!("weather:hourly:{latitude}:{longitude}");
        let ttl = Duration::from_secs(self.settings.forecast_ttl);

        self.cache
            .remember(&key, ttl, || async {
                let payload: ForecastPayload = self.fetch("forecast", latitude, longitude).await?;

                payload
                    .list
                    .iter()
                    .take(HOURLY_ENTRIES)
                    .map(|item| {
                        let condition = primary(&item.weather)?;

                        Ok(WeatherForecast {
                            time: item.dt_txt.clone(),
                            temperature: item.main.temp.round() as i32,
                            condition: condition.main.clone(),
                            icon: condition.icon.clone(),
                            chance_of_rain: chance_of_rain(item.pop),
                        })
                    })
                    .collect()
            })
            .await
    }

    pub async fn daily(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<WeatherForecast>, WeatherError> {
        let key = format!("weather:daily:{latitude}:{longitude}");
        let ttl = Duration::from_secs(self.settings.daily_ttl);

        self.cache
            .remember(&key, ttl, || async {
                let payload: ForecastPayload = self.fetch("forecast", latitude, longitude).await?;

                summarize_days(&payload.list)
            })
            .await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.settings.base_url.trim_end_matches('/'), endpoint);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.settings.api_key.clone()),
                ("units", String::from("metric")),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Provider(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Provider(anyhow!(
                "{endpoint} answered {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WeatherError::Provider(e.into()))
    }
}

fn primary(conditions: &[Condition]) -> Result<&Condition, WeatherError> {
    conditions
        .first()
        .ok_or_else(|| WeatherError::Provider(anyhow!("payload has no weather condition")))
}

fn is_raining(condition_id: i32) -> bool {
    (500..600).contains(&condition_id)
}

fn chance_of_rain(pop: Option<f64>) -> i32 {
    pop.map(|pop| (pop * 100.0).round() as i32).unwrap_or(0)
}

/// Most frequent value; ties go to the value seen first.
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let best = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);

    counts
        .into_iter()
        .find(|(_, count)| *count == best)
        .map(|(value, _)| value.to_string())
        .unwrap_or_default()
}

/// Groups three-hourly entries by calendar date, keeping the first seven days.
fn summarize_days(items: &[ForecastItem]) -> Result<Vec<WeatherForecast>, WeatherError> {
    let mut days: Vec<(&str, Vec<&ForecastItem>)> = Vec::new();

    for item in items {
        let date = item.dt_txt.get(..10).unwrap_or(&item.dt_txt);

        match days.iter_mut().find(|(day, _)| *day == date) {
            Some((_, entries)) => entries.push(item),
            None => days.push((date, vec![item])),
        }
    }

    days.into_iter()
        .take(DAILY_ENTRIES)
        .map(|(_, entries)| {
            let conditions = entries
                .iter()
                .map(|item| primary(&item.weather))
                .collect::<Result<Vec<_>, _>>()?;

            let average =
                entries.iter().map(|item| item.main.temp).sum::<f64>() / entries.len() as f64;

            Ok(WeatherForecast {
                time: entries[0].dt_txt.clone(),
                temperature: average.round() as i32,
                condition: mode(conditions.iter().map(|c| c.main.as_str())),
                icon: mode(conditions.iter().map(|c| c.icon.as_str())),
                chance_of_rain: entries
                    .iter()
                    .map(|item| chance_of_rain(item.pop))
                    .max()
                    .unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn item(dt_txt: &str, temp: f64, main: &str, icon: &str, pop: Option<f64>) -> ForecastItem {
        ForecastItem {
            dt_txt: dt_txt.to_string(),
            main: Measurements { temp, humidity: 50.0 },
            weather: vec![Condition {
                id: 800,
                main: main.to_string(),
                icon: icon.to_string(),
            }],
            pop,
        }
    }

    #[test]
    fn test_rain_detection_and_chance() {
        assert!(is_raining(500));
        assert!(is_raining(599));
        assert!(!is_raining(600));
        assert!(!is_raining(800));

        assert_eq!(chance_of_rain(Some(0.456)), 46);
        assert_eq!(chance_of_rain(None), 0);
    }

    #[test]
    fn test_mode_prefers_first_on_tie() {
        assert_eq!(mode(["Clouds", "Rain", "Rain"].into_iter()), "Rain");
        assert_eq!(mode(["Clear", "Rain"].into_iter()), "Clear");
    }

    #[test]
    fn test_days_are_summarized() {
        let items = vec![
            item("2024-05-01 12:00:00", 10.0, "Rain", "10d", Some(0.2)),
            item("2024-05-01 15:00:00", 13.0, "Rain", "10d", Some(0.8)),
            item("2024-05-01 18:00:00", 12.0, "Clouds", "04d", None),
            item("2024-05-02 00:00:00", 8.4, "Clear", "01n", None),
        ];

        let days = summarize_days(&items).unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].time, "2024-05-01 12:00:00");
        assert_eq!(days[0].temperature, 12);
        assert_eq!(days[0].condition, "Rain");
        assert_eq!(days[0].icon, "10d");
        assert_eq!(days[0].chance_of_rain, 80);
        assert_eq!(days[1].temperature, 8);
        assert_eq!(days[1].chance_of_rain, 0);
    }

    #[test]
    fn test_days_are_capped_at_a_week() {
        let items: Vec<_> = (1..=9)
            .map(|day| item(&format!("2024-05-{day:02} 12:00:00"), 20.0, "Clear", "01d", None))
            .collect();

        assert_eq!(summarize_days(&items).unwrap().len(), DAILY_ENTRIES);
    }

    #[test]
    fn test_current_payload_parses_provider_shape() {
        let payload: CurrentPayload = serde_json::from_value(json!({
            "weather": [{"id": 501, "main": "Rain", "description": "moderate rain", "icon": "10d"}],
            "main": {"temp": 14.6, "humidity": 82},
            "wind": {"speed": 4.4},
            "name": "London"
        }))
        .unwrap();

        assert_eq!(payload.main.temp.round() as i32, 15);
        assert!(payload.pop.is_none());
        assert!(is_raining(payload.weather[0].id));
    }
}
