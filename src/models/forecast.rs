use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Weather forecast data from the OpenWeatherMap 5-day/3-hour API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub fetched_at: DateTime<Utc>,
    pub location: ForecastLocation,
    pub hourly: Vec<ForecastPoint>,        // 3-hour intervals
    pub daily_summary: Vec<DailyForecast>, // Aggregated by day
}

impl WeatherForecast {
    /// Rank forecast days by suitability for outdoor work and return up to
    /// `limit` dates, best first. Days with a high chance of precipitation
    /// are excluded outright, so the result may be empty.
    pub fn best_outdoor_days(&self, limit: usize) -> Vec<NaiveDate> {
        let mut scored: Vec<(&DailyForecast, f64)> = self
            .daily_summary
            .iter()
            .filter(|d| d.max_precipitation_prob < 0.7 && !d.dominant_condition.has_precipitation())
            .map(|d| (d, d.outdoor_score()))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(limit).map(|(d, _)| d.date).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastLocation {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A single 3-hour forecast point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub temp_f: f64,
    pub humidity_percent: f64,
    pub precipitation_mm: f64,   // rain + snow
    pub precipitation_prob: f64, // 0.0-1.0
    pub wind_speed_mph: f64,
    pub wind_gust_mph: Option<f64>,
    pub cloud_cover_percent: f64,
    pub weather_condition: WeatherCondition,
}

/// Aggregated daily forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub high_temp_f: f64,
    pub low_temp_f: f64,
    pub avg_humidity: f64,
    pub total_precipitation_mm: f64,
    pub max_precipitation_prob: f64,
    pub dominant_condition: WeatherCondition,
    pub avg_wind_speed_mph: f64,
    pub max_wind_gust_mph: Option<f64>,
}

impl DailyForecast {
    /// Penalty score for outdoor work. Lower is better: precipitation risk
    /// dominates, then temperatures outside the 50-85F comfort band, then
    /// sustained wind above 15 mph.
    pub fn outdoor_score(&self) -> f64 {
        let mut score = self.max_precipitation_prob * 100.0 + self.total_precipitation_mm * 10.0;

        if self.high_temp_f > 85.0 {
            score += self.high_temp_f - 85.0;
        }
        if self.high_temp_f < 50.0 {
            score += 50.0 - self.high_temp_f;
        }
        if self.avg_wind_speed_mph > 15.0 {
            score += (self.avg_wind_speed_mph - 15.0) * 2.0;
        }

        score
    }
}

/// Weather condition categories from OpenWeatherMap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WeatherCondition {
    #[default]
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    Other,
}

impl WeatherCondition {
    pub fn from_owm_id(id: u32) -> Self {
        match id {
            200..=232 => WeatherCondition::Thunderstorm,
            300..=321 => WeatherCondition::Drizzle,
            500..=531 => WeatherCondition::Rain,
            600..=622 => WeatherCondition::Snow,
            701 => WeatherCondition::Mist,
            741 => WeatherCondition::Fog,
            800 => WeatherCondition::Clear,
            801..=804 => WeatherCondition::Clouds,
            _ => WeatherCondition::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::Clouds => "Cloudy",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Mist => "Mist",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Other => "Other",
        }
    }

    /// Whether this condition involves precipitation
    pub fn has_precipitation(&self) -> bool {
        matches!(
            self,
            WeatherCondition::Rain
                | WeatherCondition::Drizzle
                | WeatherCondition::Thunderstorm
                | WeatherCondition::Snow
        )
    }
}

impl std::fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
