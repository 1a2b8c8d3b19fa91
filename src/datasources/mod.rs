pub mod openweathermap;
pub mod postgres;

pub use openweathermap::OpenWeatherMapClient;
pub use postgres::PostgresStore;

use chrono::NaiveDate;

use crate::error::Result;

/// Weather capability consumed by the generation engine: an ordered list
/// of upcoming days suitable for outdoor work, best first. Errors are
/// treated by the engine as "no optimization", never as a hard failure.
#[allow(async_fn_in_trait)]
pub trait ForecastProvider {
    async fn best_outdoor_days(&self, latitude: f64, longitude: f64) -> Result<Vec<NaiveDate>>;
}

/// Placeholder provider for runs without a configured weather source.
pub struct NoForecast;

impl ForecastProvider for NoForecast {
    async fn best_outdoor_days(&self, _latitude: f64, _longitude: f64) -> Result<Vec<NaiveDate>> {
        Ok(Vec::new())
    }
}
