use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeType {
    SingleFamily,
    Townhouse,
    Condo,
    Apartment,
    MobileHome,
    MultiFamily,
}

impl HomeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomeType::SingleFamily => "single_family",
            HomeType::Townhouse => "townhouse",
            HomeType::Condo => "condo",
            HomeType::Apartment => "apartment",
            HomeType::MobileHome => "mobile_home",
            HomeType::MultiFamily => "multi_family",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single_family" | "singlefamily" | "single family" | "house" => {
                Some(HomeType::SingleFamily)
            }
            "townhouse" | "town house" | "townhome" => Some(HomeType::Townhouse),
            "condo" | "condominium" => Some(HomeType::Condo),
            "apartment" | "flat" => Some(HomeType::Apartment),
            "mobile_home" | "mobilehome" | "mobile home" => Some(HomeType::MobileHome),
            "multi_family" | "multifamily" | "multi family" | "duplex" => {
                Some(HomeType::MultiFamily)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for HomeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Assumed age when a home's construction year is unknown.
pub const DEFAULT_HOME_AGE_YEARS: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeProfile {
    pub id: Option<i64>,
    pub name: String,
    pub home_type: HomeType,
    pub year_built: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Climate tags such as "humid", "coastal", "cold_winter".
    pub climate: Option<Vec<String>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl HomeProfile {
    pub fn new(name: String, home_type: HomeType) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: None,
            name,
            home_type,
            year_built: None,
            latitude: None,
            longitude: None,
            climate: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Home age in years as of the given date, defaulting when unknown.
    pub fn age_years(&self, today: NaiveDate) -> u32 {
        match self.year_built {
            Some(year) => (today.year() - year).max(0) as u32,
            None => DEFAULT_HOME_AGE_YEARS,
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}
