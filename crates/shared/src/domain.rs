use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Inclusive `start..=end`; [`DateRange::new`] rejects `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, LoadError> {
        if start > end {
            return Err(LoadError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a range from an optional selection pair. Missing ends or an
    /// inverted pair both read as "no range".
    pub fn from_selection(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end).ok(),
            _ => None,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start: NaiveDate,
            end: NaiveDate,
        }

        let raw = Raw::deserialize(deserializer)?;
        DateRange::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoroughRecord {
    pub name: String,
    pub total_cases: i64,
    pub total_deaths: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovidRecord {
    pub date: NaiveDate,
    pub borough: String,
    pub retail_and_recreation: Option<i64>,
    pub grocery_and_pharmacy: Option<i64>,
    pub parks: Option<i64>,
    pub transit_stations: Option<i64>,
    pub workplaces: Option<i64>,
    pub residential: Option<i64>,
    pub new_cases: i64,
    pub total_cases: i64,
    pub new_deaths: i64,
    pub total_deaths: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    RetailAndRecreation,
    GroceryAndPharmacy,
    Parks,
    TransitStations,
    Workplaces,
    Residential,
    NewCases,
    TotalCases,
    NewDeaths,
    TotalDeaths,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::RetailAndRecreation,
        Metric::GroceryAndPharmacy,
        Metric::Parks,
        Metric::TransitStations,
        Metric::Workplaces,
        Metric::Residential,
        Metric::NewCases,
        Metric::TotalCases,
        Metric::NewDeaths,
        Metric::TotalDeaths,
    ];

    /// Column name in `covid_london`. These are the only identifiers ever
    /// formatted into SQL text.
    pub fn column(self) -> &'static str {
        match self {
            Metric::RetailAndRecreation => "retail_and_recreation",
            Metric::GroceryAndPharmacy => "grocery_and_pharmacy",
            Metric::Parks => "parks",
            Metric::TransitStations => "transit_stations",
            Metric::Workplaces => "workplaces",
            Metric::Residential => "residential",
            Metric::NewCases => "new_cases",
            Metric::TotalCases => "total_cases",
            Metric::NewDeaths => "new_deaths",
            Metric::TotalDeaths => "total_deaths",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::RetailAndRecreation => "Retail & Recreation",
            Metric::GroceryAndPharmacy => "Grocery & Pharmacy",
            Metric::Parks => "Parks",
            Metric::TransitStations => "Transit Stations",
            Metric::Workplaces => "Workplaces",
            Metric::Residential => "Residential",
            Metric::NewCases => "New Cases",
            Metric::TotalCases => "Total Cases",
            Metric::NewDeaths => "New Deaths",
            Metric::TotalDeaths => "Total Deaths",
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Metric::ALL
            .into_iter()
            .find(|metric| metric.column().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown metric '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneId {
    Welcome,
    Map,
    Stats,
    Graph,
}

impl SceneId {
    pub const DATE_DEPENDENT: [SceneId; 3] = [SceneId::Map, SceneId::Stats, SceneId::Graph];

    pub fn as_str(self) -> &'static str {
        match self {
            SceneId::Welcome => "welcome",
            SceneId::Map => "map",
            SceneId::Stats => "stats",
            SceneId::Graph => "graph",
        }
    }

    pub fn is_date_dependent(self) -> bool {
        Self::DATE_DEPENDENT.contains(&self)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SceneId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "welcome" => Ok(SceneId::Welcome),
            "map" => Ok(SceneId::Map),
            "stats" => Ok(SceneId::Stats),
            "graph" => Ok(SceneId::Graph),
            other => Err(format!("unknown scene '{other}'")),
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
