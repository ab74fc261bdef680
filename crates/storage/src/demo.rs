//! Deterministic synthetic dataset used for local runs and tests.

use chrono::{Duration, NaiveDate};
use shared::domain::CovidRecord;

pub const DEMO_BOROUGHS: [&str; 6] = [
    "Barking And Dagenham",
    "Camden",
    "Hackney",
    "Islington",
    "Lambeth",
    "Westminster",
];

/// `days` consecutive days of records for every demo borough, starting at
/// `start`. Borough `n` (1-based) reports `10n + day % 7` new cases per day
/// and `n` new deaths on every third day.
pub fn demo_records(start: NaiveDate, days: u32) -> Vec<CovidRecord> {
    let mut records = Vec::with_capacity(DEMO_BOROUGHS.len() * days as usize);

    for (index, borough) in DEMO_BOROUGHS.iter().enumerate() {
        let weight = index as i64 + 1;
        let mut total_cases = 0;
        let mut total_deaths = 0;

        for day in 0..i64::from(days) {
            let new_cases = weight * 10 + day % 7;
            let new_deaths = if day % 3 == 0 { weight } else { 0 };
            total_cases += new_cases;
            total_deaths += new_deaths;

            records.push(CovidRecord {
                date: start + Duration::days(day),
                borough: (*borough).to_string(),
                retail_and_recreation: Some(-40 + day % 10 - weight),
                grocery_and_pharmacy: Some(-10 + day % 4),
                parks: Some(20 - weight * 2 + day % 6),
                transit_stations: Some(-55 + weight),
                workplaces: Some(-35 - day % 5),
                residential: Some(15 + weight),
                new_cases,
                total_cases,
                new_deaths,
                total_deaths,
            });
        }
    }

    records
}
