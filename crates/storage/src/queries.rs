//! Query builders for each scene, paired with decoders for their results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{BoroughRecord, CovidRecord, DateRange, Metric},
    error::LoadError,
};

use crate::{Database, QueryTask, ResultSet};

const RECORD_COLUMNS: &str = "date, borough, retail_and_recreation, grocery_and_pharmacy, parks, \
     transit_stations, workplaces, residential, new_cases, total_cases, new_deaths, total_deaths";

fn ranged(database: &Database, sql: String, range: DateRange) -> QueryTask {
    QueryTask::prepared(database, sql)
        .bind(range.start())
        .bind(range.end())
}

pub fn available_dates(database: &Database) -> QueryTask {
    QueryTask::prepared(
        database,
        "SELECT DISTINCT date FROM covid_london ORDER BY date ASC".to_string(),
    )
}

pub fn decode_dates(rows: &ResultSet) -> Result<Vec<NaiveDate>, LoadError> {
    let mut dates = rows
        .rows()
        .iter()
        .map(|row| row.date(0))
        .collect::<Result<Vec<_>, _>>()?;
    dates.dedup();
    Ok(dates)
}

pub fn borough_totals(database: &Database, range: DateRange) -> QueryTask {
    ranged(
        database,
        "SELECT borough, \
                COALESCE(SUM(new_cases), 0) AS total_cases, \
                COALESCE(SUM(new_deaths), 0) AS total_deaths \
         FROM covid_london \
         WHERE date BETWEEN ? AND ? \
         GROUP BY borough \
         ORDER BY borough"
            .to_string(),
        range,
    )
}

pub fn decode_borough_totals(rows: &ResultSet) -> Result<Vec<BoroughRecord>, LoadError> {
    rows.rows()
        .iter()
        .map(|row| {
            Ok(BoroughRecord {
                name: row.text(0)?.to_string(),
                total_cases: row.i64(1)?,
                total_deaths: row.i64(2)?,
            })
        })
        .collect()
}

pub fn period_deaths(database: &Database, range: DateRange) -> QueryTask {
    ranged(
        database,
        "SELECT COALESCE(SUM(new_deaths), 0) AS period_deaths \
         FROM covid_london \
         WHERE date BETWEEN ? AND ?"
            .to_string(),
        range,
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LondonStatistics {
    pub avg_retail_and_recreation: Option<f64>,
    pub avg_workplaces: Option<f64>,
    pub period_deaths: i64,
    pub avg_total_cases: Option<f64>,
}

pub fn london_statistics(database: &Database, range: DateRange) -> QueryTask {
    ranged(
        database,
        "SELECT AVG(retail_and_recreation) AS avg_retail_and_recreation, \
                AVG(workplaces) AS avg_workplaces, \
                COALESCE(SUM(new_deaths), 0) AS period_deaths, \
                AVG(total_cases) AS avg_total_cases \
         FROM covid_london \
         WHERE date BETWEEN ? AND ?"
            .to_string(),
        range,
    )
}

pub fn decode_london_statistics(rows: &ResultSet) -> Result<LondonStatistics, LoadError> {
    let row = rows.first_row("london statistics")?;
    Ok(LondonStatistics {
        avg_retail_and_recreation: row.opt_f64(0)?,
        avg_workplaces: row.opt_f64(1)?,
        period_deaths: row.i64(2)?,
        avg_total_cases: row.opt_f64(3)?,
    })
}

pub fn borough_names(database: &Database) -> QueryTask {
    QueryTask::prepared(
        database,
        "SELECT DISTINCT borough FROM covid_london ORDER BY borough".to_string(),
    )
}

pub fn decode_names(rows: &ResultSet) -> Result<Vec<String>, LoadError> {
    rows.rows()
        .iter()
        .map(|row| row.text(0).map(str::to_string))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

pub fn monthly_total_deaths(database: &Database, range: DateRange, borough: &str) -> QueryTask {
    ranged(
        database,
        "SELECT strftime('%Y-%m', date) AS month, MAX(total_deaths) AS total_deaths \
         FROM covid_london \
         WHERE date BETWEEN ? AND ? AND borough = ? \
         GROUP BY month \
         ORDER BY month"
            .to_string(),
        range,
    )
    .bind(borough)
}

pub fn metric_by_borough(database: &Database, range: DateRange, metric: Metric) -> QueryTask {
    ranged(
        database,
        format!(
            "SELECT borough, AVG({column}) AS average \
             FROM covid_london \
             WHERE date BETWEEN ? AND ? \
             GROUP BY borough \
             ORDER BY borough",
            column = metric.column()
        ),
        range,
    )
}

/// Decodes `(label, value)` rows. Rows whose value is NULL (no data for the
/// label) are skipped rather than plotted as zero.
pub fn decode_series(rows: &ResultSet) -> Result<Vec<SeriesPoint>, LoadError> {
    let mut points = Vec::with_capacity(rows.len());
    for row in rows.rows() {
        let Some(value) = row.opt_f64(1)? else {
            continue;
        };
        points.push(SeriesPoint {
            label: row.text(0)?.to_string(),
            value,
        });
    }
    Ok(points)
}

pub fn borough_records(database: &Database, range: DateRange, borough: &str) -> QueryTask {
    ranged(
        database,
        format!(
            "SELECT {columns} \
             FROM covid_london \
             WHERE date BETWEEN ? AND ? AND borough = ? \
             ORDER BY date ASC",
            columns = RECORD_COLUMNS
        ),
        range,
    )
    .bind(borough)
}

pub fn decode_covid_records(rows: &ResultSet) -> Result<Vec<CovidRecord>, LoadError> {
    rows.rows()
        .iter()
        .map(|row| {
            Ok(CovidRecord {
                date: row.date(0)?,
                borough: row.text(1)?.to_string(),
                retail_and_recreation: row.opt_i64(2)?,
                grocery_and_pharmacy: row.opt_i64(3)?,
                parks: row.opt_i64(4)?,
                transit_stations: row.opt_i64(5)?,
                workplaces: row.opt_i64(6)?,
                residential: row.opt_i64(7)?,
                new_cases: row.i64(8)?,
                total_cases: row.i64(9)?,
                new_deaths: row.i64(10)?,
                total_deaths: row.i64(11)?,
            })
        })
        .collect()
}
