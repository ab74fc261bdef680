use chrono::NaiveDate;
use shared::{
    domain::{CovidRecord, DateRange},
    error::LoadError,
};
use storage::{queries, Database};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn record(day: NaiveDate, borough: &str, new_deaths: i64, total_deaths: i64) -> CovidRecord {
    CovidRecord {
        date: day,
        borough: borough.to_string(),
        retail_and_recreation: Some(-40),
        grocery_and_pharmacy: None,
        parks: Some(12),
        transit_stations: None,
        workplaces: Some(-55),
        residential: Some(14),
        new_cases: 100,
        total_cases: 1000,
        new_deaths,
        total_deaths,
    }
}

#[tokio::test]
async fn reopened_database_serves_imported_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!(
        "sqlite://{}",
        dir.path().join("covid.db").to_string_lossy().replace('\\', "/")
    );

    let rows = vec![
        record(date(2020, 3, 1), "Camden", 2, 2),
        record(date(2020, 3, 2), "Camden", 3, 5),
        record(date(2020, 3, 1), "Hackney", 0, 0),
        record(date(2020, 3, 2), "Hackney", 1, 1),
    ];
    let created = Database::create(&url).await.expect("create");
    assert_eq!(created.insert_records(&rows).await.expect("insert"), 4);
    // Replacing an existing (date, borough) row keeps one copy.
    created
        .insert_records(&rows[..1])
        .await
        .expect("insert again");

    let database = Database::new(&url).expect("reopen");
    let range = DateRange::new(date(2020, 3, 1), date(2020, 3, 2)).expect("range");

    let totals = queries::decode_borough_totals(
        &queries::borough_totals(&database, range)
            .run()
            .await
            .expect("totals"),
    )
    .expect("decode totals");
    let camden = totals.iter().find(|row| row.name == "Camden").expect("camden");
    assert_eq!(camden.total_deaths, 5);
    assert_eq!(camden.total_cases, 200);

    let camden_rows = queries::decode_covid_records(
        &queries::borough_records(&database, range, "Camden")
            .run()
            .await
            .expect("records"),
    )
    .expect("decode records");
    assert_eq!(camden_rows, rows[..2].to_vec());

    let stats = database.connection_stats();
    assert_eq!(stats.opened, stats.closed);
}

#[tokio::test]
async fn read_path_never_creates_a_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("never.db");
    let database = Database::new(&format!("sqlite://{}", path.display())).expect("url");

    let err = database.health_check().await.expect_err("missing file");
    assert!(matches!(err, LoadError::Connection(_)), "{err}");
    assert!(!path.exists());
}
