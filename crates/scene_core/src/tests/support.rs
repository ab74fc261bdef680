use chrono::NaiveDate;
use shared::error::LoadError;
use storage::{demo::demo_records, Database};

pub(crate) const SEED_DAYS: u32 = 90;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Temp SQLite file holding `SEED_DAYS` of demo data from 2022-01-01.
pub(crate) fn seeded_database() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!(
        "sqlite://{}",
        dir.path().join("covid.db").to_string_lossy().replace('\\', "/")
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("seed runtime");
    let database = runtime
        .block_on(async {
            let database = Database::create(&url).await?;
            database
                .insert_records(&demo_records(date(2022, 1, 1), SEED_DAYS))
                .await?;
            Ok::<_, LoadError>(database)
        })
        .expect("seed database");

    (dir, database)
}

/// Runs `task` to completion on a throwaway runtime.
pub(crate) fn run_inline(task: storage::QueryTask) -> Result<storage::ResultSet, LoadError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("inline runtime")
        .block_on(task.run())
}
