use std::sync::Arc;

use shared::{
    choropleth::{colour_for, death_share},
    error::LoadError,
};
use storage::{queries, BoroughBoundaries, Database, ResultSet};

use crate::{
    dispatcher::UiDispatcher,
    gate::CommittedRange,
    scenes::{BoroughTile, MapScene},
};

/// Per-borough totals and the period death count run as two concurrent
/// queries; the scene is built once both have arrived.
pub fn request_map<S, F>(
    dispatcher: &UiDispatcher<S>,
    database: &Database,
    committed: CommittedRange,
    boundaries: Arc<BoroughBoundaries>,
    on_done: F,
) where
    S: 'static,
    F: FnOnce(&mut S, Result<MapScene, LoadError>) + Send + 'static,
{
    let executor = dispatcher.executor().clone();
    let database = database.clone();
    dispatcher.dispatch_when_ready(
        async move {
            let totals = executor.submit(queries::borough_totals(&database, committed.range))?;
            let deaths = executor.submit(queries::period_deaths(&database, committed.range))?;
            let (totals, deaths) = futures::try_join!(totals, deaths)?;
            build_map_scene(committed, &totals, &deaths, &boundaries)
        },
        on_done,
    );
}

pub fn build_map_scene(
    committed: CommittedRange,
    totals: &ResultSet,
    deaths: &ResultSet,
    boundaries: &BoroughBoundaries,
) -> Result<MapScene, LoadError> {
    let period_deaths = deaths.scalar_i64()?;
    let tiles = queries::decode_borough_totals(totals)?
        .into_iter()
        .map(|record| {
            let severity = colour_for(record.total_deaths, period_deaths);
            let outline = boundaries.outline(&record.name).map(<[_]>::to_vec);
            BoroughTile {
                share: death_share(record.total_deaths, period_deaths),
                severity,
                colour: severity.hex().to_string(),
                outline,
                record,
            }
        })
        .collect();

    Ok(MapScene {
        range: committed.range,
        generation: committed.generation,
        period_deaths,
        tiles,
    })
}

#[cfg(test)]
mod tests {
    use shared::{choropleth::Severity, domain::DateRange};
    use storage::{Row, Value};

    use super::*;
    use crate::test_support::date;

    fn committed() -> CommittedRange {
        CommittedRange {
            range: DateRange::new(date(2022, 1, 1), date(2022, 1, 31)).expect("range"),
            generation: 3,
        }
    }

    fn totals(rows: &[(&str, i64, i64)]) -> ResultSet {
        ResultSet::new(
            vec!["borough".into(), "total_cases".into(), "total_deaths".into()],
            rows.iter()
                .map(|(name, cases, deaths)| {
                    Row::new(vec![
                        Value::Text((*name).to_string()),
                        Value::Integer(*cases),
                        Value::Integer(*deaths),
                    ])
                })
                .collect(),
        )
    }

    fn scalar(value: i64) -> ResultSet {
        ResultSet::new(
            vec!["period_deaths".into()],
            vec![Row::new(vec![Value::Integer(value)])],
        )
    }

    #[test]
    fn tiles_are_coloured_by_share_of_period_deaths() {
        let boundaries: BoroughBoundaries = "Camden:1,1 2,2".parse().expect("boundaries");
        let scene = build_map_scene(
            committed(),
            &totals(&[("Camden", 900, 25), ("Hackney", 800, 5), ("Lambeth", 700, 40)]),
            &scalar(1000),
            &boundaries,
        )
        .expect("scene");

        assert_eq!(scene.generation, 3);
        assert_eq!(scene.period_deaths, 1000);
        let camden = scene.tile("Camden").expect("camden");
        assert_eq!(camden.severity, Severity::Orange);
        assert_eq!(camden.colour, Severity::Orange.hex());
        assert_eq!(camden.outline.as_deref(), Some(&[(1.0, 1.0), (2.0, 2.0)][..]));
        assert_eq!(scene.tile("Hackney").map(|tile| tile.severity), Some(Severity::Green));
        assert_eq!(scene.tile("Lambeth").map(|tile| tile.severity), Some(Severity::DarkRed));
        assert!(scene.tile("Lambeth").and_then(|tile| tile.outline.as_ref()).is_none());
    }

    #[test]
    fn zero_period_deaths_paints_everything_green() {
        let scene = build_map_scene(
            committed(),
            &totals(&[("Camden", 10, 3), ("Hackney", 5, 0)]),
            &scalar(0),
            &BoroughBoundaries::default(),
        )
        .expect("scene");

        assert!(scene.tiles.iter().all(|tile| tile.severity == Severity::Green));
    }

    #[test]
    fn missing_period_total_is_an_empty_result() {
        let err = build_map_scene(
            committed(),
            &totals(&[]),
            &ResultSet::default(),
            &BoroughBoundaries::default(),
        )
        .expect_err("no scalar row");
        assert!(matches!(err, LoadError::EmptyResult(_)));
    }
}
