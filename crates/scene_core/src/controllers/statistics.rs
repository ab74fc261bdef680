use shared::error::LoadError;
use storage::{queries, Database, ResultSet};

use crate::{
    dispatcher::UiDispatcher,
    gate::CommittedRange,
    scenes::{round2, StatPanel, StatsScene},
};

const PANEL_TITLES: [&str; 4] = [
    "Average Retail and Recreation GMR",
    "Average Workplace GMR",
    "Deaths in the Period",
    "Average Total Cases",
];

pub fn request_stats<S, F>(
    dispatcher: &UiDispatcher<S>,
    database: &Database,
    committed: CommittedRange,
    on_done: F,
) where
    S: 'static,
    F: FnOnce(&mut S, Result<StatsScene, LoadError>) + Send + 'static,
{
    let executor = dispatcher.executor().clone();
    let database = database.clone();
    dispatcher.dispatch_when_ready(
        async move {
            let rows = executor
                .submit(queries::london_statistics(&database, committed.range))?
                .await?;
            build_stats_scene(committed, &rows)
        },
        on_done,
    );
}

pub fn build_stats_scene(
    committed: CommittedRange,
    rows: &ResultSet,
) -> Result<StatsScene, LoadError> {
    let stats = queries::decode_london_statistics(rows)?;
    let values = [
        stats.avg_retail_and_recreation,
        stats.avg_workplaces,
        Some(stats.period_deaths as f64),
        stats.avg_total_cases,
    ];

    let panels = PANEL_TITLES
        .iter()
        .zip(values)
        .map(|(title, value)| StatPanel {
            title: (*title).to_string(),
            value: value.map(round2),
        })
        .collect();

    Ok(StatsScene {
        range: committed.range,
        generation: committed.generation,
        panels,
    })
}

#[cfg(test)]
mod tests {
    use shared::domain::DateRange;
    use storage::{Row, Value};

    use super::*;
    use crate::test_support::date;

    fn scene() -> StatsScene {
        let rows = ResultSet::new(
            vec![
                "avg_retail_and_recreation".into(),
                "avg_workplaces".into(),
                "period_deaths".into(),
                "avg_total_cases".into(),
            ],
            vec![Row::new(vec![
                Value::Real(-12.3456),
                Value::Null,
                Value::Integer(42),
                Value::Real(1000.005),
            ])],
        );
        let committed = CommittedRange {
            range: DateRange::new(date(2022, 1, 1), date(2022, 1, 2)).expect("range"),
            generation: 1,
        };
        build_stats_scene(committed, &rows).expect("scene")
    }

    #[test]
    fn panels_follow_display_order_and_round() {
        let scene = scene();
        let titles: Vec<_> = scene.panels.iter().map(|panel| panel.title.as_str()).collect();
        assert_eq!(titles, PANEL_TITLES.to_vec());
        assert_eq!(scene.panels[0].value, Some(-12.35));
        assert_eq!(scene.panels[1].value, None);
        assert_eq!(scene.panels[2].value, Some(42.0));
    }

    #[test]
    fn panels_wrap_in_both_directions() {
        let scene = scene();
        assert_eq!(scene.panel(4), scene.panel(0));
        assert_eq!(scene.panel(-1), scene.panel(3));
        assert_eq!(scene.panel(-5), scene.panel(3));
        assert_eq!(
            scene.panel(2).map(|panel| panel.title.as_str()),
            Some("Deaths in the Period")
        );
    }
}
