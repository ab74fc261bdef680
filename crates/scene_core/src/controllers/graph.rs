use shared::{domain::Metric, error::LoadError};
use storage::{queries, Database, ResultSet};

use crate::{
    dispatcher::UiDispatcher,
    gate::CommittedRange,
    scenes::{Chart, GraphScene},
};

/// Loads the borough list, then the monthly deaths line for the first
/// borough as the initial chart.
pub fn request_graph<S, F>(
    dispatcher: &UiDispatcher<S>,
    database: &Database,
    committed: CommittedRange,
    on_done: F,
) where
    S: 'static,
    F: FnOnce(&mut S, Result<GraphScene, LoadError>) + Send + 'static,
{
    let executor = dispatcher.executor().clone();
    let database = database.clone();
    dispatcher.dispatch_when_ready(
        async move {
            let names = executor.submit(queries::borough_names(&database))?.await?;
            let scene = build_graph_scene(committed, &names)?;

            let Some(first) = scene.boroughs.first() else {
                return Ok(scene);
            };
            let series = executor
                .submit(queries::monthly_total_deaths(&database, committed.range, first))?
                .await?;
            let chart = line_chart(first, &series)?;
            Ok::<_, LoadError>(scene.with_chart(chart))
        },
        on_done,
    );
}

pub fn build_graph_scene(
    committed: CommittedRange,
    names: &ResultSet,
) -> Result<GraphScene, LoadError> {
    Ok(GraphScene {
        range: committed.range,
        generation: committed.generation,
        boroughs: queries::decode_names(names)?,
        metrics: Metric::ALL.to_vec(),
        chart: None,
    })
}

pub fn request_line_chart<S, F>(
    dispatcher: &UiDispatcher<S>,
    database: &Database,
    base: GraphScene,
    borough: String,
    on_done: F,
) where
    S: 'static,
    F: FnOnce(&mut S, Result<GraphScene, LoadError>) + Send + 'static,
{
    let executor = dispatcher.executor().clone();
    let database = database.clone();
    dispatcher.dispatch_when_ready(
        async move {
            let series = executor
                .submit(queries::monthly_total_deaths(&database, base.range, &borough))?
                .await?;
            Ok::<_, LoadError>(base.with_chart(line_chart(&borough, &series)?))
        },
        on_done,
    );
}

pub fn request_bar_chart<S, F>(
    dispatcher: &UiDispatcher<S>,
    database: &Database,
    base: GraphScene,
    metric: Metric,
    on_done: F,
) where
    S: 'static,
    F: FnOnce(&mut S, Result<GraphScene, LoadError>) + Send + 'static,
{
    let executor = dispatcher.executor().clone();
    let database = database.clone();
    dispatcher.dispatch_when_ready(
        async move {
            let series = executor
                .submit(queries::metric_by_borough(&database, base.range, metric))?
                .await?;
            let points = queries::decode_series(&series)?;
            Ok::<_, LoadError>(base.with_chart(Chart::Bar {
                metric,
                title: metric.label().to_string(),
                points,
            }))
        },
        on_done,
    );
}

fn line_chart(borough: &str, series: &ResultSet) -> Result<Chart, LoadError> {
    Ok(Chart::Line {
        borough: borough.to_string(),
        points: queries::decode_series(series)?,
    })
}
