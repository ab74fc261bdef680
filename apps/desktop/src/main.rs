//! Headless front end: loads every scene for one date range and prints them
//! as JSON. The main thread is the UI thread.

mod config;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use scene_core::{
    scenes::{BoroughDetailScene, Chart},
    AppState, Application, ExecutorConfig, GateTransition, Scene,
};
use serde::Serialize;
use shared::domain::{DateRange, Metric, SceneId};
use storage::{BoroughBoundaries, Database};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Load London COVID-19 scenes for a date range and print them as JSON")]
struct Args {
    /// Config file (defaults to ./covid_london.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    /// First day of the range (YYYY-MM-DD). Defaults to the first day with data.
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last day of the range (YYYY-MM-DD). Defaults to the last day with data.
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Also load the per-borough detail view.
    #[arg(long)]
    borough: Option<String>,
    /// Replace the graph with a bar chart of this column, e.g. `parks`.
    #[arg(long)]
    bar_metric: Option<Metric>,
    /// Borough outline file.
    #[arg(long)]
    boundaries: Option<PathBuf>,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[derive(Serialize)]
struct Report<'a> {
    range: DateRange,
    welcome: Option<&'a Scene>,
    map: Option<&'a Scene>,
    stats: Option<&'a Scene>,
    graph: Option<&'a Scene>,
    detail: Option<&'a BoroughDetailScene>,
    last_error: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = &args.database_url {
        settings.database_url = config::normalize_database_url(url);
    }
    if let Some(path) = &args.boundaries {
        settings.boundaries_path = Some(path.clone());
    }

    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let boundaries = match &settings.boundaries_path {
        Some(path) => BoroughBoundaries::load(path)
            .with_context(|| format!("failed to load borough boundaries from '{}'", path.display()))?,
        None => BoroughBoundaries::default(),
    };

    let mut database = Database::new(&settings.database_url)
        .with_context(|| format!("invalid database url '{}'", settings.database_url))?;
    if let Some(timeout) = settings.query_timeout() {
        database = database.with_query_timeout(timeout);
    }

    let mut app = Application::start(
        database,
        boundaries,
        ExecutorConfig {
            workers: settings.query_workers,
            queue_capacity: settings.queue_capacity,
        },
    )
    .context("failed to start query executor")?;

    let outcome = run(&mut app, &args);
    app.shutdown();
    outcome
}

fn run(app: &mut Application, args: &Args) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout_secs);

    let loaded = app.run_until(timeout, |state| {
        state.welcome_loaded() || state.last_error().is_some()
    });
    if let Some(err) = app.state_mut().take_last_error() {
        return Err(err).context("failed to load available dates");
    }
    if !loaded {
        bail!("timed out after {}s waiting for available dates", args.timeout_secs);
    }

    let (first, last) = available_bounds(app.state())?;
    let start = args.start.unwrap_or(first);
    let end = args.end.unwrap_or(last);

    let committed = match app.select_dates(Some(start), Some(end)) {
        GateTransition::Committed(committed) => committed,
        GateTransition::Unchanged => bail!("date range {start} to {end} is already loaded"),
        GateTransition::Waiting => bail!("start date {start} is after end date {end}"),
    };
    info!(range = %committed.range, "loading scenes");

    if !app.run_until(timeout, AppState::is_settled) {
        bail!("timed out after {}s waiting for scenes", args.timeout_secs);
    }

    if let Some(metric) = args.bar_metric {
        if app.state_mut().show_bar_chart(metric) {
            let shown = app.run_until(timeout, |state| graph_shows(state, metric));
            if !shown {
                warn!(metric = metric.column(), "bar chart did not load in time");
            }
        }
    }

    if let Some(borough) = &args.borough {
        if app.state_mut().request_borough_detail(borough) {
            let shown = app.run_until(timeout, |state| {
                state.detail().is_some() || state.last_error().is_some()
            });
            if !shown {
                warn!(%borough, "borough detail did not load in time");
            }
        }
    }

    let state = app.state();
    let welcome = state.scene(SceneId::Welcome);
    let map = state.scene(SceneId::Map);
    let stats = state.scene(SceneId::Stats);
    let graph = state.scene(SceneId::Graph);
    let report = Report {
        range: committed.range,
        welcome: welcome.as_deref(),
        map: map.as_deref(),
        stats: stats.as_deref(),
        graph: graph.as_deref(),
        detail: state.detail(),
        last_error: state.last_error().map(ToString::to_string),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn available_bounds(state: &AppState) -> Result<(NaiveDate, NaiveDate)> {
    let welcome = state
        .scene(SceneId::Welcome)
        .context("welcome scene missing")?;
    let dates = welcome
        .as_welcome()
        .context("welcome slot holds another scene")?;
    match (dates.first_date(), dates.last_date()) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => bail!("the database holds no dated records"),
    }
}

fn graph_shows(state: &AppState, metric: Metric) -> bool {
    if state.last_error().is_some() {
        return true;
    }
    state.scene(SceneId::Graph).is_some_and(|scene| {
        matches!(
            scene.as_graph().and_then(|graph| graph.chart.as_ref()),
            Some(Chart::Bar { metric: shown, .. }) if *shown == metric
        )
    })
}
