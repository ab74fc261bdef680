//! Scene models handed to the renderer.

use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    choropleth::Severity,
    domain::{BoroughRecord, CovidRecord, DateRange, Metric, SceneId},
};
use storage::queries::SeriesPoint;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scene", rename_all = "snake_case")]
pub enum Scene {
    Welcome(WelcomeScene),
    Map(MapScene),
    Stats(StatsScene),
    Graph(GraphScene),
}

impl Scene {
    pub fn id(&self) -> SceneId {
        match self {
            Scene::Welcome(_) => SceneId::Welcome,
            Scene::Map(_) => SceneId::Map,
            Scene::Stats(_) => SceneId::Stats,
            Scene::Graph(_) => SceneId::Graph,
        }
    }

    /// Commit generation the scene was built for; `None` for the welcome
    /// scene, which does not depend on the date range.
    pub fn generation(&self) -> Option<u64> {
        match self {
            Scene::Welcome(_) => None,
            Scene::Map(scene) => Some(scene.generation),
            Scene::Stats(scene) => Some(scene.generation),
            Scene::Graph(scene) => Some(scene.generation),
        }
    }

    pub fn as_welcome(&self) -> Option<&WelcomeScene> {
        match self {
            Scene::Welcome(scene) => Some(scene),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapScene> {
        match self {
            Scene::Map(scene) => Some(scene),
            _ => None,
        }
    }

    pub fn as_stats(&self) -> Option<&StatsScene> {
        match self {
            Scene::Stats(scene) => Some(scene),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<&GraphScene> {
        match self {
            Scene::Graph(scene) => Some(scene),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WelcomeScene {
    pub dates: Vec<NaiveDate>,
    pub loading: bool,
}

impl WelcomeScene {
    pub fn loading() -> Self {
        Self {
            dates: Vec::new(),
            loading: true,
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoroughTile {
    pub record: BoroughRecord,
    pub share: f64,
    pub severity: Severity,
    pub colour: String,
    pub outline: Option<Vec<(f64, f64)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapScene {
    pub range: DateRange,
    pub generation: u64,
    pub period_deaths: i64,
    pub tiles: Vec<BoroughTile>,
}

impl MapScene {
    pub fn tile(&self, borough: &str) -> Option<&BoroughTile> {
        self.tiles.iter().find(|tile| tile.record.name == borough)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatPanel {
    pub title: String,
    /// Rounded to two decimal places. `None` when the range has no data.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsScene {
    pub range: DateRange,
    pub generation: u64,
    pub panels: Vec<StatPanel>,
}

impl StatsScene {
    /// Panel at `index`, wrapping in both directions: `-1` is the last panel.
    pub fn panel(&self, index: i64) -> Option<&StatPanel> {
        if self.panels.is_empty() {
            return None;
        }
        let len = self.panels.len() as i64;
        self.panels.get(index.rem_euclid(len) as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    Line {
        borough: String,
        points: Vec<SeriesPoint>,
    },
    Bar {
        metric: Metric,
        title: String,
        points: Vec<SeriesPoint>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphScene {
    pub range: DateRange,
    pub generation: u64,
    pub boroughs: Vec<String>,
    pub metrics: Vec<Metric>,
    pub chart: Option<Chart>,
}

impl GraphScene {
    pub fn with_chart(&self, chart: Chart) -> Self {
        Self {
            chart: Some(chart),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoroughDetailScene {
    pub range: DateRange,
    pub generation: u64,
    pub borough: String,
    pub records: Vec<CovidRecord>,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
