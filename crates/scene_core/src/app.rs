//! Composition root: wires the executor, UI queue, gate, and scene registry
//! together and owns the UI-thread state.

use std::{collections::BTreeSet, io, sync::Arc, time::Duration};

use chrono::NaiveDate;
use shared::{
    domain::{Metric, SceneId},
    error::LoadError,
};
use storage::{BoroughBoundaries, Database};
use tracing::{debug, error, info, warn};

use crate::{
    controllers,
    dispatcher::{ui_channel, UiDispatcher, UiQueue},
    executor::{AsyncExecutor, ExecutorConfig},
    gate::{CommittedRange, DateRangeGate, GateTransition},
    registry::SceneRegistry,
    scenes::{BoroughDetailScene, GraphScene, Scene, WelcomeScene},
};

pub struct AppState {
    registry: SceneRegistry,
    detail: Option<BoroughDetailScene>,
    last_error: Option<LoadError>,
    gate: Arc<DateRangeGate>,
    dispatcher: UiDispatcher<AppState>,
    database: Database,
    boundaries: Arc<BoroughBoundaries>,
    had_commit: bool,
    handled_generation: Option<u64>,
    pending: BTreeSet<SceneId>,
    chart_request: u64,
    detail_request: u64,
}

impl AppState {
    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn scene(&self, id: SceneId) -> Option<Arc<Scene>> {
        self.registry.get(id)
    }

    pub fn detail(&self) -> Option<&BoroughDetailScene> {
        self.detail.as_ref()
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<LoadError> {
        self.last_error.take()
    }

    pub fn gate(&self) -> &DateRangeGate {
        &self.gate
    }

    pub fn welcome_loaded(&self) -> bool {
        self.registry
            .get(SceneId::Welcome)
            .is_some_and(|scene| scene.as_welcome().is_some_and(|welcome| !welcome.loading))
    }

    /// Every scene requested for the latest commit has landed or failed.
    pub fn is_settled(&self) -> bool {
        match self.handled_generation {
            Some(generation) => self.gate.is_current(generation) && self.pending.is_empty(),
            None => false,
        }
    }

    fn on_welcome_loaded(&mut self, result: Result<WelcomeScene, LoadError>) {
        match result {
            Ok(welcome) => {
                info!(dates = welcome.dates.len(), "welcome scene loaded");
                self.registry.put(Scene::Welcome(welcome));
            }
            Err(err) => self.record_failure(SceneId::Welcome.as_str(), err),
        }
    }

    fn on_range_committed(&mut self, committed: CommittedRange) {
        if !self.gate.is_current(committed.generation)
            || self.handled_generation == Some(committed.generation)
        {
            debug!(generation = committed.generation, "skipping superseded or handled commit");
            return;
        }

        if self.had_commit {
            let removed = self.registry.invalidate_date_dependent();
            info!(?removed, generation = committed.generation, "date range changed");
        }
        self.had_commit = true;
        self.handled_generation = Some(committed.generation);
        self.pending = SceneId::DATE_DEPENDENT.into_iter().collect();
        if self
            .detail
            .as_ref()
            .is_some_and(|detail| detail.range != committed.range)
        {
            self.detail = None;
        }

        let generation = committed.generation;
        controllers::request_map(
            &self.dispatcher,
            &self.database,
            committed,
            Arc::clone(&self.boundaries),
            move |state: &mut AppState, result| {
                state.install(SceneId::Map, generation, result.map(Scene::Map))
            },
        );
        controllers::request_stats(
            &self.dispatcher,
            &self.database,
            committed,
            move |state: &mut AppState, result| {
                state.install(SceneId::Stats, generation, result.map(Scene::Stats))
            },
        );
        controllers::request_graph(
            &self.dispatcher,
            &self.database,
            committed,
            move |state: &mut AppState, result| {
                state.install(SceneId::Graph, generation, result.map(Scene::Graph))
            },
        );
    }

    /// Drops results built for a superseded commit.
    fn install(&mut self, id: SceneId, generation: u64, result: Result<Scene, LoadError>) {
        if !self.gate.is_current(generation) {
            debug!(scene = %id, generation, "discarding stale scene result");
            return;
        }
        self.pending.remove(&id);

        match result {
            Ok(scene) => {
                info!(scene = %id, generation, "scene installed");
                self.registry.put(scene);
            }
            Err(err) => self.record_failure(id.as_str(), err),
        }
    }

    fn record_failure(&mut self, what: &str, err: LoadError) {
        if err.is_fatal() {
            error!(scene = what, "scene load failed: {err}");
        } else {
            warn!(scene = what, "scene load failed: {err}");
        }
        self.last_error = Some(err);
    }

    /// Returns false when there is no graph scene to update.
    pub fn show_line_chart(&mut self, borough: &str) -> bool {
        let Some(base) = self.graph_base() else {
            return false;
        };
        let (generation, request) = (base.generation, self.next_chart_request());
        controllers::request_line_chart(
            &self.dispatcher,
            &self.database,
            base,
            borough.to_string(),
            move |state: &mut AppState, result| state.install_chart(generation, request, result),
        );
        true
    }

    pub fn show_bar_chart(&mut self, metric: Metric) -> bool {
        let Some(base) = self.graph_base() else {
            return false;
        };
        let (generation, request) = (base.generation, self.next_chart_request());
        controllers::request_bar_chart(
            &self.dispatcher,
            &self.database,
            base,
            metric,
            move |state: &mut AppState, result| state.install_chart(generation, request, result),
        );
        true
    }

    /// Returns false when no range is committed.
    pub fn request_borough_detail(&mut self, borough: &str) -> bool {
        let Some(committed) = self.gate.current() else {
            return false;
        };
        self.detail_request += 1;
        let request = self.detail_request;
        controllers::request_borough_detail(
            &self.dispatcher,
            &self.database,
            committed,
            borough.to_string(),
            move |state: &mut AppState, result| {
                state.install_detail(committed.generation, request, result)
            },
        );
        true
    }

    fn graph_base(&self) -> Option<GraphScene> {
        self.registry
            .get(SceneId::Graph)
            .and_then(|scene| scene.as_graph().cloned())
    }

    fn next_chart_request(&mut self) -> u64 {
        self.chart_request += 1;
        self.chart_request
    }

    /// Only the latest chart request may replace the graph.
    fn install_chart(
        &mut self,
        generation: u64,
        request: u64,
        result: Result<GraphScene, LoadError>,
    ) {
        if request != self.chart_request {
            debug!(request, latest = self.chart_request, "discarding superseded chart");
            return;
        }
        self.install(SceneId::Graph, generation, result.map(Scene::Graph));
    }

    fn install_detail(
        &mut self,
        generation: u64,
        request: u64,
        result: Result<BoroughDetailScene, LoadError>,
    ) {
        if request != self.detail_request || !self.gate.is_current(generation) {
            debug!(request, generation, "discarding superseded borough detail");
            return;
        }
        match result {
            Ok(detail) => self.detail = Some(detail),
            Err(err) => self.record_failure("borough_detail", err),
        }
    }
}

/// The thread that pumps the queue is the UI thread.
pub struct Application {
    state: AppState,
    queue: UiQueue<AppState>,
    executor: AsyncExecutor,
}

impl Application {
    pub fn start(
        database: Database,
        boundaries: BoroughBoundaries,
        config: ExecutorConfig,
    ) -> io::Result<Self> {
        let executor = AsyncExecutor::start(config)?;
        let (dispatcher, queue) = ui_channel::<AppState>(executor.handle());
        let gate = Arc::new(DateRangeGate::new());

        let mut registry = SceneRegistry::new();
        registry.put(Scene::Welcome(WelcomeScene::loading()));

        controllers::request_welcome(&dispatcher, &database, |state: &mut AppState, result| {
            state.on_welcome_loaded(result)
        });

        let mut listener = gate.arm();
        let forward = dispatcher.clone();
        executor.handle().spawn_detached(async move {
            while let Some(committed) = listener.next_commit().await {
                forward.run_on_ui_thread(move |state: &mut AppState| {
                    state.on_range_committed(committed)
                });
            }
            debug!("gate listener finished");
        });

        info!(boroughs_with_outlines = boundaries.len(), "application started");

        Ok(Self {
            state: AppState {
                registry,
                detail: None,
                last_error: None,
                gate,
                dispatcher,
                database,
                boundaries: Arc::new(boundaries),
                had_commit: false,
                handled_generation: None,
                pending: BTreeSet::new(),
                chart_request: 0,
                detail_request: 0,
            },
            queue,
            executor,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn scene(&self, id: SceneId) -> Option<Arc<Scene>> {
        self.state.scene(id)
    }

    pub fn select_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> GateTransition {
        self.state.gate.select(start, end)
    }

    pub fn select_start(&self, start: Option<NaiveDate>) -> GateTransition {
        self.state.gate.select_start(start)
    }

    pub fn select_end(&self, end: Option<NaiveDate>) -> GateTransition {
        self.state.gate.select_end(end)
    }

    pub fn pump(&mut self) -> usize {
        self.queue.pump(&mut self.state)
    }

    pub fn run_until<P>(&mut self, timeout: Duration, done: P) -> bool
    where
        P: FnMut(&AppState) -> bool,
    {
        self.queue.run_until(&mut self.state, timeout, done)
    }

    pub fn shutdown(self) {
        let Application {
            state,
            queue,
            executor,
        } = self;
        drop(queue);
        drop(state);
        executor.shutdown();
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
