use shared::domain::DateRange;

use super::*;
use crate::{
    scenes::{GraphScene, MapScene, StatsScene, WelcomeScene},
    test_support::date,
};

fn range() -> DateRange {
    DateRange::new(date(2022, 1, 1), date(2022, 1, 31)).expect("range")
}

fn populated() -> SceneRegistry {
    let mut registry = SceneRegistry::new();
    registry.put(Scene::Welcome(WelcomeScene::loading()));
    registry.put(Scene::Map(MapScene {
        range: range(),
        generation: 1,
        period_deaths: 0,
        tiles: Vec::new(),
    }));
    registry.put(Scene::Stats(StatsScene {
        range: range(),
        generation: 1,
        panels: Vec::new(),
    }));
    registry.put(Scene::Graph(GraphScene {
        range: range(),
        generation: 1,
        boroughs: Vec::new(),
        metrics: Vec::new(),
        chart: None,
    }));
    registry
}

#[test]
fn put_keys_scene_by_its_own_id() {
    let registry = populated();
    assert_eq!(registry.len(), 4);
    assert_eq!(
        registry.ids(),
        vec![SceneId::Welcome, SceneId::Map, SceneId::Stats, SceneId::Graph]
    );
    let map = registry.get(SceneId::Map).expect("map cached");
    assert_eq!(map.id(), SceneId::Map);
    assert_eq!(map.generation(), Some(1));
}

#[test]
fn invalidating_date_dependent_scenes_keeps_welcome() {
    let mut registry = populated();
    let removed = registry.invalidate_date_dependent();

    assert_eq!(removed, vec![SceneId::Map, SceneId::Stats, SceneId::Graph]);
    assert_eq!(registry.ids(), vec![SceneId::Welcome]);
    assert!(registry.contains(SceneId::Welcome));
    assert!(!registry.contains(SceneId::Map));
}

#[test]
fn invalidate_reports_only_cached_ids() {
    let mut registry = SceneRegistry::new();
    registry.put(Scene::Welcome(WelcomeScene::loading()));

    assert!(registry.invalidate_date_dependent().is_empty());
    assert_eq!(registry.invalidate(&[SceneId::Welcome]), vec![SceneId::Welcome]);
    assert!(registry.is_empty());
}

#[test]
fn put_replaces_whole_entry() {
    let mut registry = SceneRegistry::new();
    registry.put(Scene::Welcome(WelcomeScene::loading()));
    let previous = registry.put(Scene::Welcome(WelcomeScene {
        dates: vec![date(2022, 1, 1)],
        loading: false,
    }));

    assert_eq!(
        previous.as_deref().and_then(Scene::as_welcome),
        Some(&WelcomeScene::loading())
    );
    let current = registry.get(SceneId::Welcome).expect("welcome");
    assert_eq!(
        current.as_welcome().and_then(WelcomeScene::first_date),
        Some(date(2022, 1, 1))
    );
}
