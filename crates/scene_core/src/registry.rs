use std::{collections::HashMap, sync::Arc};

use shared::domain::SceneId;
use tracing::debug;

use crate::scenes::Scene;

#[derive(Debug, Default)]
pub struct SceneRegistry {
    scenes: HashMap<SceneId, Arc<Scene>>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SceneId) -> Option<Arc<Scene>> {
        self.scenes.get(&id).cloned()
    }

    pub fn put(&mut self, scene: Scene) -> Option<Arc<Scene>> {
        let id = scene.id();
        debug!(scene = %id, "scene cached");
        self.scenes.insert(id, Arc::new(scene))
    }

    /// Returns the ids that were actually cached.
    pub fn invalidate(&mut self, ids: &[SceneId]) -> Vec<SceneId> {
        let removed: Vec<_> = ids
            .iter()
            .copied()
            .filter(|id| self.scenes.remove(id).is_some())
            .collect();
        if !removed.is_empty() {
            debug!(?removed, "scenes invalidated");
        }
        removed
    }

    pub fn invalidate_date_dependent(&mut self) -> Vec<SceneId> {
        self.invalidate(&SceneId::DATE_DEPENDENT)
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.scenes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn ids(&self) -> Vec<SceneId> {
        let mut ids: Vec<_> = self.scenes.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
