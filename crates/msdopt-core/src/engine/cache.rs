use super::model::Model;
use crate::core::params::{HyperParams, ParamsId};
use std::collections::HashMap;

/// One model per distinct hyperparameter tuple.
#[derive(Debug, Default, Clone)]
pub struct ModelCache {
    models: HashMap<ParamsId, Model>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, params: &HyperParams) -> Option<&Model> {
        self.models.get(&params.id())
    }

    pub fn get_mut(&mut self, params: &HyperParams) -> Option<&mut Model> {
        self.models.get_mut(&params.id())
    }

    /// Returns the model for `params`, creating it with `create` on first use.
    /// The flag is `true` when a new model was inserted.
    pub fn get_or_create(
        &mut self,
        params: &HyperParams,
        create: impl FnOnce() -> Model,
    ) -> (&mut Model, bool) {
        let mut created = false;
        let model = self.models.entry(params.id()).or_insert_with(|| {
            created = true;
            create()
        });
        (model, created)
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamsId, &Model)> {
        self.models.iter()
    }

    /// Cached models ordered by their parameter id.
    pub fn sorted(&self) -> Vec<(&ParamsId, &Model)> {
        let mut models: Vec<_> = self.models.iter().collect();
        models.sort_by(|a, b| a.0.cmp(b.0));
        models
    }
}
