//! Registration table
//!
//! The registry maps endpoints, tables and models onto each other and keeps
//! the models in the order they were registered.

use crate::model::Model;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// Lookup tables for every registered model
#[derive(Debug, Default, Clone)]
pub struct Registry {
    models: Vec<Model>,
    endpoint_models: HashMap<String, usize>,
    table_to_endpoint: HashMap<String, String>,
    models_by_table: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model with the API under [`Model::endpoint`]
    ///
    /// Registering a table again replaces its previous model in place.
    /// Claiming an endpoint already served by another table is an error.
    pub fn register(&mut self, mut model: Model, use_admin: bool) -> Result<()> {
        let endpoint = model.endpoint();
        let table = model.table_name().to_string();

        if let Some(&index) = self.endpoint_models.get(&endpoint) {
            let owner = self.models[index].table_name();
            if owner != table {
                return Err(Error::EndpointConflict {
                    endpoint,
                    table: owner.to_string(),
                });
            }
        }

        model.use_admin = use_admin;
        model.related_tables = BTreeSet::new();

        let index = match self.models_by_table.get(&table) {
            Some(&index) => {
                let previous = self.models[index].endpoint();
                self.endpoint_models.remove(&previous);
                self.models[index] = model;
                index
            }
            None => {
                self.models.push(model);
                self.models.len() - 1
            }
        };

        tracing::debug!(%table, %endpoint, use_admin, "registered model");

        self.endpoint_models.insert(endpoint.clone(), index);
        self.table_to_endpoint.insert(table.clone(), endpoint);
        self.models_by_table.insert(table, index);
        Ok(())
    }

    /// Register every model in `models` with the same admin flag
    pub fn register_all(
        &mut self,
        models: impl IntoIterator<Item = Model>,
        use_admin: bool,
    ) -> Result<()> {
        for model in models {
            self.register(model, use_admin)?;
        }
        Ok(())
    }

    pub fn by_endpoint(&self, endpoint: &str) -> Option<&Model> {
        self.endpoint_models
            .get(endpoint)
            .map(|&index| &self.models[index])
    }

    pub fn by_table(&self, table: &str) -> Option<&Model> {
        self.models_by_table
            .get(table)
            .map(|&index| &self.models[index])
    }

    pub(crate) fn by_table_mut(&mut self, table: &str) -> Option<&mut Model> {
        match self.models_by_table.get(table) {
            Some(&index) => self.models.get_mut(index),
            None => None,
        }
    }

    pub fn endpoint_for_table(&self, table: &str) -> Option<&str> {
        self.table_to_endpoint.get(table).map(String::as_str)
    }

    /// Registered models in registration order
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    pub(crate) fn models_mut(&mut self) -> impl Iterator<Item = &mut Model> {
        self.models.iter_mut()
    }

    /// Models that asked for an admin view
    pub fn admin_models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter().filter(|model| model.use_admin())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
