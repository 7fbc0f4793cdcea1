//! Registry of table models awaiting synchronisation.
//!
//! Models are registered once, validated on construction, and drained in
//! dependency order by the [`Synchronizer`](crate::Synchronizer).

use std::collections::HashMap;

use modelsync_core::TableModel;
use tracing::debug;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Visiting,
    Done,
}

/// Declared tables, in registration order.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<TableModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateTable`] if a model with the same table
    /// name is already registered.
    pub fn register(&mut self, model: TableModel) -> Result<()> {
        if self.get(model.name()).is_some() {
            return Err(SyncError::DuplicateTable(model.name().to_string()));
        }
        debug!(table = model.name(), "registered model");
        self.models.push(model);
        Ok(())
    }

    pub fn get(&self, table: &str) -> Option<&TableModel> {
        self.models.iter().find(|m| m.name() == table)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Table names in the order they would be drained.
    pub fn order(&self) -> Result<Vec<&str>> {
        Ok(self
            .ordered_indices()?
            .into_iter()
            .map(|i| self.models[i].name())
            .collect())
    }

    /// Removes and returns every model, dependencies before dependents.
    ///
    /// Models without a dependency relation keep their registration order.
    /// Dependencies naming tables outside the registry are assumed to exist
    /// already.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DependencyCycle`] and leaves the registry intact
    /// if the declared dependencies form a cycle.
    pub fn drain(&mut self) -> Result<Vec<TableModel>> {
        let order = self.ordered_indices()?;
        let mut slots: Vec<Option<TableModel>> =
            std::mem::take(&mut self.models).into_iter().map(Some).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }

    fn ordered_indices(&self) -> Result<Vec<usize>> {
        let index: HashMap<&str, usize> = self
            .models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name(), i))
            .collect();
        let mut marks = vec![Mark::New; self.models.len()];
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.models.len());

        for i in 0..self.models.len() {
            self.visit(i, &index, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        i: usize,
        index: &HashMap<&str, usize>,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<()> {
        match marks[i] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                let start = path.iter().position(|&j| j == i).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..]
                    .iter()
                    .map(|&j| self.models[j].name().to_string())
                    .collect();
                cycle.push(self.models[i].name().to_string());
                return Err(SyncError::DependencyCycle(cycle));
            }
            Mark::New => {}
        }

        marks[i] = Mark::Visiting;
        path.push(i);
        for dependency in self.models[i].depends_on() {
            match index.get(dependency.as_str()) {
                Some(&j) => self.visit(j, index, marks, path, order)?,
                None => debug!(
                    table = self.models[i].name(),
                    dependency = %dependency,
                    "dependency not registered, assuming it exists"
                ),
            }
        }
        path.pop();
        marks[i] = Mark::Done;
        order.push(i);
        Ok(())
    }
}
