//! Search result navigation.
//!
//! [`SearchSession`] is the `Idle -> Active(results, index)` state machine
//! used by a presentation layer on top of [`HierarchyModel::search`].
//! `next` / `previous` wrap around in both directions, and every move
//! selects the current result in the model.

use crate::model::HierarchyModel;
use crate::tree::NodeId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchState {
    #[default]
    Idle,
    Active {
        term: String,
        results: Vec<NodeId>,
        index: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    state: SearchState,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SearchState::Active { .. })
    }

    /// Run a search for `term`.
    ///
    /// An empty term is ignored.  Submitting the active term again moves to
    /// the next result.  Any other term drops the previous results first;
    /// if nothing matches the session ends up `Idle`.
    pub fn submit(&mut self, model: &mut HierarchyModel, term: &str) -> Option<NodeId> {
        if term.is_empty() {
            return self.current();
        }
        if let SearchState::Active { term: active, .. } = &self.state {
            if active == term {
                return self.next(model);
            }
        }

        self.clear();
        let results = model.search(term);
        if results.is_empty() {
            log::debug!("search {term:?}: no results");
            return None;
        }

        log::debug!("search {term:?}: {} results", results.len());
        self.state = SearchState::Active {
            term: term.to_owned(),
            results,
            index: 0,
        };
        self.select_current(model)
    }

    pub fn next(&mut self, model: &mut HierarchyModel) -> Option<NodeId> {
        self.step(model, 1)
    }

    pub fn previous(&mut self, model: &mut HierarchyModel) -> Option<NodeId> {
        self.step(model, -1)
    }

    /// Drop the results and return to `Idle`.
    pub fn clear(&mut self) {
        self.state = SearchState::Idle;
    }

    pub fn current(&self) -> Option<NodeId> {
        match &self.state {
            SearchState::Idle => None,
            SearchState::Active { results, index, .. } => results.get(*index).copied(),
        }
    }

    pub fn results(&self) -> &[NodeId] {
        match &self.state {
            SearchState::Idle => &[],
            SearchState::Active { results, .. } => results,
        }
    }

    /// One-based position and result count, e.g. `(2, 5)` for "2/5".
    pub fn position(&self) -> Option<(usize, usize)> {
        match &self.state {
            SearchState::Idle => None,
            SearchState::Active { results, index, .. } => Some((index + 1, results.len())),
        }
    }

    fn step(&mut self, model: &mut HierarchyModel, delta: isize) -> Option<NodeId> {
        let SearchState::Active { results, index, .. } = &mut self.state else {
            return None;
        };
        let len = results.len() as isize;
        *index = (*index as isize + delta).rem_euclid(len) as usize;
        self.select_current(model)
    }

    fn select_current(&self, model: &mut HierarchyModel) -> Option<NodeId> {
        let id = self.current()?;
        model.select_node(id);
        Some(id)
    }
}
