//! Swap-the-model handle for embedding applications.
//!
//! Loading a dump happens off the presentation thread; the result is
//! published with [`SharedModel::replace`], which swaps the whole model in
//! one step.  Readers never observe a partially built model.
//!
//! # Thread safety
//!
//! The slot is a `parking_lot::RwLock`.  Selection and flag changes take the
//! write lock; queries take the read lock.

use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::model::HierarchyModel;

#[derive(Debug, Clone, Default)]
pub struct SharedModel {
    slot: Arc<RwLock<Option<HierarchyModel>>>,
}

impl SharedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `model`, returning the one it replaces.
    pub fn replace(&self, model: HierarchyModel) -> Option<HierarchyModel> {
        let previous = self.slot.write().replace(model);
        log::debug!(
            "model replaced ({} previous)",
            if previous.is_some() { "dropped" } else { "no" }
        );
        previous
    }

    /// Remove the current model.
    pub fn take(&self) -> Option<HierarchyModel> {
        self.slot.write().take()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Shared access to the current model, if any.
    pub fn read(&self) -> Option<MappedRwLockReadGuard<'_, HierarchyModel>> {
        RwLockReadGuard::try_map(self.slot.read(), Option::as_ref).ok()
    }

    /// Run `f` with exclusive access to the current model.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut HierarchyModel) -> R) -> Option<R> {
        self.slot.write().as_mut().map(f)
    }
}
