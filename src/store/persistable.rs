// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::persist::{Lookup, SharedAdapter};

/// Namespaced access to the shared adapter: every key becomes `"{store}:{scope}"`.
#[derive(Debug, Clone)]
pub struct PersistableStore {
    name: &'static str,
    adapter: SharedAdapter,
}

impl PersistableStore {
    pub fn new(name: &'static str, adapter: SharedAdapter) -> Self {
        Self { name, adapter }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn create_key(&self, scopeless: &str) -> String {
        format!("{}:{scopeless}", self.name)
    }

    /// Serializes and writes `value`. Failures are logged, never raised.
    pub fn persist<T: Serialize + ?Sized>(&self, scopeless: &str, value: &T) {
        let key = self.create_key(scopeless);
        match serde_json::to_value(value) {
            Ok(value) => {
                debug!(%key, "persist");
                self.adapter.borrow_mut().set_item(&key, &value);
            }
            Err(err) => error!(%key, error = %err, "failed to serialize store state"),
        }
    }

    /// Raw lookup, including the adapter's legacy fallback.
    pub fn retrieve(&self, scopeless: &str) -> Option<Lookup> {
        let key = self.create_key(scopeless);
        let found = self.adapter.borrow_mut().get_item(&key);
        debug!(%key, hit = found.is_some(), "retrieve");
        found
    }

    pub fn retrieve_exact(&self, scopeless: &str) -> Option<Lookup> {
        self.adapter.borrow_mut().get_item_exact(&self.create_key(scopeless))
    }

    /// Typed lookup; a value of the wrong shape reads as absent.
    pub fn retrieve_as<T: DeserializeOwned>(&self, scopeless: &str) -> Option<T> {
        let found = self.retrieve(scopeless)?;
        match serde_json::from_value(found.value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = self.create_key(scopeless), error = %err, "ignoring persisted value of unexpected shape");
                None
            }
        }
    }

    pub fn clear(&self, scopeless: &str) {
        let key = self.create_key(scopeless);
        debug!(%key, "clear");
        self.adapter.borrow_mut().remove_item(&key);
    }
}
