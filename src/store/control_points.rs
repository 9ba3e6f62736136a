// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use tracing::debug;

use super::persistable::PersistableStore;
use crate::diagram::connections::WaypointSource;
use crate::model::{ConnectionKey, ControlPoint, ControlPointId, Position, ScopeKey};
use crate::persist::SharedAdapter;

pub const STORE_NAME: &str = "connectionControlPoints";

/// User-placed waypoints per connection, scoped per document.
///
/// Persisted as an array of `[connectionKey, [controlPoint, ...]]` entries.
#[derive(Debug)]
pub struct ControlPointStore {
    base: PersistableStore,
    scope: Option<ScopeKey>,
    points: BTreeMap<ConnectionKey, Vec<ControlPoint>>,
    next_id: u64,
}

impl ControlPointStore {
    pub fn new(adapter: SharedAdapter) -> Self {
        Self {
            base: PersistableStore::new(STORE_NAME, adapter),
            scope: None,
            points: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn scope(&self) -> Option<&ScopeKey> {
        self.scope.as_ref()
    }

    pub fn switch_to(&mut self, scope: &ScopeKey) {
        let previous = self.scope.replace(scope.clone());
        if let Some(previous) = previous.filter(|previous| previous != scope) {
            self.base.persist(previous.as_str(), &self.entries());
        }
        self.load(scope);
    }

    /// Re-reads the active scope, discarding in-memory points.
    pub fn reload_current_scope(&mut self) {
        if let Some(scope) = self.scope.clone() {
            self.load(&scope);
        }
    }

    pub fn add_control_point(&mut self, key: &ConnectionKey, position: Position) -> ControlPointId {
        let id = self.allocate_id();
        self.points.entry(key.clone()).or_default().push(ControlPoint {
            id: id.clone(),
            x: position.x,
            y: position.y,
        });
        self.save_current_store();
        id
    }

    pub fn move_control_point(&mut self, key: &ConnectionKey, id: &ControlPointId, position: Position) -> bool {
        let Some(point) = self
            .points
            .get_mut(key)
            .and_then(|points| points.iter_mut().find(|point| point.id == *id))
        else {
            return false;
        };
        point.x = position.x;
        point.y = position.y;
        self.save_current_store();
        true
    }

    /// Removes one point; a connection left without points is dropped.
    pub fn remove_control_point(&mut self, key: &ConnectionKey, id: &ControlPointId) -> bool {
        let Some(points) = self.points.get_mut(key) else {
            return false;
        };
        let before = points.len();
        points.retain(|point| point.id != *id);
        let removed = points.len() != before;
        if points.is_empty() {
            self.points.remove(key);
        }
        if removed {
            self.save_current_store();
        }
        removed
    }

    pub fn control_points(&self, key: &ConnectionKey) -> &[ControlPoint] {
        self.points.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn clear_control_points(&mut self, key: &ConnectionKey) {
        if self.points.remove(key).is_some() {
            self.save_current_store();
        }
    }

    pub fn connection_count(&self) -> usize {
        self.points.len()
    }

    pub fn save_current_store(&self) {
        if let Some(scope) = &self.scope {
            self.base.persist(scope.as_str(), &self.entries());
        }
    }

    fn load(&mut self, scope: &ScopeKey) {
        self.points = self
            .base
            .retrieve_as::<Vec<(ConnectionKey, Vec<ControlPoint>)>>(scope.as_str())
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, points)| !points.is_empty())
            .collect();
        self.next_id = self
            .points
            .values()
            .flatten()
            .filter_map(|point| point.id.as_str().strip_prefix("cp-")?.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        debug!(scope = %scope, connections = self.points.len(), "hydrated control points");
    }

    fn allocate_id(&mut self) -> ControlPointId {
        loop {
            let n = self.next_id;
            self.next_id += 1;
            if let Ok(id) = ControlPointId::new(format!("cp-{n}")) {
                return id;
            }
        }
    }

    fn entries(&self) -> Vec<(&ConnectionKey, &Vec<ControlPoint>)> {
        self.points.iter().collect()
    }
}

impl WaypointSource for ControlPointStore {
    fn waypoints(&self, key: &ConnectionKey) -> &[ControlPoint] {
        self.control_points(key)
    }
}
