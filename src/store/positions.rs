// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, info};

use super::persistable::PersistableStore;
use crate::config::DiagramConfig;
use crate::events::{DiagramEvent, EventBus, EventKind, Subscription};
use crate::layout::compute_elements_positions;
use crate::model::{EntityKind, Position, Schema, ScopeKey};
use crate::persist::SharedAdapter;

/// Per-document coordinates of one entity kind.
///
/// Persisted as an array of `[name, {x, y}]` pairs under `tableCoords:{scope}` or
/// `enumCoords:{scope}`.
#[derive(Debug)]
pub struct PositionStore {
    kind: EntityKind,
    base: PersistableStore,
    bus: Rc<EventBus>,
    config: Rc<DiagramConfig>,
    scope: Option<ScopeKey>,
    positions: BTreeMap<String, Position>,
}

impl PositionStore {
    pub fn new(
        kind: EntityKind,
        adapter: SharedAdapter,
        bus: Rc<EventBus>,
        config: Rc<DiagramConfig>,
    ) -> Self {
        Self {
            kind,
            base: PersistableStore::new(Self::store_name(kind), adapter),
            bus,
            config,
            scope: None,
            positions: BTreeMap::new(),
        }
    }

    pub fn store_name(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Table => "tableCoords",
            EntityKind::Enum => "enumCoords",
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn scope(&self) -> Option<&ScopeKey> {
        self.scope.as_ref()
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Activates `scope`, saving the outgoing one first.
    ///
    /// Persisted positions for the new scope are used verbatim; without them the store runs
    /// a fresh layout merged with whatever is still in memory for the same scope.
    pub fn switch_to(&mut self, scope: &ScopeKey, schema: &Schema) {
        let previous = self.scope.replace(scope.clone());
        if let Some(previous) = &previous {
            self.base.persist(previous.as_str(), &self.entries());
        }

        match self.load(scope).filter(|persisted| !persisted.is_empty()) {
            Some(persisted) => {
                debug!(kind = %self.kind, scope = %scope, count = persisted.len(), "hydrated positions");
                self.positions = persisted;
                self.publish_reset();
            }
            None => {
                if previous.as_ref() != Some(scope) {
                    self.positions.clear();
                }
                self.reset_positions(schema);
            }
        }
    }

    /// Computes a fresh layout and merges it under in-memory and persisted entries.
    pub fn reset_positions(&mut self, schema: &Schema) {
        let mut merged = self.computed(schema);
        if let Some(scope) = self.scope.clone() {
            merged.extend(self.load(&scope).unwrap_or_default());
        }
        merged.extend(std::mem::take(&mut self.positions));
        self.positions = merged;
        self.publish_reset();
    }

    /// Discards every stored position and applies a fresh layout.
    pub fn relayout(&mut self, schema: &Schema) {
        self.positions = self.computed(schema);
        info!(kind = %self.kind, count = self.positions.len(), "auto-arranged");
        self.save_current_store();
        self.publish_reset();
    }

    pub fn coords(&self, name: &str) -> Position {
        self.try_coords(name).unwrap_or(Position::UNSET)
    }

    pub fn try_coords(&self, name: &str) -> Option<Position> {
        self.positions.get(name).copied()
    }

    pub fn set_coords(&mut self, name: &str, position: Position) {
        self.positions.insert(name.to_owned(), position);
        self.save_current_store();
    }

    /// Moves an entity by a delta without persisting. Returns the new position.
    pub fn shift(&mut self, name: &str, dx: f64, dy: f64) -> Option<Position> {
        let position = self.positions.get_mut(name)?;
        *position = position.offset(dx, dy);
        Some(*position)
    }

    pub fn remove(&mut self, name: &str) {
        self.positions.remove(name);
    }

    pub fn save_current_store(&self) {
        if let Some(scope) = &self.scope {
            self.base.persist(scope.as_str(), &self.entries());
        }
    }

    /// Drops in-memory state and rebuilds it from persistence, falling back to layout.
    pub fn reload_current_scope(&mut self, schema: &Schema) {
        let Some(scope) = self.scope.clone() else {
            return;
        };
        self.positions.clear();
        match self.load(&scope).filter(|persisted| !persisted.is_empty()) {
            Some(persisted) => {
                self.positions = persisted;
                self.publish_reset();
            }
            None => self.reset_positions(schema),
        }
    }

    /// Calls `callback` with the full map whenever it is replaced.
    pub fn subscribe_to_reset(
        &self,
        mut callback: impl FnMut(&BTreeMap<String, Position>) + 'static,
    ) -> Subscription {
        let kind = self.kind;
        self.bus.subscribe(EventKind::PositionsReset, move |event| {
            if let DiagramEvent::PositionsReset {
                kind: reset_kind,
                positions,
            } = event
            {
                if *reset_kind == kind {
                    callback(positions);
                }
            }
        })
    }

    fn entries(&self) -> Vec<(&String, &Position)> {
        self.positions.iter().collect()
    }

    fn load(&self, scope: &ScopeKey) -> Option<BTreeMap<String, Position>> {
        self.base
            .retrieve_as::<Vec<(String, Position)>>(scope.as_str())
            .map(|entries| entries.into_iter().collect())
    }

    fn computed(&self, schema: &Schema) -> BTreeMap<String, Position> {
        let layout = compute_elements_positions(&schema.tables, &schema.refs, &schema.enums, &self.config);
        match self.kind {
            EntityKind::Table => layout.tables,
            EntityKind::Enum => layout.enums,
        }
    }

    fn publish_reset(&self) {
        self.bus.emit(&DiagramEvent::PositionsReset {
            kind: self.kind,
            positions: self.positions.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::PositionStore;
    use crate::config::DiagramConfig;
    use crate::events::EventBus;
    use crate::model::fixtures::{blog_schema, scope, unrelated_tables};
    use crate::model::{EntityKind, Position};
    use crate::persist::{PersistenceAdapter, SharedAdapter};

    struct TestCtx {
        adapter: SharedAdapter,
        bus: Rc<EventBus>,
        store: PositionStore,
    }

    impl TestCtx {
        fn persisted(&self, key: &str) -> Option<serde_json::Value> {
            self.adapter.borrow_mut().get_item_exact(key).map(|found| found.value)
        }
    }

    #[fixture]
    fn ctx() -> TestCtx {
        let adapter = PersistenceAdapter::default()
            .with_snapshot(BTreeMap::new())
            .into_shared();
        let bus = EventBus::new();
        let store = PositionStore::new(
            EntityKind::Table,
            adapter.clone(),
            bus.clone(),
            Rc::new(DiagramConfig::default()),
        );
        TestCtx { adapter, bus, store }
    }

    #[rstest]
    fn fresh_scope_gets_layout_for_every_table(mut ctx: TestCtx) {
        let schema = blog_schema();
        ctx.store.switch_to(&scope("a"), &schema);
        for table in &schema.tables {
            assert!(ctx.store.try_coords(&table.name).is_some(), "{} placed", table.name);
        }
        assert_eq!(ctx.store.coords("missing"), Position::UNSET);
    }

    #[rstest]
    fn persisted_positions_hydrate_verbatim(mut ctx: TestCtx) {
        ctx.adapter
            .borrow_mut()
            .set_item("tableCoords:a", &json!([["users", {"x": 7.0, "y": 9.0}]]));
        ctx.store.switch_to(&scope("a"), &blog_schema());

        assert_eq!(ctx.store.positions().len(), 1);
        assert_eq!(ctx.store.coords("users"), Position::new(7.0, 9.0));
    }

    #[rstest]
    fn set_coords_persists_immediately(mut ctx: TestCtx) {
        ctx.store.switch_to(&scope("a"), &unrelated_tables(2));
        ctx.store.set_coords("t0", Position::new(100.0, 200.0));

        let stored = ctx.persisted("tableCoords:a").expect("persisted");
        assert!(stored
            .as_array()
            .expect("entries")
            .contains(&json!(["t0", {"x": 100.0, "y": 200.0}])));
    }

    #[rstest]
    fn switching_away_and_back_keeps_positions(mut ctx: TestCtx) {
        let schema = unrelated_tables(3);
        ctx.store.switch_to(&scope("a"), &schema);
        ctx.store.set_coords("t1", Position::new(999.0, 1.0));

        ctx.store.switch_to(&scope("b"), &schema);
        assert_ne!(ctx.store.coords("t1"), Position::new(999.0, 1.0));

        ctx.store.switch_to(&scope("a"), &schema);
        assert_eq!(ctx.store.coords("t1"), Position::new(999.0, 1.0));
    }

    #[rstest]
    fn in_memory_beats_persisted_beats_computed(mut ctx: TestCtx) {
        let schema = unrelated_tables(3);
        ctx.store.switch_to(&scope("a"), &schema);
        ctx.adapter.borrow_mut().set_item(
            "tableCoords:a",
            &json!([["t0", {"x": 1.0, "y": 1.0}], ["t1", {"x": 2.0, "y": 2.0}]]),
        );
        ctx.store.remove("t0");
        ctx.store.remove("t2");
        ctx.store.shift("t1", 1000.0, 0.0);
        let in_memory = ctx.store.coords("t1");

        ctx.store.reset_positions(&schema);

        assert_eq!(ctx.store.coords("t1"), in_memory);
        assert_eq!(ctx.store.coords("t0"), Position::new(1.0, 1.0));
        assert!(ctx.store.try_coords("t2").is_some());
    }

    #[rstest]
    fn malformed_persisted_data_falls_back_to_layout(mut ctx: TestCtx) {
        ctx.adapter
            .borrow_mut()
            .set_item("tableCoords:a", &json!({"users": "nope"}));
        ctx.store.switch_to(&scope("a"), &blog_schema());
        assert_eq!(ctx.store.positions().len(), 3);
    }

    #[rstest]
    fn reset_is_published_to_matching_kind(mut ctx: TestCtx) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = ctx.store.subscribe_to_reset(move |positions| {
            sink.borrow_mut().push(positions.len());
        });
        let other = PositionStore::new(
            EntityKind::Enum,
            ctx.adapter.clone(),
            ctx.bus.clone(),
            Rc::new(DiagramConfig::default()),
        );
        let _other_sub = other.subscribe_to_reset(|_| panic!("enum subscriber must not fire"));

        ctx.store.switch_to(&scope("a"), &unrelated_tables(4));
        assert_eq!(*seen.borrow(), vec![4]);
    }

    #[rstest]
    fn relayout_discards_manual_positions_and_persists(mut ctx: TestCtx) {
        let schema = unrelated_tables(2);
        ctx.store.switch_to(&scope("a"), &schema);
        let computed = ctx.store.coords("t0");
        ctx.store.set_coords("t0", Position::new(5000.0, 5000.0));

        ctx.store.relayout(&schema);
        assert_eq!(ctx.store.coords("t0"), computed);
        let stored = ctx.persisted("tableCoords:a").expect("persisted");
        assert!(!stored.to_string().contains("5000"));
    }

    #[rstest]
    fn reload_prefers_persistence_over_memory(mut ctx: TestCtx) {
        let schema = unrelated_tables(1);
        ctx.store.switch_to(&scope("a"), &schema);
        ctx.store.shift("t0", 10.0, 10.0);
        ctx.adapter
            .borrow_mut()
            .set_item("tableCoords:a", &json!([["t0", {"x": 3.0, "y": 4.0}]]));

        ctx.store.reload_current_scope(&schema);
        assert_eq!(ctx.store.coords("t0"), Position::new(3.0, 4.0));
    }
}
