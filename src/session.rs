// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The lifecycle owner of one diagram panel.
//!
//! A [`DiagramSession`] holds the persistence adapter, the event bus and every store, and
//! routes canvas interactions (drags, resizes, selection) to them. All work happens on the
//! caller's thread; durable writes leave through the adapter without blocking.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::{debug, info};

use crate::config::{ConnectionStyle, DiagramConfig};
use crate::diagram::{
    enum_connections, relation_connections, ConnectionContext, EnumConnection, RelationConnection,
};
use crate::events::{DiagramEvent, EventBus, EventKind, Subscription};
use crate::layout::{enum_dimension, table_dimension};
use crate::model::{
    ConnectionKey, ControlPoint, ControlPointId, EntityKind, GroupDimensionsPatch, GroupDraft,
    GroupId, MembershipDelta, Position, Rect, Schema, ScopeKey, Size, StructureFingerprint,
};
use crate::persist::{HostEffect, HostEvent, PersistError, SharedAdapter};
use crate::store::{groups, ControlPointStore, GroupStore, PositionStore};

/// Corner grabbed when resizing a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeCorner {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

/// Resizes `start` by dragging `corner` by `(dx, dy)`, keeping the opposite corner fixed
/// and never shrinking below `min`.
pub fn resize_rect(start: Rect, corner: ResizeCorner, dx: f64, dy: f64, min: Size) -> Rect {
    let (grow_x, grow_y) = match corner {
        ResizeCorner::NorthWest => (-dx, -dy),
        ResizeCorner::NorthEast => (dx, -dy),
        ResizeCorner::SouthWest => (-dx, dy),
        ResizeCorner::SouthEast => (dx, dy),
    };
    let width = (start.width + grow_x).max(min.width);
    let height = (start.height + grow_y).max(min.height);
    let x = match corner {
        ResizeCorner::NorthWest | ResizeCorner::SouthWest => start.right() - width,
        ResizeCorner::NorthEast | ResizeCorner::SouthEast => start.x,
    };
    let y = match corner {
        ResizeCorner::NorthWest | ResizeCorner::NorthEast => start.bottom() - height,
        ResizeCorner::SouthWest | ResizeCorner::SouthEast => start.y,
    };
    Rect::new(x, y, width, height)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveDrag {
    kind: EntityKind,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
struct GroupDrag {
    id: GroupId,
    last_origin: Position,
}

#[derive(Debug)]
pub struct DiagramSession {
    config: Rc<DiagramConfig>,
    adapter: SharedAdapter,
    bus: Rc<EventBus>,
    tables: PositionStore,
    enums: PositionStore,
    groups: GroupStore,
    control_points: ControlPointStore,
    schema: Schema,
    scope: Option<ScopeKey>,
    fingerprint: Option<StructureFingerprint>,
    selection: BTreeSet<String>,
    drag: Option<ActiveDrag>,
    group_drag: Option<GroupDrag>,
    resizing: Option<GroupId>,
    connection_style: ConnectionStyle,
}

impl DiagramSession {
    /// Builds every store on top of `adapter`. No scope is active until
    /// [`Self::switch_scope`].
    pub fn create(config: DiagramConfig, adapter: SharedAdapter) -> Self {
        let config = Rc::new(config);
        let bus = EventBus::new();
        let legacy_key = format!(
            "{}:{}",
            groups::STORE_NAME,
            config.persistence.legacy_group_scope
        );
        adapter
            .borrow_mut()
            .register_legacy_fallback(&format!("{}:", groups::STORE_NAME), &legacy_key);

        Self {
            tables: PositionStore::new(EntityKind::Table, adapter.clone(), bus.clone(), config.clone()),
            enums: PositionStore::new(EntityKind::Enum, adapter.clone(), bus.clone(), config.clone()),
            groups: GroupStore::new(adapter.clone(), bus.clone(), config.clone()),
            control_points: ControlPointStore::new(adapter.clone()),
            connection_style: config.connection_style,
            config,
            adapter,
            bus,
            schema: Schema::default(),
            scope: None,
            fingerprint: None,
            selection: BTreeSet::new(),
            drag: None,
            group_drag: None,
            resizing: None,
        }
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn adapter(&self) -> &SharedAdapter {
        &self.adapter
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl FnMut(&DiagramEvent) + 'static,
    ) -> Subscription {
        self.bus.subscribe(kind, handler)
    }

    pub fn scope(&self) -> Option<&ScopeKey> {
        self.scope.as_ref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn tables(&self) -> &PositionStore {
        &self.tables
    }

    pub fn enums(&self) -> &PositionStore {
        &self.enums
    }

    pub fn groups(&self) -> &GroupStore {
        &self.groups
    }

    pub fn control_point_store(&self) -> &ControlPointStore {
        &self.control_points
    }

    pub fn positions(&self, kind: EntityKind) -> &BTreeMap<String, Position> {
        self.store(kind).positions()
    }

    pub fn coords(&self, kind: EntityKind, name: &str) -> Position {
        self.store(kind).coords(name)
    }

    /// Opens another document. Every store saves the outgoing scope before loading the
    /// new one, and any drag in progress is abandoned.
    pub fn switch_scope(&mut self, scope: ScopeKey, schema: Schema) {
        self.drag = None;
        self.group_drag = None;
        self.resizing = None;

        info!(scope = %scope, tables = schema.tables.len(), enums = schema.enums.len(), "switching scope");
        self.tables.switch_to(&scope, &schema);
        self.enums.switch_to(&scope, &schema);
        self.groups.switch_to(&scope, &schema.groups);
        self.control_points.switch_to(&scope);

        self.fingerprint = Some(schema.fingerprint());
        self.schema = schema;
        self.scope = Some(scope);
        if !self.selection.is_empty() {
            self.clear_selection();
        }
        self.publish_outcomes();
    }

    /// Installs a new schema snapshot for the active document.
    ///
    /// Adding or removing entities or relations re-runs layout for entities without a
    /// position. Groups defined by the schema are only adopted while the store is empty.
    pub fn update_schema(&mut self, schema: Schema) {
        let fingerprint = schema.fingerprint();
        let structural = self.fingerprint.as_ref() != Some(&fingerprint);
        self.fingerprint = Some(fingerprint);
        self.schema = schema;
        if self.scope.is_none() {
            return;
        }

        if structural && self.config.auto_layout_on_structural_change {
            debug!(tables = self.schema.tables.len(), "structure changed; resetting positions");
            self.tables.reset_positions(&self.schema);
            self.enums.reset_positions(&self.schema);
        }
        if self.groups.is_empty() && !self.schema.groups.is_empty() {
            self.groups.init_groups(&self.schema.groups);
            self.bus.emit(&DiagramEvent::GroupsChanged);
        }
    }

    pub fn begin_drag(&mut self, kind: EntityKind, name: &str) {
        self.drag = Some(ActiveDrag {
            kind,
            name: name.to_owned(),
        });
    }

    /// Moves the dragged entity. Events for anything but the active drag are dropped.
    pub fn drag_to(&mut self, kind: EntityKind, name: &str, position: Position) -> bool {
        if !self.is_dragging(kind, name) {
            debug!(%kind, name, "ignoring move without an active drag");
            return false;
        }
        self.store_mut(kind).set_coords(name, position);
        self.bus.emit(&DiagramEvent::EntityMoved {
            kind,
            name: name.to_owned(),
            position,
        });
        true
    }

    /// Finishes a drag and files the entity under the group containing its center.
    ///
    /// Returns the entity's group afterwards.
    pub fn end_drag(&mut self, kind: EntityKind, name: &str) -> Option<GroupId> {
        if !self.is_dragging(kind, name) {
            return self.groups.group_of(kind, name).cloned();
        }
        self.drag = None;

        let target = self.entity_rect(kind, name).and_then(|rect| {
            let center = rect.center();
            self.groups
                .groups()
                .find(|group| group.rect().contains(center))
                .map(|group| group.id.clone())
        });
        match &target {
            Some(id) => {
                match kind {
                    EntityKind::Table => self.groups.add_table_to_group(id, name),
                    EntityKind::Enum => self.groups.add_enum_to_group(id, name),
                };
            }
            None => {
                self.groups.remove_from_all_groups(kind, name);
            }
        }
        self.publish_outcomes();
        target
    }

    pub fn is_dragging(&self, kind: EntityKind, name: &str) -> bool {
        self.drag
            .as_ref()
            .is_some_and(|drag| drag.kind == kind && drag.name == name)
    }

    pub fn begin_group_drag(&mut self, id: &GroupId) -> bool {
        let Some(group) = self.groups.group(id.as_str()) else {
            return false;
        };
        self.group_drag = Some(GroupDrag {
            id: id.clone(),
            last_origin: group.rect().origin(),
        });
        true
    }

    /// Moves the dragged group to `origin`, carrying its members along. Nothing is
    /// persisted until [`Self::end_group_drag`].
    pub fn drag_group(&mut self, id: &GroupId, origin: Position) -> bool {
        let Some(drag) = self.group_drag.as_mut().filter(|drag| drag.id == *id) else {
            return false;
        };
        let dx = origin.x - drag.last_origin.x;
        let dy = origin.y - drag.last_origin.y;
        drag.last_origin = origin;

        self.groups
            .preview_dimensions(id, &GroupDimensionsPatch::origin(origin.x, origin.y));
        for kind in [EntityKind::Table, EntityKind::Enum] {
            let members = match kind {
                EntityKind::Table => self.groups.tables_in_group(id.as_str()).clone(),
                EntityKind::Enum => self.groups.enums_in_group(id.as_str()).clone(),
            };
            for name in members {
                if let Some(position) = self.store_mut(kind).shift(&name, dx, dy) {
                    self.bus.emit(&DiagramEvent::EntityMoved {
                        kind,
                        name,
                        position,
                    });
                }
            }
        }
        true
    }

    /// Persists the dragged group and its members, then re-derives membership.
    pub fn end_group_drag(&mut self, id: &GroupId) -> MembershipDelta {
        if self.group_drag.as_ref().is_some_and(|drag| drag.id == *id) {
            self.group_drag = None;
        }
        self.groups.save_current_store();
        self.tables.save_current_store();
        self.enums.save_current_store();
        self.recompute_membership(id)
    }

    /// Applies a resize frame without persisting.
    pub fn resize_group(&mut self, id: &GroupId, rect: Rect) -> bool {
        if !self.groups.preview_dimensions(id, &GroupDimensionsPatch::rect(rect)) {
            return false;
        }
        self.resizing = Some(id.clone());
        true
    }

    pub fn end_group_resize(&mut self, id: &GroupId) -> MembershipDelta {
        if self.resizing.as_ref() == Some(id) {
            self.resizing = None;
        }
        self.groups.save_current_store();
        self.recompute_membership(id)
    }

    pub fn recompute_membership(&mut self, id: &GroupId) -> MembershipDelta {
        let table_boxes = self.entity_rects(EntityKind::Table);
        let enum_boxes = self.entity_rects(EntityKind::Enum);
        let delta = self.groups.recompute_membership(id, &table_boxes, &enum_boxes);
        self.publish_outcomes();
        delta
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    /// Adds or removes one table from the selection. Returns whether it is now selected.
    pub fn toggle_selection(&mut self, name: &str) -> bool {
        let selected = if self.selection.remove(name) {
            false
        } else {
            self.selection.insert(name.to_owned())
        };
        self.publish_selection();
        selected
    }

    pub fn select_multiple<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = names.into_iter().map(Into::into).collect();
        self.publish_selection();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.publish_selection();
    }

    /// Groups the selected tables and clears the selection.
    pub fn create_group_from_selection(&mut self) -> Option<GroupId> {
        if self.selection.is_empty() {
            return None;
        }
        let tables = std::mem::take(&mut self.selection);
        let id = self.groups.create_group_from_selection(tables);
        self.publish_selection();
        id
    }

    pub fn create_group(&mut self, draft: GroupDraft) -> GroupId {
        self.groups.create_group(draft)
    }

    pub fn rename_group(&mut self, id: &GroupId, name: &str, color: Option<String>) -> bool {
        self.groups.rename_group(id, name, color)
    }

    pub fn delete_group(&mut self, id: &GroupId) -> bool {
        self.groups.delete_group(id)
    }

    pub fn set_group_dimensions(&mut self, id: &GroupId, patch: &GroupDimensionsPatch) -> bool {
        self.groups.set_group_dimensions(id, patch)
    }

    pub fn add_control_point(&mut self, key: &ConnectionKey, position: Position) -> ControlPointId {
        self.control_points.add_control_point(key, position)
    }

    pub fn move_control_point(
        &mut self,
        key: &ConnectionKey,
        id: &ControlPointId,
        position: Position,
    ) -> bool {
        self.control_points.move_control_point(key, id, position)
    }

    pub fn remove_control_point(&mut self, key: &ConnectionKey, id: &ControlPointId) -> bool {
        self.control_points.remove_control_point(key, id)
    }

    pub fn control_points(&self, key: &ConnectionKey) -> &[ControlPoint] {
        self.control_points.control_points(key)
    }

    pub fn connection_style(&self) -> ConnectionStyle {
        self.connection_style
    }

    pub fn set_connection_style(&mut self, style: ConnectionStyle) {
        if self.connection_style == style {
            return;
        }
        self.connection_style = style;
        self.bus.emit(&DiagramEvent::ConnectionStyleChanged(style));
    }

    pub fn connections(&self) -> Vec<RelationConnection> {
        relation_connections(&self.connection_context())
    }

    pub fn enum_connections(&self) -> Vec<EnumConnection> {
        enum_connections(&self.connection_context())
    }

    /// Throws away every stored position and lays the schema out from scratch.
    pub fn auto_arrange(&mut self, schema: &Schema) {
        self.fingerprint = Some(schema.fingerprint());
        self.schema = schema.clone();
        self.tables.relayout(&self.schema);
        self.enums.relayout(&self.schema);
        self.publish_outcomes();
    }

    /// Asks the host to send the durable store back. The stores reload once the data
    /// arrives through [`Self::handle_host_event`].
    pub fn reload_persisted_positions(&self) -> Result<(), PersistError> {
        self.adapter.borrow().request_reload()
    }

    pub fn handle_host_event(&mut self, event: HostEvent) -> HostEffect {
        let effect = self.adapter.borrow_mut().handle_host_event(event);
        if let HostEffect::Reloaded { keys } = &effect {
            info!(keys = *keys, "reloading stores from persisted data");
            self.drag = None;
            self.group_drag = None;
            self.resizing = None;
            self.tables.reload_current_scope(&self.schema);
            self.enums.reload_current_scope(&self.schema);
            self.groups.reload_current_scope(&self.schema.groups);
            self.control_points.reload_current_scope();
            self.bus.emit(&DiagramEvent::PersistedDataReloaded);
        }
        self.publish_outcomes();
        effect
    }

    /// Writes every store for the active scope, e.g. when the panel is hidden.
    pub fn save_all(&self) {
        self.tables.save_current_store();
        self.enums.save_current_store();
        self.groups.save_current_store();
        self.control_points.save_current_store();
        self.publish_outcomes();
    }

    /// Saves every store and pushes out writes still parked behind unacknowledged ones.
    pub fn dispose(self) {
        self.tables.save_current_store();
        self.enums.save_current_store();
        self.groups.save_current_store();
        self.control_points.save_current_store();
        self.adapter.borrow_mut().flush_durable();
        self.publish_outcomes();
        self.bus.clear();
    }

    fn store(&self, kind: EntityKind) -> &PositionStore {
        match kind {
            EntityKind::Table => &self.tables,
            EntityKind::Enum => &self.enums,
        }
    }

    fn store_mut(&mut self, kind: EntityKind) -> &mut PositionStore {
        match kind {
            EntityKind::Table => &mut self.tables,
            EntityKind::Enum => &mut self.enums,
        }
    }

    fn entity_rect(&self, kind: EntityKind, name: &str) -> Option<Rect> {
        let origin = self.store(kind).try_coords(name)?;
        let size = match kind {
            EntityKind::Table => table_dimension(self.schema.table(name)?, &self.config.sizing),
            EntityKind::Enum => enum_dimension(self.schema.enum_by_name(name)?, &self.config.sizing),
        };
        Some(Rect::from_parts(origin, size))
    }

    /// Boxes of every schema entity that has a position.
    fn entity_rects(&self, kind: EntityKind) -> BTreeMap<String, Rect> {
        let names: Vec<&str> = match kind {
            EntityKind::Table => self.schema.tables.iter().map(|t| t.name.as_str()).collect(),
            EntityKind::Enum => self.schema.enums.iter().map(|e| e.name.as_str()).collect(),
        };
        names
            .into_iter()
            .filter_map(|name| Some((name.to_owned(), self.entity_rect(kind, name)?)))
            .collect()
    }

    fn connection_context(&self) -> ConnectionContext<'_> {
        ConnectionContext {
            schema: &self.schema,
            table_positions: self.tables.positions(),
            enum_positions: self.enums.positions(),
            waypoints: &self.control_points,
            style: self.connection_style,
            sizing: &self.config.sizing,
        }
    }

    fn publish_selection(&self) {
        self.bus
            .emit(&DiagramEvent::SelectionChanged(self.selection.clone()));
    }

    fn publish_outcomes(&self) {
        let outcomes = self.adapter.borrow_mut().take_outcomes();
        for outcome in outcomes {
            self.bus.emit(&DiagramEvent::PersistenceCompleted(outcome));
        }
    }
}
