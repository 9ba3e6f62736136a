// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::{debug, info, warn};

use super::persistable::PersistableStore;
use crate::config::DiagramConfig;
use crate::events::{DiagramEvent, EventBus, EventKind, Subscription};
use crate::model::{
    EntityKind, Group, GroupDimensionsPatch, GroupDraft, GroupId, MembershipDelta, Rect, ScopeKey,
};
use crate::persist::SharedAdapter;

pub mod legacy;

#[cfg(test)]
mod tests;

pub use legacy::{decode_groups, detect_shape, GroupShape};

pub const STORE_NAME: &str = "tableGroups";

static NO_MEMBERS: BTreeSet<String> = BTreeSet::new();

/// Per-document groups, keyed by id.
///
/// A table or enum belongs to at most one group. Persisted as an array of `[id, group]`
/// entries under `tableGroups:{scope}`.
#[derive(Debug)]
pub struct GroupStore {
    base: PersistableStore,
    bus: Rc<EventBus>,
    config: Rc<DiagramConfig>,
    scope: Option<ScopeKey>,
    groups: BTreeMap<GroupId, Group>,
}

impl GroupStore {
    pub fn new(adapter: SharedAdapter, bus: Rc<EventBus>, config: Rc<DiagramConfig>) -> Self {
        Self {
            base: PersistableStore::new(STORE_NAME, adapter),
            bus,
            config,
            scope: None,
            groups: BTreeMap::new(),
        }
    }

    pub fn scope(&self) -> Option<&ScopeKey> {
        self.scope.as_ref()
    }

    /// Activates `scope`.
    ///
    /// Resolution order: groups stored under the scope, then groups written before scopes
    /// existed (migrated into the scope and removed from the old key), then
    /// `initial_groups`.
    pub fn switch_to(&mut self, scope: &ScopeKey, initial_groups: &[GroupDraft]) {
        let previous = self.scope.replace(scope.clone());
        if let Some(previous) = previous.filter(|previous| previous != scope) {
            self.base.persist(previous.as_str(), &self.entries());
        }

        if !self.hydrate_scope(scope) {
            self.init_groups(initial_groups);
        }
        self.publish_changed();
    }

    /// Drops in-memory groups and re-reads the active scope.
    pub fn reload_current_scope(&mut self, initial_groups: &[GroupDraft]) {
        let Some(scope) = self.scope.clone() else {
            return;
        };
        self.groups.clear();
        if !self.hydrate_scope(&scope) {
            self.init_groups(initial_groups);
        }
        self.publish_changed();
    }

    /// Replaces every group. Later groups lose names already claimed by earlier ones.
    pub fn init_groups(&mut self, drafts: &[GroupDraft]) {
        let groups = drafts
            .iter()
            .cloned()
            .map(|draft| Group::from_draft(draft, &self.config.groups))
            .collect();
        self.install(groups);
    }

    pub fn save_current_store(&self) {
        if let Some(scope) = &self.scope {
            self.base.persist(scope.as_str(), &self.entries());
        }
    }

    /// Inserts or replaces a group. Its members leave every other group.
    pub fn set_group(&mut self, draft: GroupDraft) -> GroupId {
        let group = Group::from_draft(draft, &self.config.groups);
        let id = group.id.clone();
        for (other_id, other) in self.groups.iter_mut() {
            if *other_id != id {
                other.table_names.retain(|name| !group.table_names.contains(name));
                other.enum_names.retain(|name| !group.enum_names.contains(name));
            }
        }
        self.groups.insert(id.clone(), group);
        self.commit();
        id
    }

    pub fn create_group(&mut self, draft: GroupDraft) -> GroupId {
        self.set_group(draft)
    }

    /// Creates `Group {n}` around the given tables with the next palette color.
    pub fn create_group_from_selection<I, S>(&mut self, tables: I) -> Option<GroupId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (n, id) = (self.groups.len() + 1..)
            .filter_map(|n| GroupId::new(format!("group_{n}")).ok().map(|id| (n, id)))
            .find(|(_, id)| !self.groups.contains_key(id))?;
        let palette = &self.config.groups.palette;
        let mut draft = GroupDraft::new(id, format!("Group {n}"))
            .with_tables(tables)
            .with_rect(Rect::new(50.0, 50.0, 600.0, 400.0));
        draft.color = (!palette.is_empty()).then(|| palette[(n - 1) % palette.len()].clone());
        info!(group = %draft.id, tables = draft.table_names.len(), "group created from selection");
        Some(self.set_group(draft))
    }

    pub fn rename_group(&mut self, id: &GroupId, name: &str, color: Option<String>) -> bool {
        let Some(group) = self.groups.get_mut(id) else {
            return false;
        };
        group.name = name.to_owned();
        if color.is_some() {
            group.color = color;
        }
        self.commit();
        true
    }

    pub fn delete_group(&mut self, id: &GroupId) -> bool {
        if self.groups.remove(id).is_none() {
            return false;
        }
        self.commit();
        true
    }

    pub fn add_table_to_group(&mut self, id: &GroupId, table: &str) -> bool {
        self.add_member(id, EntityKind::Table, table)
    }

    pub fn remove_table_from_group(&mut self, id: &GroupId, table: &str) -> bool {
        self.remove_member(id, EntityKind::Table, table)
    }

    pub fn add_enum_to_group(&mut self, id: &GroupId, enum_name: &str) -> bool {
        self.add_member(id, EntityKind::Enum, enum_name)
    }

    pub fn remove_enum_from_group(&mut self, id: &GroupId, enum_name: &str) -> bool {
        self.remove_member(id, EntityKind::Enum, enum_name)
    }

    /// Removes an entity from whichever group holds it.
    pub fn remove_from_all_groups(&mut self, kind: EntityKind, name: &str) -> bool {
        let mut changed = false;
        for group in self.groups.values_mut() {
            changed |= members_mut(group, kind).remove(name);
        }
        if changed {
            self.commit();
        }
        changed
    }

    /// Applies a partial geometry update, clamped to the minimum size. Persists but does not
    /// publish.
    pub fn set_group_dimensions(&mut self, id: &GroupId, patch: &GroupDimensionsPatch) -> bool {
        let Some(group) = self.groups.get_mut(id) else {
            return false;
        };
        group.apply_dimensions(patch, &self.config.groups);
        self.save_current_store();
        true
    }

    /// Same as [`Self::set_group_dimensions`] without persisting. Used for drag frames.
    pub fn preview_dimensions(&mut self, id: &GroupId, patch: &GroupDimensionsPatch) -> bool {
        let Some(group) = self.groups.get_mut(id) else {
            return false;
        };
        group.apply_dimensions(patch, &self.config.groups);
        true
    }

    /// Re-derives membership from which entity centers lie inside the group.
    ///
    /// Only entities with a box are considered; members without one stay put.
    pub fn recompute_membership(
        &mut self,
        id: &GroupId,
        table_boxes: &BTreeMap<String, Rect>,
        enum_boxes: &BTreeMap<String, Rect>,
    ) -> MembershipDelta {
        let Some(group) = self.groups.get(id) else {
            return MembershipDelta::default();
        };
        let area = group.rect();
        let (added_tables, removed_tables) = containment_diff(area, &group.table_names, table_boxes);
        let (added_enums, removed_enums) = containment_diff(area, &group.enum_names, enum_boxes);
        let delta = MembershipDelta {
            added_tables,
            removed_tables,
            added_enums,
            removed_enums,
        };
        if delta.is_empty() {
            return delta;
        }

        for (kind, added, removed) in [
            (EntityKind::Table, &delta.added_tables, &delta.removed_tables),
            (EntityKind::Enum, &delta.added_enums, &delta.removed_enums),
        ] {
            for name in added {
                self.claim(id, kind, name);
            }
            if let Some(group) = self.groups.get_mut(id) {
                let members = members_mut(group, kind);
                for name in removed {
                    members.remove(name);
                }
            }
        }

        debug!(group = %id, ?delta, "membership recomputed");
        self.save_current_store();
        self.bus.emit(&DiagramEvent::MembershipChanged {
            group_id: id.clone(),
            delta: delta.clone(),
        });
        delta
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> + '_ {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn tables_in_group(&self, id: &str) -> &BTreeSet<String> {
        self.group(id).map_or(&NO_MEMBERS, |group| &group.table_names)
    }

    pub fn enums_in_group(&self, id: &str) -> &BTreeSet<String> {
        self.group(id).map_or(&NO_MEMBERS, |group| &group.enum_names)
    }

    pub fn group_of_table(&self, table: &str) -> Option<&GroupId> {
        self.group_of(EntityKind::Table, table)
    }

    pub fn group_of_enum(&self, enum_name: &str) -> Option<&GroupId> {
        self.group_of(EntityKind::Enum, enum_name)
    }

    pub fn group_of(&self, kind: EntityKind, name: &str) -> Option<&GroupId> {
        self.groups
            .iter()
            .find(|(_, group)| members(group, kind).contains(name))
            .map(|(id, _)| id)
    }

    /// Calls `callback` after every structural group change.
    pub fn subscribe(&self, mut callback: impl FnMut() + 'static) -> Subscription {
        self.bus.subscribe(EventKind::GroupsChanged, move |_| callback())
    }

    fn hydrate_scope(&mut self, scope: &ScopeKey) -> bool {
        let groups_config = &self.config.groups;
        let legacy_scope = self.config.persistence.legacy_group_scope.clone();

        let (direct, fallback) = match self.base.retrieve(scope.as_str()) {
            Some(found) if found.is_legacy() => (None, Some(found.value)),
            Some(found) => (Some(found.value), None),
            None => (None, None),
        };

        if let Some(groups) = direct
            .and_then(|value| decode_groups(&value, groups_config))
            .filter(|groups| !groups.is_empty())
        {
            debug!(scope = %scope, count = groups.len(), "hydrated groups");
            self.install(groups);
            return true;
        }

        if scope.as_str() == legacy_scope {
            return false;
        }
        let legacy = fallback.or_else(|| {
            self.base
                .retrieve_exact(&legacy_scope)
                .map(|found| found.value)
        });
        let Some(groups) = legacy
            .and_then(|value| decode_groups(&value, &self.config.groups))
            .filter(|groups| !groups.is_empty())
        else {
            return false;
        };

        info!(scope = %scope, count = groups.len(), %legacy_scope, "migrating legacy groups");
        self.install(groups);
        self.base.persist(scope.as_str(), &self.entries());
        self.base.clear(&legacy_scope);
        true
    }

    /// Replaces all groups, dropping names already claimed by an earlier group.
    fn install(&mut self, groups: Vec<Group>) {
        let mut claimed_tables = BTreeSet::new();
        let mut claimed_enums = BTreeSet::new();
        self.groups.clear();
        for mut group in groups {
            for (members, claimed) in [
                (&mut group.table_names, &mut claimed_tables),
                (&mut group.enum_names, &mut claimed_enums),
            ] {
                members.retain(|name: &String| {
                    let fresh = claimed.insert(name.clone());
                    if !fresh {
                        warn!(%name, "dropping duplicate group membership");
                    }
                    fresh
                });
            }
            if self.groups.contains_key(&group.id) {
                warn!(group = %group.id, "dropping group with duplicate id");
                continue;
            }
            self.groups.insert(group.id.clone(), group);
        }
    }

    fn add_member(&mut self, id: &GroupId, kind: EntityKind, name: &str) -> bool {
        let changed = self.claim(id, kind, name);
        if changed {
            self.commit();
        }
        changed
    }

    fn remove_member(&mut self, id: &GroupId, kind: EntityKind, name: &str) -> bool {
        let changed = self
            .groups
            .get_mut(id)
            .is_some_and(|group| members_mut(group, kind).remove(name));
        if changed {
            self.commit();
        }
        changed
    }

    /// Moves `name` into group `id`, out of every other group.
    fn claim(&mut self, id: &GroupId, kind: EntityKind, name: &str) -> bool {
        if !self.groups.contains_key(id) {
            return false;
        }
        let mut changed = false;
        for (group_id, group) in self.groups.iter_mut() {
            let members = members_mut(group, kind);
            if group_id == id {
                changed |= members.insert(name.to_owned());
            } else {
                changed |= members.remove(name);
            }
        }
        changed
    }

    fn commit(&self) {
        self.save_current_store();
        self.publish_changed();
    }

    fn publish_changed(&self) {
        self.bus.emit(&DiagramEvent::GroupsChanged);
    }

    fn entries(&self) -> Vec<(&GroupId, &Group)> {
        self.groups.iter().collect()
    }
}

fn members(group: &Group, kind: EntityKind) -> &BTreeSet<String> {
    match kind {
        EntityKind::Table => &group.table_names,
        EntityKind::Enum => &group.enum_names,
    }
}

fn members_mut(group: &mut Group, kind: EntityKind) -> &mut BTreeSet<String> {
    match kind {
        EntityKind::Table => &mut group.table_names,
        EntityKind::Enum => &mut group.enum_names,
    }
}

fn containment_diff(
    area: Rect,
    current: &BTreeSet<String>,
    boxes: &BTreeMap<String, Rect>,
) -> (Vec<String>, Vec<String>) {
    let mut added = Vec::new();
    let mut removed = Vec::new();
    for (name, rect) in boxes {
        match (area.contains(rect.center()), current.contains(name)) {
            (true, false) => added.push(name.clone()),
            (false, true) => removed.push(name.clone()),
            _ => {}
        }
    }
    (added, removed)
}
