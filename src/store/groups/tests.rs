// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rstest::{fixture, rstest};
use serde_json::{json, Value};

use super::GroupStore;
use crate::config::DiagramConfig;
use crate::events::{EventBus, EventKind};
use crate::model::fixtures::scope;
use crate::model::{GroupDimensionsPatch, GroupDraft, GroupId, Rect};
use crate::persist::{PersistenceAdapter, SharedAdapter};

struct TestCtx {
    adapter: SharedAdapter,
    bus: Rc<EventBus>,
    store: GroupStore,
}

impl TestCtx {
    fn with_snapshot(entries: &[(&str, Value)]) -> Self {
        let snapshot = entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect::<BTreeMap<_, _>>();
        let adapter = PersistenceAdapter::default()
            .with_snapshot(snapshot)
            .into_shared();
        let bus = EventBus::new();
        let store = GroupStore::new(adapter.clone(), bus.clone(), Rc::new(DiagramConfig::default()));
        Self { adapter, bus, store }
    }

    fn persisted(&self, key: &str) -> Option<Value> {
        self.adapter.borrow_mut().get_item_exact(key).map(|found| found.value)
    }

    fn count_events(&self, kind: EventKind) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        self.bus
            .subscribe(kind, move |_| sink.set(sink.get() + 1))
            .detach();
        count
    }
}

#[fixture]
fn ctx() -> TestCtx {
    TestCtx::with_snapshot(&[])
}

fn gid(value: &str) -> GroupId {
    GroupId::new(value).expect("group id")
}

fn draft(id: &str, tables: &[&str]) -> GroupDraft {
    GroupDraft::new(gid(id), id.to_uppercase()).with_tables(tables.iter().copied())
}

fn legacy_groups() -> Value {
    json!([["g1", {"id": "g1", "name": "Core", "tableNames": ["users"], "x": 10, "y": 20, "width": 500, "height": 400}]])
}

#[rstest]
fn initial_groups_apply_when_nothing_is_persisted(mut ctx: TestCtx) {
    ctx.store.switch_to(&scope("doc"), &[draft("g1", &["users"])]);

    let group = ctx.store.group("g1").expect("group");
    assert_eq!((group.width, group.height), (400.0, 300.0));
    assert_eq!(ctx.store.group_of_table("users"), Some(&gid("g1")));
}

#[rstest]
fn init_groups_enforces_exclusivity_first_wins(mut ctx: TestCtx) {
    ctx.store.init_groups(&[draft("a", &["users", "posts"]), draft("b", &["posts", "tags"])]);

    assert_eq!(ctx.store.group_of_table("posts"), Some(&gid("a")));
    assert!(!ctx.store.tables_in_group("b").contains("posts"));
    assert!(ctx.store.tables_in_group("b").contains("tags"));
}

#[test]
fn legacy_groups_migrate_once_into_the_new_scope() {
    let mut ctx = TestCtx::with_snapshot(&[("tableGroups:none", legacy_groups())]);

    ctx.store.switch_to(&scope("file:///a.dbml"), &[]);
    assert_eq!(ctx.store.len(), 1);
    assert!(ctx.persisted("tableGroups:file:///a.dbml").is_some());
    assert!(ctx.persisted("tableGroups:none").is_none(), "legacy key cleared");

    let mut again = GroupStore::new(ctx.adapter.clone(), ctx.bus.clone(), Rc::new(DiagramConfig::default()));
    again.switch_to(&scope("file:///a.dbml"), &[]);
    assert_eq!(again.group("g1"), ctx.store.group("g1"));
    assert_eq!(ctx.persisted("tableGroups:file:///a.dbml"), Some(serde_json::to_value(again.entries()).unwrap()));
}

#[test]
fn legacy_groups_are_found_through_the_adapter_fallback() {
    let mut ctx = TestCtx::with_snapshot(&[("tableGroups:none", legacy_groups())]);
    ctx.adapter
        .borrow_mut()
        .register_legacy_fallback("tableGroups:", "tableGroups:none");

    ctx.store.switch_to(&scope("doc"), &[draft("ignored", &[])]);
    assert!(ctx.store.group("g1").is_some());
    assert!(ctx.store.group("ignored").is_none());
    assert!(ctx.persisted("tableGroups:none").is_none());
}

#[test]
fn scoped_groups_win_over_legacy_data() {
    let mut ctx = TestCtx::with_snapshot(&[
        ("tableGroups:none", legacy_groups()),
        ("tableGroups:doc", json!([["mine", {"id": "mine", "name": "Mine", "tableNames": []}]])),
    ]);
    ctx.store.switch_to(&scope("doc"), &[]);
    assert!(ctx.store.group("mine").is_some());
    assert!(ctx.store.group("g1").is_none());
    assert!(ctx.persisted("tableGroups:none").is_some(), "legacy untouched");
}

#[test]
fn older_object_shapes_hydrate() {
    let mut ctx = TestCtx::with_snapshot(&[(
        "tableGroups:doc",
        json!({"g1": {"name": "Record", "tableNames": ["users"]}}),
    )]);
    ctx.store.switch_to(&scope("doc"), &[]);
    assert_eq!(ctx.store.group("g1").map(|g| g.name.as_str()), Some("Record"));
}

#[rstest]
fn switching_scopes_persists_the_outgoing_groups(mut ctx: TestCtx) {
    ctx.store.switch_to(&scope("a"), &[draft("g1", &["users"])]);
    ctx.store.switch_to(&scope("b"), &[]);
    assert!(ctx.store.is_empty());

    ctx.store.switch_to(&scope("a"), &[]);
    assert!(ctx.store.group("g1").is_some());
}

#[rstest]
fn adding_a_table_moves_it_out_of_other_groups(mut ctx: TestCtx) {
    ctx.store.switch_to(&scope("doc"), &[draft("a", &["users"]), draft("b", &[])]);
    let changes = ctx.count_events(EventKind::GroupsChanged);

    assert!(ctx.store.add_table_to_group(&gid("b"), "users"));
    assert_eq!(ctx.store.group_of_table("users"), Some(&gid("b")));
    assert!(ctx.store.tables_in_group("a").is_empty());
    assert_eq!(changes.get(), 1);

    assert!(!ctx.store.add_table_to_group(&gid("b"), "users"), "idempotent");
    assert_eq!(changes.get(), 1, "no event without change");
    assert!(!ctx.store.add_table_to_group(&gid("missing"), "users"));
}

#[rstest]
fn enum_membership_is_exclusive_too(mut ctx: TestCtx) {
    ctx.store.switch_to(&scope("doc"), &[draft("a", &[]), draft("b", &[])]);
    ctx.store.add_enum_to_group(&gid("a"), "status");
    ctx.store.add_enum_to_group(&gid("b"), "status");
    assert_eq!(ctx.store.group_of_enum("status"), Some(&gid("b")));
    assert!(ctx.store.remove_enum_from_group(&gid("b"), "status"));
    assert!(ctx.store.group_of_enum("status").is_none());
}

#[rstest]
fn set_group_claims_members_and_persists(mut ctx: TestCtx) {
    ctx.store.switch_to(&scope("doc"), &[draft("a", &["users", "posts"])]);
    ctx.store.set_group(draft("b", &["posts"]));

    assert_eq!(ctx.store.group_of_table("posts"), Some(&gid("b")));
    let stored = ctx.persisted("tableGroups:doc").expect("persisted");
    assert_eq!(stored.as_array().map(Vec::len), Some(2));
}

#[rstest]
fn selection_groups_get_sequential_names_and_palette_colors(mut ctx: TestCtx) {
    ctx.store.switch_to(&scope("doc"), &[draft("a", &["users"])]);

    let id = ctx.store.create_group_from_selection(["users", "posts"]).expect("id");
    assert_eq!(id.as_str(), "group_2");
    let group = ctx.store.group(id.as_str()).expect("group");
    assert_eq!(group.name, "Group 2");
    assert_eq!(group.color.as_deref(), Some("#10b981"));
    assert_eq!(group.rect(), Rect::new(50.0, 50.0, 600.0, 400.0));
    assert!(ctx.store.tables_in_group("a").is_empty());
}

#[rstest]
fn rename_and_delete(mut ctx: TestCtx) {
    ctx.store.switch_to(&scope("doc"), &[draft("a", &[])]);
    assert!(ctx.store.rename_group(&gid("a"), "Accounts", Some("#000000".to_owned())));
    let group = ctx.store.group("a").expect("group");
    assert_eq!((group.name.as_str(), group.color.as_deref()), ("Accounts", Some("#000000")));

    assert!(ctx.store.delete_group(&gid("a")));
    assert!(!ctx.store.delete_group(&gid("a")));
    assert_eq!(ctx.persisted("tableGroups:doc"), Some(json!([])));
}

#[rstest]
fn dimensions_are_clamped_and_persisted(mut ctx: TestCtx) {
    ctx.store.switch_to(&scope("doc"), &[draft("a", &[])]);
    ctx.store.set_group_dimensions(
        &gid("a"),
        &GroupDimensionsPatch::rect(Rect::new(1.0, 2.0, 10.0, 10.0)),
    );
    let group = ctx.store.group("a").expect("group");
    assert_eq!(group.rect(), Rect::new(1.0, 2.0, 200.0, 150.0));
    let stored = ctx.persisted("tableGroups:doc").expect("persisted");
    assert_eq!(stored[0][1]["width"], json!(200.0));
}

#[rstest]
fn membership_follows_contained_centers(mut ctx: TestCtx) {
    let area = Rect::new(0.0, 0.0, 500.0, 500.0);
    ctx.store.switch_to(
        &scope("doc"),
        &[
            draft("g", &["outside_now"]).with_rect(area),
            draft("other", &["inside"]),
        ],
    );
    let published = ctx.count_events(EventKind::MembershipChanged);

    let tables = BTreeMap::from([
        ("inside".to_owned(), Rect::new(100.0, 100.0, 100.0, 100.0)),
        ("outside_now".to_owned(), Rect::new(900.0, 900.0, 100.0, 100.0)),
        ("edge".to_owned(), Rect::new(450.0, 450.0, 100.0, 100.0)),
    ]);
    let enums = BTreeMap::from([("status".to_owned(), Rect::new(10.0, 10.0, 20.0, 20.0))]);

    let delta = ctx.store.recompute_membership(&gid("g"), &tables, &enums);
    assert_eq!(delta.added_tables, vec!["edge".to_owned(), "inside".to_owned()]);
    assert_eq!(delta.removed_tables, vec!["outside_now".to_owned()]);
    assert_eq!(delta.added_enums, vec!["status".to_owned()]);
    assert_eq!(ctx.store.group_of_table("inside"), Some(&gid("g")));
    assert!(ctx.store.tables_in_group("other").is_empty());
    assert_eq!(published.get(), 1);

    let unchanged = ctx.store.recompute_membership(&gid("g"), &tables, &enums);
    assert!(unchanged.is_empty());
    assert_eq!(published.get(), 1);
}

#[rstest]
fn subscribe_reports_structural_changes(mut ctx: TestCtx) {
    let calls = Rc::new(Cell::new(0));
    let sink = calls.clone();
    let sub = ctx.store.subscribe(move || sink.set(sink.get() + 1));

    ctx.store.switch_to(&scope("doc"), &[]);
    ctx.store.create_group(draft("a", &[]));
    assert_eq!(calls.get(), 2);

    drop(sub);
    ctx.store.delete_group(&gid("a"));
    assert_eq!(calls.get(), 2);
    assert_eq!(ctx.bus.subscriber_count(), 0);
}
