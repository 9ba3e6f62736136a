// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::schema::{Enum, Field, Ref, RefEndpoint, Relation, Schema, Table};
use super::ScopeKey;

pub(crate) fn scope(value: &str) -> ScopeKey {
    ScopeKey::new(value).expect("scope key")
}

pub(crate) fn table(name: &str, fields: &[(&str, &str)]) -> Table {
    Table {
        name: name.to_owned(),
        fields: fields.iter().map(|(name, ty)| Field::new(*name, *ty)).collect(),
        note: None,
    }
}

pub(crate) fn one_to_many(one: (&str, &str), many: (&str, &str)) -> Ref {
    Ref::new(
        RefEndpoint::new(one.0, one.1, Relation::One),
        RefEndpoint::new(many.0, many.1, Relation::Many),
    )
}

/// users <- posts <- comments, with a status enum on posts.
pub(crate) fn blog_schema() -> Schema {
    Schema {
        tables: vec![
            table("users", &[("id", "int"), ("email", "varchar")]),
            table(
                "posts",
                &[("id", "int"), ("user_id", "int"), ("status", "post_status")],
            ),
            table("comments", &[("id", "int"), ("post_id", "int"), ("body", "text")]),
        ],
        enums: vec![Enum::new("post_status", ["draft", "published", "archived"])],
        refs: vec![
            one_to_many(("users", "id"), ("posts", "user_id")),
            one_to_many(("posts", "id"), ("comments", "post_id")),
        ],
        groups: Vec::new(),
    }
}

/// Tables without any relation, used for the grid fallback.
pub(crate) fn unrelated_tables(count: usize) -> Schema {
    Schema {
        tables: (0..count)
            .map(|idx| table(&format!("t{idx}"), &[("id", "int")]))
            .collect(),
        ..Schema::default()
    }
}

/// a -> b -> c -> a plus a disconnected d.
pub(crate) fn cyclic_schema() -> Schema {
    Schema {
        tables: vec![
            table("a", &[("id", "int"), ("c_id", "int")]),
            table("b", &[("id", "int"), ("a_id", "int")]),
            table("c", &[("id", "int"), ("b_id", "int")]),
            table("d", &[("id", "int")]),
        ],
        refs: vec![
            one_to_many(("a", "id"), ("b", "a_id")),
            one_to_many(("b", "id"), ("c", "b_id")),
            one_to_many(("c", "id"), ("a", "c_id")),
        ],
        ..Schema::default()
    }
}
