// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Deterministic schema fixtures (no RNG).

use std::collections::BTreeMap;

use erdsketch::model::{Enum, Field, Position, Ref, RefEndpoint, Relation, Schema, Table};

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub const ALL: [Case; 3] = [Case::Small, Case::Medium, Case::Large];

    pub fn id(self) -> &'static str {
        match self {
            Case::Small => "small",
            Case::Medium => "medium",
            Case::Large => "large",
        }
    }

    fn table_count(self) -> usize {
        match self {
            Case::Small => 12,
            Case::Medium => 60,
            Case::Large => 200,
        }
    }
}

/// Tables in clusters of eight: each table points at the previous one in its cluster, and
/// every third table also points at the first table of the previous cluster. One enum per
/// cluster is referenced by a `status` column.
pub fn schema(case: Case) -> Schema {
    let count = case.table_count();
    let clusters = count.div_ceil(8);

    let enums = (0..clusters)
        .map(|cluster| Enum::new(format!("status_{cluster}"), ["draft", "active", "archived"]))
        .collect::<Vec<_>>();

    let tables = (0..count)
        .map(|idx| {
            let mut fields = vec![
                Field::new("id", "bigint"),
                Field::new("parent_id", "bigint"),
                Field::new("anchor_id", "bigint"),
                Field::new("created_at", "timestamp"),
            ];
            if idx % 4 == 0 {
                fields.push(Field::new("status", format!("status_{}", idx / 8)));
            }
            Table {
                name: format!("table_{idx:03}"),
                fields,
                note: None,
            }
        })
        .collect::<Vec<_>>();

    let mut refs = Vec::new();
    for idx in 0..count {
        if idx % 8 != 0 {
            refs.push(link(idx - 1, idx, "parent_id"));
        }
        if idx % 3 == 0 && idx >= 8 {
            refs.push(link((idx / 8 - 1) * 8, idx, "anchor_id"));
        }
    }

    Schema {
        tables,
        enums,
        refs,
        groups: Vec::new(),
    }
}

fn link(one: usize, many: usize, field: &str) -> Ref {
    Ref::new(
        RefEndpoint::new(format!("table_{one:03}"), "id", Relation::One),
        RefEndpoint::new(format!("table_{many:03}"), field, Relation::Many),
    )
}

pub fn checksum_positions(positions: &BTreeMap<String, Position>) -> u64 {
    positions.iter().fold(0u64, |acc, (name, position)| {
        acc.wrapping_mul(131)
            .wrapping_add(name.len() as u64)
            .wrapping_add(position.x.to_bits())
            .wrapping_add(position.y.to_bits().rotate_left(7))
    })
}
