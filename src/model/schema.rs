// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::group::GroupDraft;

/// A parsed schema snapshot, rebuilt by the parser on every render cycle.
///
/// Names are unique per entity kind. Nothing here is validated: refs may point at tables
/// that do not exist, and every consumer skips such refs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub enums: Vec<Enum>,
    #[serde(default)]
    pub refs: Vec<Ref>,
    #[serde(default)]
    pub groups: Vec<GroupDraft>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&Enum> {
        self.enums.iter().find(|enum_| enum_.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.enums.is_empty()
    }

    /// Structural identity of the schema: entity names and the table pairs joined by refs.
    ///
    /// Field edits, notes and group definitions do not change the fingerprint.
    pub fn fingerprint(&self) -> StructureFingerprint {
        let tables = self.tables.iter().map(|table| table.name.clone()).collect();
        let enums = self.enums.iter().map(|enum_| enum_.name.clone()).collect();
        let links = self
            .refs
            .iter()
            .map(|r| {
                let [a, b] = &r.endpoints;
                if a.table_name <= b.table_name {
                    (a.table_name.clone(), b.table_name.clone())
                } else {
                    (b.table_name.clone(), a.table_name.clone())
                }
            })
            .collect();
        StructureFingerprint {
            tables,
            enums,
            links,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureFingerprint {
    tables: BTreeSet<String>,
    enums: BTreeSet<String>,
    links: BTreeSet<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(Field::new(name, type_name));
        self
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pk: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Field {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            pk: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    #[serde(default)]
    pub values: Vec<EnumValue>,
}

impl Enum {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|value| EnumValue {
                    name: value.into(),
                    note: None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    pub endpoints: [RefEndpoint; 2],
}

impl Ref {
    pub fn new(source: RefEndpoint, target: RefEndpoint) -> Self {
        Self {
            endpoints: [source, target],
        }
    }

    pub fn source(&self) -> &RefEndpoint {
        &self.endpoints[0]
    }

    pub fn target(&self) -> &RefEndpoint {
        &self.endpoints[1]
    }

    /// The table on the "1" side of the relation, falling back to the target table.
    pub fn relation_owner(&self) -> &str {
        if self.source().relation == Relation::One {
            &self.source().table_name
        } else {
            &self.target().table_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefEndpoint {
    pub table_name: String,
    #[serde(default)]
    pub field_names: Vec<String>,
    pub relation: Relation,
}

impl RefEndpoint {
    pub fn new(table_name: impl Into<String>, field_name: impl Into<String>, relation: Relation) -> Self {
        Self {
            table_name: table_name.into(),
            field_names: vec![field_name.into()],
            relation,
        }
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field_names.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "*")]
    Many,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("1"),
            Self::Many => f.write_str("*"),
        }
    }
}

/// Tables and enums share the same positioning machinery but live in separate stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Table,
    Enum,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Enum => f.write_str("enum"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Ref, RefEndpoint, Relation, Schema, Table};

    #[test]
    fn parses_parser_output() {
        let json = r#"{
            "tables": [
                { "name": "users", "fields": [{ "name": "id", "type": "int", "pk": true }] },
                { "name": "posts", "fields": [{ "name": "user_id", "type": "int" }] }
            ],
            "enums": [{ "name": "status", "values": [{ "name": "draft" }] }],
            "refs": [{
                "endpoints": [
                    { "tableName": "users", "fieldNames": ["id"], "relation": "1" },
                    { "tableName": "posts", "fieldNames": ["user_id"], "relation": "*" }
                ]
            }]
        }"#;

        let schema: Schema = serde_json::from_str(json).expect("schema");
        assert_eq!(schema.tables.len(), 2);
        assert!(schema.tables[0].fields[0].pk);
        assert_eq!(schema.refs[0].source().relation, Relation::One);
        assert_eq!(schema.refs[0].relation_owner(), "users");
        assert!(schema.groups.is_empty());
    }

    #[test]
    fn relation_owner_falls_back_to_target() {
        let r = Ref::new(
            RefEndpoint::new("posts", "user_id", Relation::Many),
            RefEndpoint::new("users", "id", Relation::One),
        );
        assert_eq!(r.relation_owner(), "users");
    }

    #[test]
    fn fingerprint_ignores_field_changes_and_ref_direction() {
        let base = Schema {
            tables: vec![Table::new("a").with_field("id", "int"), Table::new("b")],
            refs: vec![Ref::new(
                RefEndpoint::new("a", "id", Relation::One),
                RefEndpoint::new("b", "a_id", Relation::Many),
            )],
            ..Schema::default()
        };

        let mut edited = base.clone();
        edited.tables[0] = Table::new("a").with_field("id", "bigint").with_field("x", "text");
        edited.refs[0] = Ref::new(
            RefEndpoint::new("b", "a_id", Relation::Many),
            RefEndpoint::new("a", "id", Relation::One),
        );
        assert_eq!(base.fingerprint(), edited.fingerprint());

        let mut grown = base.clone();
        grown.tables.push(Table::new("c"));
        assert_ne!(base.fingerprint(), grown.fingerprint());
    }
}
