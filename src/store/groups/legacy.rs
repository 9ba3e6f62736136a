// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Decoders for every group layout that has ever been persisted.
//!
//! Current data is an array of `[id, group]` entries. Older builds wrote a plain array of
//! group objects or an object keyed by id. Each shape has its own decoder; all of them
//! produce canonical groups with defaults and minimums applied.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::GroupConfig;
use crate::model::{Group, GroupDraft, GroupId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupShape {
    /// `[[id, group], ...]`
    Entries,
    /// `[{id, ...}, ...]`
    Objects,
    /// `{id: group, ...}`
    Record,
    Empty,
    Unrecognized,
}

pub fn detect_shape(value: &Value) -> GroupShape {
    match value {
        Value::Null => GroupShape::Empty,
        Value::Array(items) => match items.first() {
            None => GroupShape::Empty,
            Some(Value::Array(pair)) if pair.len() == 2 && pair[0].is_string() => GroupShape::Entries,
            Some(Value::Object(_)) => GroupShape::Objects,
            Some(_) => GroupShape::Unrecognized,
        },
        Value::Object(map) if map.is_empty() => GroupShape::Empty,
        Value::Object(map) if map.values().all(Value::is_object) => GroupShape::Record,
        _ => GroupShape::Unrecognized,
    }
}

/// Decodes any known shape. `None` means the value is not group data at all.
pub fn decode_groups(value: &Value, config: &GroupConfig) -> Option<Vec<Group>> {
    match detect_shape(value) {
        GroupShape::Entries => value.as_array().map(|items| decode_entries(items, config)),
        GroupShape::Objects => value.as_array().map(|items| decode_objects(items, config)),
        GroupShape::Record => value.as_object().map(|map| decode_record(map, config)),
        GroupShape::Empty => Some(Vec::new()),
        GroupShape::Unrecognized => {
            warn!("persisted groups have an unrecognized shape");
            None
        }
    }
}

fn decode_entries(items: &[Value], config: &GroupConfig) -> Vec<Group> {
    items
        .iter()
        .filter_map(|item| match item.as_array().map(Vec::as_slice) {
            Some([Value::String(id), body]) => GroupRecord::parse(body)?.into_group(Some(id.as_str()), config),
            _ => {
                warn!("skipping malformed group entry");
                None
            }
        })
        .collect()
}

fn decode_objects(items: &[Value], config: &GroupConfig) -> Vec<Group> {
    items
        .iter()
        .filter_map(|item| GroupRecord::parse(item)?.into_group(None, config))
        .collect()
}

fn decode_record(map: &Map<String, Value>, config: &GroupConfig) -> Vec<Group> {
    map.iter()
        .filter_map(|(id, body)| GroupRecord::parse(body)?.into_group(Some(id.as_str()), config))
        .collect()
}

/// Every field optional, so partially written groups still decode.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupRecord {
    id: Option<String>,
    name: Option<String>,
    color: Option<String>,
    table_names: Option<Vec<String>>,
    enum_names: Option<Vec<String>>,
    x: Option<f64>,
    y: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
}

impl GroupRecord {
    fn parse(value: &Value) -> Option<Self> {
        match Self::deserialize(value) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(error = %err, "skipping malformed group");
                None
            }
        }
    }

    /// An entry or record key takes precedence over an embedded id.
    fn into_group(self, key: Option<&str>, config: &GroupConfig) -> Option<Group> {
        let raw_id = key.map(str::to_owned).or(self.id)?;
        let id = match GroupId::new(raw_id) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "skipping group with invalid id");
                return None;
            }
        };
        let name = self.name.unwrap_or_else(|| id.as_str().to_owned());
        let mut draft = GroupDraft::new(id, name);
        draft.color = self.color;
        draft.table_names = self.table_names.unwrap_or_default();
        draft.enum_names = self.enum_names.unwrap_or_default();
        draft.x = self.x;
        draft.y = self.y;
        draft.width = self.width;
        draft.height = self.height;
        Some(Group::from_draft(draft, config))
    }
}
