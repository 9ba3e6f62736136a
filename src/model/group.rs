// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use super::ids::GroupId;
use crate::config::GroupConfig;

/// A user-defined rectangle that owns a set of tables and enums.
///
/// Membership lists have set semantics. Width and height never drop below the configured
/// minimums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub table_names: BTreeSet<String>,
    #[serde(default)]
    pub enum_names: BTreeSet<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Group {
    /// Builds a canonical group from a partial definition.
    pub fn from_draft(draft: GroupDraft, config: &GroupConfig) -> Self {
        Self {
            id: draft.id,
            name: draft.name,
            color: draft.color,
            table_names: draft.table_names.into_iter().collect(),
            enum_names: draft.enum_names.into_iter().collect(),
            x: draft.x.unwrap_or(0.0),
            y: draft.y.unwrap_or(0.0),
            width: draft.width.unwrap_or(config.default_width).max(config.min_width),
            height: draft.height.unwrap_or(config.default_height).max(config.min_height),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn apply_dimensions(&mut self, patch: &GroupDimensionsPatch, config: &GroupConfig) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width.max(config.min_width);
        }
        if let Some(height) = patch.height {
            self.height = height.max(config.min_height);
        }
    }
}

/// A group definition whose geometry may be missing, as produced by the schema parser or
/// a "create group" action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDraft {
    pub id: GroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub table_names: Vec<String>,
    #[serde(default)]
    pub enum_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl GroupDraft {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: None,
            table_names: Vec::new(),
            enum_names: Vec::new(),
            x: None,
            y: None,
            width: None,
            height: None,
        }
    }

    /// Converts a schema-level table group into a draft.
    ///
    /// Ids follow `group_{index}_{name}` with whitespace runs replaced by `_`, so the same
    /// schema always yields the same ids.
    pub fn from_table_group(
        index: usize,
        name: &str,
        tables: impl IntoIterator<Item = String>,
        color: Option<String>,
    ) -> Option<Self> {
        let slug = name.split_whitespace().collect::<Vec<_>>().join("_");
        let id = GroupId::new(format!("group_{index}_{slug}")).ok()?;
        let mut draft = Self::new(id, name);
        draft.color = color;
        draft.table_names = tables.into_iter().collect();
        Some(draft)
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_names = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.x = Some(rect.x);
        self.y = Some(rect.y);
        self.width = Some(rect.width);
        self.height = Some(rect.height);
        self
    }
}

/// Partial geometry update for a group; unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupDimensionsPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl GroupDimensionsPatch {
    pub fn origin(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn rect(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
        }
    }
}

/// Membership changes produced by a containment recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub added_tables: Vec<String>,
    pub removed_tables: Vec<String>,
    pub added_enums: Vec<String>,
    pub removed_enums: Vec<String>,
}

impl MembershipDelta {
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.added_enums.is_empty()
            && self.removed_enums.is_empty()
    }
}
