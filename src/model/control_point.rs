// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

use super::geometry::Position;
use super::ids::ControlPointId;
use super::schema::Ref;

/// Identifies one drawn relation.
///
/// Both endpoints and the relation owner are part of the key, so two refs between the same
/// tables through different fields keep separate waypoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionKey {
    pub source_table: String,
    pub source_field: String,
    pub target_table: String,
    pub target_field: String,
    pub relation_owner: String,
}

impl ConnectionKey {
    pub fn from_ref(r: &Ref) -> Self {
        Self {
            source_table: r.source().table_name.clone(),
            source_field: r.source().field_name().unwrap_or_default().to_owned(),
            target_table: r.target().table_name.clone(),
            target_field: r.target().field_name().unwrap_or_default().to_owned(),
            relation_owner: r.relation_owner().to_owned(),
        }
    }
}

/// A user-placed waypoint on a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub id: ControlPointId,
    pub x: f64,
    pub y: f64,
}

impl ControlPoint {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}
