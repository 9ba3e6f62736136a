// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! Schema snapshots come from the external parser. Positions, groups and control points are
//! the user-owned state that the stores persist per scope.

pub mod control_point;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod geometry;
pub mod group;
pub mod ids;
pub mod schema;

pub use control_point::{ConnectionKey, ControlPoint};
pub use geometry::{Position, Rect, Size};
pub use group::{Group, GroupDimensionsPatch, GroupDraft, MembershipDelta};
pub use ids::{ControlPointId, GroupId, Id, IdError, ScopeKey};
pub use schema::{
    EntityKind, Enum, EnumValue, Field, Ref, RefEndpoint, Relation, Schema, StructureFingerprint,
    Table,
};
