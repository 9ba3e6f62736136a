// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-frame connection geometry for relations and enum links.

use std::collections::BTreeMap;

use crate::config::{ConnectionStyle, SizingConfig};
use crate::layout::{enum_dimension, table_dimension};
use crate::model::{ConnectionKey, ControlPoint, Position, Ref, RefEndpoint, Relation, Schema, Table};

use super::handles::{compute_connection_handle_pos, HandleSide};
use super::path::{bezier_path, step_path, waypoint_path, PathData};
use super::symbols::relation_symbol;

/// Lookup of user-placed waypoints per connection.
pub trait WaypointSource {
    fn waypoints(&self, key: &ConnectionKey) -> &[ControlPoint];
}

impl WaypointSource for BTreeMap<ConnectionKey, Vec<ControlPoint>> {
    fn waypoints(&self, key: &ConnectionKey) -> &[ControlPoint] {
        self.get(key).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Everything needed to lay out the connections of one frame.
#[derive(Clone, Copy)]
pub struct ConnectionContext<'a> {
    pub schema: &'a Schema,
    pub table_positions: &'a BTreeMap<String, Position>,
    pub enum_positions: &'a BTreeMap<String, Position>,
    pub waypoints: &'a dyn WaypointSource,
    pub style: ConnectionStyle,
    pub sizing: &'a SizingConfig,
}

impl ConnectionContext<'_> {
    fn table_origin(&self, name: &str) -> Position {
        self.table_positions.get(name).copied().unwrap_or(Position::UNSET)
    }

    fn enum_origin(&self, name: &str) -> Position {
        self.enum_positions.get(name).copied().unwrap_or(Position::UNSET)
    }

    /// Vertical center of the endpoint's field row, or of the header when the field is
    /// unknown.
    fn row_center_y(&self, table: &Table, endpoint: &RefEndpoint) -> f64 {
        let origin = self.table_origin(&table.name);
        match endpoint.field_name().and_then(|field| table.field_index(field)) {
            Some(idx) => {
                origin.y
                    + self.sizing.header_height
                    + idx as f64 * self.sizing.column_height
                    + self.sizing.column_height / 2.0
            }
            None => origin.y + self.sizing.header_height / 2.0,
        }
    }

    fn styled_path(
        &self,
        source: Position,
        source_side: HandleSide,
        target: Position,
        target_side: HandleSide,
    ) -> PathData {
        match self.style {
            ConnectionStyle::Bezier => bezier_path(source, source_side, target, target_side),
            ConnectionStyle::SmoothStep => step_path(source, source_side, target, target_side),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationConnection {
    pub key: ConnectionKey,
    pub source: Position,
    pub target: Position,
    pub source_side: HandleSide,
    pub target_side: HandleSide,
    pub source_relation: Relation,
    pub target_relation: Relation,
    pub path: PathData,
    pub source_symbol: PathData,
    pub target_symbol: PathData,
}

impl RelationConnection {
    /// Line and both symbols as one path.
    pub fn full_path(&self) -> PathData {
        let mut path = self.path.clone();
        path.append(self.source_symbol.clone());
        path.append(self.target_symbol.clone());
        path
    }
}

/// One drawn line per ref whose tables both exist.
pub fn relation_connections(ctx: &ConnectionContext<'_>) -> Vec<RelationConnection> {
    ctx.schema
        .refs
        .iter()
        .filter_map(|r| relation_connection(ctx, r))
        .collect()
}

fn relation_connection(ctx: &ConnectionContext<'_>, r: &Ref) -> Option<RelationConnection> {
    let source_table = ctx.schema.table(&r.source().table_name)?;
    let target_table = ctx.schema.table(&r.target().table_name)?;

    let source_origin = ctx.table_origin(&source_table.name);
    let target_origin = ctx.table_origin(&target_table.name);
    let (source_side, target_side, source_x, target_x) = compute_connection_handle_pos(
        source_origin.x,
        table_dimension(source_table, ctx.sizing).width,
        target_origin.x,
        table_dimension(target_table, ctx.sizing).width,
    );
    let source = Position::new(source_x, ctx.row_center_y(source_table, r.source()));
    let target = Position::new(target_x, ctx.row_center_y(target_table, r.target()));

    let key = ConnectionKey::from_ref(r);
    let waypoints = ctx
        .waypoints
        .waypoints(&key)
        .iter()
        .map(ControlPoint::position)
        .collect::<Vec<_>>();
    let path = if waypoints.is_empty() {
        ctx.styled_path(source, source_side, target, target_side)
    } else {
        waypoint_path(source, source_side, &waypoints, target, target_side)
    };

    Some(RelationConnection {
        key,
        source,
        target,
        source_side,
        target_side,
        source_relation: r.source().relation,
        target_relation: r.target().relation,
        path,
        source_symbol: relation_symbol(r.source().relation, source_side, source),
        target_symbol: relation_symbol(r.target().relation, target_side, target),
    })
}

/// A table field typed by an enum, linked to that enum's header.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumConnection {
    pub table: String,
    pub field: String,
    pub enum_name: String,
    pub source: Position,
    pub target: Position,
    pub source_side: HandleSide,
    pub target_side: HandleSide,
    pub path: PathData,
}

/// Links every field whose type names an enum of the schema.
///
/// The enum attaches by its facing side at header height; the table side follows from
/// which box center lies further left.
pub fn enum_connections(ctx: &ConnectionContext<'_>) -> Vec<EnumConnection> {
    let mut out = Vec::new();
    for table in &ctx.schema.tables {
        let origin = ctx.table_origin(&table.name);
        let table_width = table_dimension(table, ctx.sizing).width;
        let table_center = origin.x + table_width / 2.0;

        for (idx, field) in table.fields.iter().enumerate() {
            let Some(enum_) = ctx.schema.enum_by_name(&field.type_name) else {
                continue;
            };
            let enum_origin = ctx.enum_origin(&enum_.name);
            let enum_width = enum_dimension(enum_, ctx.sizing).width;
            let enum_center = enum_origin.x + enum_width / 2.0;

            let (source_side, target_side) = if enum_center < table_center {
                (HandleSide::Left, HandleSide::Right)
            } else {
                (HandleSide::Right, HandleSide::Left)
            };
            let source_x = match source_side {
                HandleSide::Left => origin.x,
                _ => origin.x + table_width,
            };
            let target_x = match target_side {
                HandleSide::Right => enum_origin.x + enum_width,
                _ => enum_origin.x,
            };
            let source = Position::new(
                source_x,
                origin.y
                    + ctx.sizing.header_height
                    + idx as f64 * ctx.sizing.column_height
                    + ctx.sizing.column_height / 2.0,
            );
            let target = Position::new(target_x, enum_origin.y + ctx.sizing.enum_header_height / 2.0);

            out.push(EnumConnection {
                table: table.name.clone(),
                field: field.name.clone(),
                enum_name: enum_.name.clone(),
                source,
                target,
                source_side,
                target_side,
                path: ctx.styled_path(source, source_side, target, target_side),
            });
        }
    }
    out
}
