// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::dimension::{enum_dimension, table_dimension};
use super::enums::place_enum_columns;
use super::grid::{compute_grid_positions, grid_columns};
use super::layered::{layout_layered, LayeredGraph, LayeredOptions, RankDir};
use crate::config::{DiagramConfig, LayoutMode, SizingConfig};
use crate::model::{Enum, Position, Rect, Ref, Size, Table};

/// Initial top-left positions for every table and enum of a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementPositions {
    pub tables: BTreeMap<String, Position>,
    pub enums: BTreeMap<String, Position>,
}

impl ElementPositions {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.enums.is_empty()
    }
}

/// Computes initial layout for a schema snapshot.
///
/// Tables get a layered layout when at least one relation connects two known tables, and
/// the deterministic grid otherwise (or when the grid mode is configured). Enums, if any,
/// are packed into side columns right of the tables. Refs to unknown tables are ignored.
pub fn compute_elements_positions(
    tables: &[Table],
    refs: &[Ref],
    enums: &[Enum],
    config: &DiagramConfig,
) -> ElementPositions {
    if tables.is_empty() && enums.is_empty() {
        return ElementPositions::default();
    }

    let sizing = &config.sizing;
    let table_sizes = tables
        .iter()
        .map(|table| (table.name.clone(), table_dimension(table, sizing)))
        .collect::<Vec<_>>();

    let mut graph = LayeredGraph::new();
    for (name, size) in &table_sizes {
        graph.add_node(name.clone(), *size);
    }
    let mut skipped = 0usize;
    for r in refs {
        if !graph.add_edge(&r.source().table_name, &r.target().table_name) {
            skipped += 1;
        }
    }
    if skipped > 0 {
        debug!(skipped, "layout ignored self, duplicate or dangling refs");
    }

    let table_positions = if config.layout.mode == LayoutMode::Grid || graph.edge_count() == 0 {
        compute_grid_positions(
            table_sizes.iter().map(|(name, _)| name.as_str()),
            grid_columns(table_sizes.len()),
            sizing,
        )
    } else {
        let layout = &config.layout;
        // Ranks advance along x for LR and along y for TB; neighbours use the other gap.
        let options = if enums.is_empty() {
            LayeredOptions {
                rank_dir: RankDir::LeftRight,
                node_sep: sizing.gap_y * layout.node_sep_factor,
                rank_sep: sizing.gap_x * layout.rank_sep_factor,
                crossing_passes: layout.crossing_passes,
            }
        } else {
            LayeredOptions {
                rank_dir: RankDir::TopBottom,
                node_sep: sizing.gap_x * layout.enum_node_sep_factor,
                rank_sep: sizing.gap_y * layout.enum_rank_sep_factor,
                crossing_passes: layout.crossing_passes,
            }
        };
        centers_to_top_left(layout_layered(&graph, &options).into_centers(), &table_sizes)
    };

    let table_rects = table_sizes
        .iter()
        .filter_map(|(name, size)| {
            table_positions
                .get(name)
                .map(|pos| Rect::from_parts(*pos, *size))
        })
        .collect::<Vec<_>>();
    let enum_sizes = enums
        .iter()
        .map(|enum_| (enum_.name.clone(), enum_dimension(enum_, sizing)))
        .collect::<Vec<_>>();
    let enum_positions = place_enum_columns(&enum_sizes, &table_rects, sizing, &config.layout);

    ElementPositions {
        tables: table_positions,
        enums: enum_positions,
    }
}

/// Grid placement for callers that need the same output for the same table list, whatever
/// the relations.
pub fn compute_tables_positions_deterministic(
    tables: &[Table],
    sizing: &SizingConfig,
) -> BTreeMap<String, Position> {
    compute_grid_positions(
        tables.iter().map(|table| table.name.as_str()),
        grid_columns(tables.len()),
        sizing,
    )
}

fn centers_to_top_left(
    centers: BTreeMap<String, Position>,
    sizes: &[(String, Size)],
) -> BTreeMap<String, Position> {
    let sizes = sizes.iter().map(|(name, size)| (name.as_str(), *size)).collect::<BTreeMap<_, _>>();
    centers
        .into_iter()
        .map(|(name, center)| {
            let size = sizes.get(name.as_str()).copied().unwrap_or_default();
            let top_left = Position::new(center.x - size.width / 2.0, center.y - size.height / 2.0);
            (name, top_left)
        })
        .collect()
}
