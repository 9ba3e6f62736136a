// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use crate::config::{LayoutConfig, SizingConfig};
use crate::model::{Position, Rect, Size};

/// Places enums in side columns to the right of the laid-out tables.
///
/// Larger enums are placed first, each into the currently shortest column. A new column is
/// opened only when the stacked enums would exceed the column height budget.
pub fn place_enum_columns(
    enums: &[(String, Size)],
    tables: &[Rect],
    sizing: &SizingConfig,
    layout: &LayoutConfig,
) -> BTreeMap<String, Position> {
    if enums.is_empty() {
        return BTreeMap::new();
    }

    let (column_x, top, extent) = if tables.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let right = tables.iter().map(Rect::right).fold(f64::MIN, f64::max);
        let top = tables.iter().map(|rect| rect.y).fold(f64::MAX, f64::min);
        let bottom = tables.iter().map(Rect::bottom).fold(f64::MIN, f64::max);
        (right + sizing.gap_x * layout.enum_column_gap_factor, top, bottom - top)
    };

    let vertical_gap = sizing.gap_y * layout.enum_vertical_gap_factor;
    let max_column_height =
        (extent * layout.enum_column_height_ratio).max(layout.enum_min_column_height);
    let total_height = enums.iter().map(|(_, size)| size.height).sum::<f64>()
        + vertical_gap * (enums.len() - 1) as f64;
    let column_count = if total_height <= max_column_height {
        1
    } else {
        ((total_height / max_column_height).ceil() as usize).clamp(1, enums.len())
    };

    let widest = enums.iter().map(|(_, size)| size.width).fold(0.0, f64::max);
    let column_pitch = widest + sizing.gap_x * layout.enum_column_pitch_factor;

    let mut by_height = enums.iter().collect::<Vec<_>>();
    by_height.sort_by(|a, b| b.1.height.total_cmp(&a.1.height));

    let mut column_heights = vec![0.0f64; column_count];
    let mut positions = BTreeMap::new();
    for (name, size) in by_height {
        let column = column_heights
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let x = column_x + column as f64 * column_pitch;
        let y = top + column_heights[column];
        positions.insert(name.clone(), Position::new(x, y));
        column_heights[column] += size.height + vertical_gap;
    }
    positions
}
