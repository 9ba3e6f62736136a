// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use crate::config::SizingConfig;
use crate::model::{Position, Size};

/// Column count for `count` grid cells: at least three, otherwise close to square.
pub fn grid_columns(count: usize) -> usize {
    let mut cols = 1usize;
    while cols.saturating_mul(cols) < count {
        cols += 1;
    }
    cols.max(3)
}

/// Default cell of the grid: the minimum table width by a header plus five rows.
pub fn grid_cell(sizing: &SizingConfig) -> Size {
    Size::new(
        sizing.table_min_width,
        sizing.header_height + 5.0 * sizing.column_height,
    )
}

/// Row-major grid placement with a fixed pitch.
///
/// Entry `i` lands in column `i % cols`, row `i / cols`, at
/// `x = col * (min_width + gap_x)` and `y = row * (header + 5 * column_height + gap_y)`.
/// Box sizes play no part, so a table taller or wider than the default cell may reach into
/// its neighbour's cell.
pub fn compute_grid_positions<'a>(
    names: impl IntoIterator<Item = &'a str>,
    cols: usize,
    sizing: &SizingConfig,
) -> BTreeMap<String, Position> {
    let cols = cols.max(1);
    let cell = grid_cell(sizing);
    let pitch_x = cell.width + sizing.gap_x;
    let pitch_y = cell.height + sizing.gap_y;

    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let (col, row) = (idx % cols, idx / cols);
            (
                name.to_owned(),
                Position::new(col as f64 * pitch_x, row as f64 * pitch_y),
            )
        })
        .collect()
}
