// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::model::{Position, Relation};

use super::handles::HandleSide;
use super::path::PathData;

/// Distance from the anchor to the "one" bar.
const BAR_DISTANCE: f64 = 12.0;
/// Distance from the anchor to the apex of the crow's foot.
const FOOT_LENGTH: f64 = 16.0;
const HALF_SPREAD: f64 = 8.0;

/// Cardinality marker drawn on the symbol stub next to `anchor`.
///
/// `One` is a bar across the stub. `Many` is a crow's foot whose toes touch the box edge.
pub fn relation_symbol(relation: Relation, side: HandleSide, anchor: Position) -> PathData {
    let (ux, uy) = side.outward();
    let (px, py) = (-uy, ux);
    let along = |distance: f64, spread: f64| {
        anchor.offset(ux * distance + px * spread, uy * distance + py * spread)
    };

    match relation {
        Relation::One => {
            let mut path = PathData::new(along(BAR_DISTANCE, HALF_SPREAD));
            path.line_to(along(BAR_DISTANCE, -HALF_SPREAD));
            path
        }
        Relation::Many => {
            let apex = along(FOOT_LENGTH, 0.0);
            let mut path = PathData::new(apex);
            path.line_to(along(0.0, HALF_SPREAD))
                .move_to(apex)
                .line_to(anchor)
                .move_to(apex)
                .line_to(along(0.0, -HALF_SPREAD));
            path
        }
    }
}
