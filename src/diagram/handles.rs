// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Horizontal clearance two boxes need before they count as side by side.
pub const INTERSECTION_GAP: f64 = 40.0;

/// Side of an entity box a connection attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl HandleSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Unit vector pointing away from the box.
    pub fn outward(self) -> (f64, f64) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Top => (0.0, -1.0),
            Self::Bottom => (0.0, 1.0),
        }
    }
}

impl fmt::Display for HandleSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        })
    }
}

/// Horizontal extent of a box.
#[derive(Debug, Clone, Copy)]
struct Span {
    left: f64,
    right: f64,
}

impl Span {
    fn from_left(x: f64, width: f64) -> Self {
        Self {
            left: x,
            right: x + width,
        }
    }

    fn from_center(x: f64, width: f64) -> Self {
        Self {
            left: x - width / 2.0,
            right: x + width / 2.0,
        }
    }

    fn center(self) -> f64 {
        (self.left + self.right) / 2.0
    }
}

/// Picks the sides a relation line leaves the source and enters the target by, plus the
/// x coordinate of each attachment.
///
/// `source_x` and `target_x` are normally top-left x coordinates, but positions persisted
/// by older layouts hold box centers. Both readings are tried; when they disagree about
/// which box is on the left, the one with the wider gap wins. Boxes separated by more than
/// [`INTERSECTION_GAP`] connect facing sides; closer or overlapping boxes fall back to
/// comparing centers, ties going right-to-left.
pub fn compute_connection_handle_pos(
    source_x: f64,
    source_w: f64,
    target_x: f64,
    target_w: f64,
) -> (HandleSide, HandleSide, f64, f64) {
    let as_left = (Span::from_left(source_x, source_w), Span::from_left(target_x, target_w));
    let as_center = (
        Span::from_center(source_x, source_w),
        Span::from_center(target_x, target_w),
    );
    let gap_left = as_left.1.left - as_left.0.right;
    let gap_center = as_center.1.left - as_center.0.right;
    let disagree = gap_left.partial_cmp(&0.0) != gap_center.partial_cmp(&0.0);
    let (source, target) = if disagree && gap_center.abs() > gap_left.abs() {
        as_center
    } else {
        as_left
    };

    if source.right + INTERSECTION_GAP < target.left {
        return (HandleSide::Right, HandleSide::Left, source.right, target.left);
    }
    if target.right + INTERSECTION_GAP < source.left {
        return (HandleSide::Left, HandleSide::Right, source.left, target.right);
    }

    if source.center() <= target.center() {
        (HandleSide::Right, HandleSide::Left, source.right, target.left)
    } else {
        (HandleSide::Left, HandleSide::Right, source.left, target.right)
    }
}
