// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! SVG-style path construction for relation lines.
//!
//! Every path starts at the handle anchor, runs a short straight stub out to
//! [`symbol_offset`] so the relation symbol sits on a straight segment, and mirrors that
//! stub at the target end.

use std::fmt;

use crate::model::Position;

use super::handles::HandleSide;

/// Length of the straight stub carrying the relation symbol.
pub const SYMBOL_OFFSET: f64 = 20.0;
pub const DEFAULT_CURVATURE: f64 = 0.5;
pub const STEP_CORNER_RADIUS: f64 = 35.0;
pub const STEP_DISTANCE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Position),
    LineTo(Position),
    QuadTo { control: Position, to: Position },
    CubicTo { c1: Position, c2: Position, to: Position },
}

impl PathCommand {
    pub fn end(&self) -> Position {
        match *self {
            Self::MoveTo(to) | Self::LineTo(to) => to,
            Self::QuadTo { to, .. } | Self::CubicTo { to, .. } => to,
        }
    }
}

struct Pt(Position);

impl fmt::Display for Pt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.0.x, self.0.y)
    }
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MoveTo(to) => write!(f, "M{}", Pt(to)),
            Self::LineTo(to) => write!(f, "L{}", Pt(to)),
            Self::QuadTo { control, to } => write!(f, "Q{} {}", Pt(control), Pt(to)),
            Self::CubicTo { c1, c2, to } => write!(f, "C{} {} {}", Pt(c1), Pt(c2), Pt(to)),
        }
    }
}

/// An ordered list of path commands. `Display` renders SVG path syntax.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathData {
    commands: Vec<PathCommand>,
}

impl PathData {
    pub fn new(start: Position) -> Self {
        Self {
            commands: vec![PathCommand::MoveTo(start)],
        }
    }

    pub fn move_to(&mut self, to: Position) -> &mut Self {
        self.commands.push(PathCommand::MoveTo(to));
        self
    }

    pub fn line_to(&mut self, to: Position) -> &mut Self {
        self.commands.push(PathCommand::LineTo(to));
        self
    }

    pub fn quad_to(&mut self, control: Position, to: Position) -> &mut Self {
        self.commands.push(PathCommand::QuadTo { control, to });
        self
    }

    pub fn cubic_to(&mut self, c1: Position, c2: Position, to: Position) -> &mut Self {
        self.commands.push(PathCommand::CubicTo { c1, c2, to });
        self
    }

    /// Appends `other` as separate subpaths.
    pub fn append(&mut self, other: PathData) {
        self.commands.extend(other.commands);
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn start(&self) -> Option<Position> {
        self.commands.first().map(PathCommand::end)
    }

    pub fn end(&self) -> Option<Position> {
        self.commands.last().map(PathCommand::end)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Display for PathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, command) in self.commands.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{command}")?;
        }
        Ok(())
    }
}

/// The end of the symbol stub leaving `anchor` through `side`.
pub fn symbol_offset(side: HandleSide, anchor: Position) -> Position {
    let (ux, uy) = side.outward();
    anchor.offset(ux * SYMBOL_OFFSET, uy * SYMBOL_OFFSET)
}

fn control_offset(distance: f64, curvature: f64) -> f64 {
    if distance >= 0.0 {
        0.5 * distance
    } else {
        curvature * 25.0 * (-distance).sqrt()
    }
}

fn control_point(side: HandleSide, from: Position, toward: Position, curvature: f64) -> Position {
    match side {
        HandleSide::Left => from.offset(-control_offset(from.x - toward.x, curvature), 0.0),
        HandleSide::Right => from.offset(control_offset(toward.x - from.x, curvature), 0.0),
        HandleSide::Top => from.offset(0.0, -control_offset(from.y - toward.y, curvature)),
        HandleSide::Bottom => from.offset(0.0, control_offset(toward.y - from.y, curvature)),
    }
}

/// Cubic curve between two anchors. Controls are taken from the anchors, so a target
/// behind the source still bows outward instead of folding back through the box.
pub fn bezier_path(
    source: Position,
    source_side: HandleSide,
    target: Position,
    target_side: HandleSide,
) -> PathData {
    let c1 = control_point(source_side, source, target, DEFAULT_CURVATURE);
    let c2 = control_point(target_side, target, source, DEFAULT_CURVATURE);

    let mut path = PathData::new(source);
    path.line_to(symbol_offset(source_side, source))
        .cubic_to(c1, c2, symbol_offset(target_side, target))
        .line_to(target);
    path
}

/// Orthogonal route with rounded corners.
///
/// The route steps [`STEP_DISTANCE`] away from the source, turns once toward the target
/// row (or column), and turns again into the target stub. Corner radii shrink to half of
/// the shorter adjacent segment.
pub fn step_path(
    source: Position,
    source_side: HandleSide,
    target: Position,
    target_side: HandleSide,
) -> PathData {
    let start = symbol_offset(source_side, source);
    let end = symbol_offset(target_side, target);

    let (ux, uy) = source_side.outward();
    let step = start.offset(ux * STEP_DISTANCE, uy * STEP_DISTANCE);

    let corners = if source_side.is_horizontal() {
        let corner_x = if target_side.is_horizontal() { step.x } else { end.x };
        [Position::new(corner_x, start.y), Position::new(corner_x, end.y)]
    } else {
        let corner_y = if target_side.is_horizontal() { end.y } else { step.y };
        [Position::new(start.x, corner_y), Position::new(end.x, corner_y)]
    };

    let mut path = PathData::new(source);
    path.line_to(start);
    round_polyline(&mut path, &simplify([start, corners[0], corners[1], end]));
    path.line_to(target);
    path
}

/// Straight segments from the source stub through every waypoint into the target stub.
pub fn waypoint_path(
    source: Position,
    source_side: HandleSide,
    waypoints: &[Position],
    target: Position,
    target_side: HandleSide,
) -> PathData {
    let mut path = PathData::new(source);
    path.line_to(symbol_offset(source_side, source));
    for point in waypoints {
        path.line_to(*point);
    }
    path.line_to(symbol_offset(target_side, target)).line_to(target);
    path
}

/// Drops repeated points and points in the middle of a straight run.
fn simplify(points: [Position; 4]) -> Vec<Position> {
    let mut out: Vec<Position> = Vec::with_capacity(points.len());
    for point in points {
        if out.last() == Some(&point) {
            continue;
        }
        if let [.., a, b] = out.as_slice() {
            let collinear = (a.x == b.x && b.x == point.x) || (a.y == b.y && b.y == point.y);
            if collinear {
                out.pop();
            }
        }
        out.push(point);
    }
    out
}

fn distance(a: Position, b: Position) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Toward `to` from `from` by `amount`.
fn toward(from: Position, to: Position, amount: f64) -> Position {
    let length = distance(from, to);
    if length == 0.0 {
        return from;
    }
    let ux = (to.x - from.x) / length;
    let uy = (to.y - from.y) / length;
    from.offset(ux * amount, uy * amount)
}

/// Emits `points[1..]` as lines, replacing each interior corner with a quadratic curve.
fn round_polyline(path: &mut PathData, points: &[Position]) {
    for idx in 1..points.len() {
        let corner = points[idx];
        let Some(&next) = points.get(idx + 1) else {
            path.line_to(corner);
            break;
        };
        let prev = points[idx - 1];
        let radius = STEP_CORNER_RADIUS
            .min(distance(prev, corner) / 2.0)
            .min(distance(corner, next) / 2.0);
        path.line_to(toward(corner, prev, radius))
            .quad_to(corner, toward(corner, next, radius));
    }
}
