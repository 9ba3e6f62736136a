// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Connection geometry for the drawing layer.
//!
//! Everything here is a pure function of positions and sizes. The canvas draws the
//! resulting [`PathData`]; nothing in this module touches the stores.

pub mod connections;
pub mod handles;
pub mod path;
pub mod symbols;

pub use connections::{
    enum_connections, relation_connections, ConnectionContext, EnumConnection,
    RelationConnection, WaypointSource,
};
pub use handles::{compute_connection_handle_pos, HandleSide};
pub use path::{bezier_path, step_path, symbol_offset, waypoint_path, PathCommand, PathData};
pub use symbols::relation_symbol;
