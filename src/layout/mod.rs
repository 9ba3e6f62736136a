// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Initial layout for schema entities.
//!
//! Layout is only a fallback: user-moved positions always win over computed ones, so every
//! function here is pure and knows nothing about persistence.

pub mod dimension;
pub mod elements;
pub mod enums;
pub mod grid;
pub mod layered;

pub use dimension::{enum_dimension, table_dimension};
pub use elements::{
    compute_elements_positions, compute_tables_positions_deterministic, ElementPositions,
};
pub use enums::place_enum_columns;
pub use grid::{compute_grid_positions, grid_cell, grid_columns};
pub use layered::{layout_layered, LayeredGraph, LayeredLayout, LayeredOptions, RankDir};
