// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Engine configuration.
//!
//! Every field has a default, so a config file only needs to name what it overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub sizing: SizingConfig,
    pub groups: GroupConfig,
    pub layout: LayoutConfig,
    pub persistence: PersistenceConfig,
    /// Re-run initial layout when tables, enums or relations are added or removed.
    pub auto_layout_on_structural_change: bool,
    pub connection_style: ConnectionStyle,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            sizing: SizingConfig::default(),
            groups: GroupConfig::default(),
            layout: LayoutConfig::default(),
            persistence: PersistenceConfig::default(),
            auto_layout_on_structural_change: true,
            connection_style: ConnectionStyle::default(),
        }
    }
}

impl DiagramConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Box sizing used by layout and by the containment checks of the composition layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub table_min_width: f64,
    pub header_height: f64,
    pub column_height: f64,
    pub gap_x: f64,
    pub gap_y: f64,
    /// Approximate monospace glyph width used to estimate text extents.
    pub char_width: f64,
    pub table_padding_x: f64,
    pub enum_min_width: f64,
    pub enum_min_height: f64,
    pub enum_header_height: f64,
    pub enum_value_height: f64,
    pub enum_padding_x: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            table_min_width: 250.0,
            header_height: 50.0,
            column_height: 32.0,
            gap_x: 50.0,
            gap_y: 50.0,
            char_width: 8.0,
            table_padding_x: 32.0,
            enum_min_width: 200.0,
            enum_min_height: 120.0,
            enum_header_height: 60.0,
            enum_value_height: 28.0,
            enum_padding_x: 64.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub min_width: f64,
    pub min_height: f64,
    pub default_width: f64,
    pub default_height: f64,
    /// Colors handed out, in order, to groups created from a selection.
    pub palette: Vec<String>,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            min_width: 200.0,
            min_height: 150.0,
            default_width: 400.0,
            default_height: 300.0,
            palette: [
                "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6",
                "#f97316",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Layered graph layout when relations exist, grid otherwise.
    #[default]
    Layered,
    /// Always the deterministic grid.
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub mode: LayoutMode,
    pub node_sep_factor: f64,
    pub rank_sep_factor: f64,
    pub enum_node_sep_factor: f64,
    pub enum_rank_sep_factor: f64,
    pub crossing_passes: usize,
    pub enum_column_gap_factor: f64,
    pub enum_vertical_gap_factor: f64,
    pub enum_column_pitch_factor: f64,
    pub enum_column_height_ratio: f64,
    pub enum_min_column_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            mode: LayoutMode::default(),
            node_sep_factor: 3.0,
            rank_sep_factor: 3.0,
            enum_node_sep_factor: 5.0,
            enum_rank_sep_factor: 5.0,
            crossing_passes: 24,
            enum_column_gap_factor: 8.0,
            enum_vertical_gap_factor: 1.2,
            enum_column_pitch_factor: 3.0,
            enum_column_height_ratio: 0.9,
            enum_min_column_height: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Scope segment used by group data written before scopes existed.
    pub legacy_group_scope: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            legacy_group_scope: "none".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStyle {
    #[default]
    Bezier,
    SmoothStep,
}
