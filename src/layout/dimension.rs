// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::config::SizingConfig;
use crate::model::{Enum, Size, Table};

/// Box size of a table: one header plus one row per field.
pub fn table_dimension(table: &Table, sizing: &SizingConfig) -> Size {
    let longest_row = table
        .fields
        .iter()
        .map(|field| field.name.chars().count() + 1 + field.type_name.chars().count())
        .chain(std::iter::once(table.name.chars().count()))
        .max()
        .unwrap_or(0);
    let text_width = longest_row as f64 * sizing.char_width + sizing.table_padding_x;

    Size::new(
        sizing.table_min_width.max(text_width),
        sizing.header_height + table.fields.len() as f64 * sizing.column_height,
    )
}

/// Box size of an enum: a header plus one row per value, never below the enum minimums.
pub fn enum_dimension(enum_: &Enum, sizing: &SizingConfig) -> Size {
    let longest = enum_
        .values
        .iter()
        .map(|value| value.name.chars().count())
        .chain(std::iter::once(enum_.name.chars().count()))
        .max()
        .unwrap_or(0);
    let text_width = longest as f64 * sizing.char_width + sizing.enum_padding_x;
    let rows_height =
        sizing.enum_header_height + enum_.values.len() as f64 * sizing.enum_value_height;

    Size::new(
        text_width.max(sizing.enum_min_width),
        rows_height.max(sizing.enum_min_height),
    )
}
