// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-document state stores.
//!
//! Positions, groups and control points each persist under `"{store}:{scope}"` through the
//! shared persistence adapter. `folder` is the file-backed durable tier used outside an
//! editor host.

pub mod control_points;
pub mod folder;
pub mod groups;
pub mod persistable;
pub mod positions;

pub use control_points::ControlPointStore;
pub use folder::{
    file_name_to_key, key_to_file_name, FolderError, FolderTransport, PersistFolder,
    WriteDurability,
};
pub use groups::GroupStore;
pub use persistable::PersistableStore;
pub use positions::PositionStore;
