// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Erdsketch: layout and persistence engine for interactive entity-relationship diagrams.
//!
//! A [`DiagramSession`] owns the per-document state of one diagram panel: entity
//! positions, groups and connection control points. It merges computed layout with what
//! the user arranged before, and keeps it in sync with a slow host-side durable store.

pub mod config;
pub mod diagram;
pub mod events;
pub mod layout;
pub mod model;
pub mod persist;
pub mod session;
pub mod store;

pub use config::{ConfigError, ConnectionStyle, DiagramConfig};
pub use events::{DiagramEvent, EventBus, EventKind, Subscription};
pub use model::{EntityKind, Position, Schema, ScopeKey};
pub use persist::{HostEvent, HostRequest, PersistError, PersistenceAdapter, SharedAdapter};
pub use session::{resize_rect, DiagramSession, ResizeCorner};
