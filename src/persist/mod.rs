// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence boundary shared by all stores.
//!
//! A host-injected snapshot and a local string store give synchronous reads. The host's
//! durable store is reached only through fire-and-forget messages.

pub mod adapter;
pub mod local;
pub mod queue;
pub mod transport;
pub mod wire;

pub use adapter::{HostEffect, Lookup, LookupSource, PersistenceAdapter, SharedAdapter};
pub use local::{LocalStore, LocalStoreError, MemoryLocalStore};
pub use queue::{DurableOp, DurableWriteQueue, WriteOutcome};
pub use transport::{ChannelTransport, HostTransport, TransportError};
pub use wire::{DecodedRequest, FileResponse, HostEvent, HostRequest};

/// Errors surfaced for persistence actions the user asked for explicitly.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("no durable store is attached")]
    NoDurableStore,
    #[error(transparent)]
    Transport(#[from] TransportError),
}
