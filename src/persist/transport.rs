// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::mpsc::Sender;

use super::wire::HostRequest;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("host channel closed")]
    Closed,
    #[error("host rejected request: {0}")]
    Rejected(String),
}

/// Outbound half of the host channel. Posting never waits for the host to act.
pub trait HostTransport {
    fn post(&self, request: &HostRequest) -> Result<(), TransportError>;
}

/// Forwards requests into an in-process channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: Sender<HostRequest>,
}

impl ChannelTransport {
    pub fn new(tx: Sender<HostRequest>) -> Self {
        Self { tx }
    }
}

impl HostTransport for ChannelTransport {
    fn post(&self, request: &HostRequest) -> Result<(), TransportError> {
        self.tx.send(request.clone()).map_err(|_| TransportError::Closed)
    }
}
