// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Message protocol between the diagram and its host.
//!
//! Messages are tagged by `command`. Write and delete payloads travel as JSON text inside
//! `message`, matching what the host already persists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Diagram to host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostRequest {
    FileWrite {
        message: String,
    },
    FileDelete {
        message: String,
    },
    ReloadPersistedDataRequest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

/// Host to diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostEvent {
    FileResponse {
        message: String,
    },
    ReloadPersistedData {
        #[serde(rename = "persistedData", default)]
        persisted_data: BTreeMap<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WritePayload {
    key: String,
    value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DeletePayload {
    key: String,
}

/// Acknowledgement of one write or delete. Older hosts omit the key on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A request with its JSON payload unpacked.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRequest {
    Write { key: String, value: Value },
    Delete { key: String },
    Reload,
}

impl HostRequest {
    pub fn file_write(key: &str, value: &Value) -> Result<Self, serde_json::Error> {
        let message = serde_json::to_string(&WritePayload {
            key: key.to_owned(),
            value: value.clone(),
        })?;
        Ok(Self::FileWrite { message })
    }

    pub fn file_delete(key: &str) -> Result<Self, serde_json::Error> {
        let message = serde_json::to_string(&DeletePayload {
            key: key.to_owned(),
        })?;
        Ok(Self::FileDelete { message })
    }

    pub fn reload() -> Self {
        Self::ReloadPersistedDataRequest {
            message: Some("apply".to_owned()),
        }
    }

    pub fn decode(&self) -> Result<DecodedRequest, serde_json::Error> {
        match self {
            Self::FileWrite { message } => {
                let payload: WritePayload = serde_json::from_str(message)?;
                Ok(DecodedRequest::Write {
                    key: payload.key,
                    value: payload.value,
                })
            }
            Self::FileDelete { message } => {
                let payload: DeletePayload = serde_json::from_str(message)?;
                Ok(DecodedRequest::Delete { key: payload.key })
            }
            Self::ReloadPersistedDataRequest { .. } => Ok(DecodedRequest::Reload),
        }
    }
}

impl HostEvent {
    pub fn file_response(response: &FileResponse) -> Result<Self, serde_json::Error> {
        Ok(Self::FileResponse {
            message: serde_json::to_string(response)?,
        })
    }
}

impl FileResponse {
    pub fn success(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ok: true,
            error: None,
        }
    }

    pub fn failure(key: Option<String>, error: impl Into<String>) -> Self {
        Self {
            key,
            ok: false,
            error: Some(error.into()),
        }
    }

    pub fn parse(message: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(message)
    }
}
