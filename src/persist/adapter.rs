// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::local::{LocalStore, MemoryLocalStore};
use super::queue::{DurableOp, DurableWriteQueue, WriteOutcome};
use super::transport::HostTransport;
use super::wire::{FileResponse, HostEvent, HostRequest};
use super::PersistError;

/// The adapter is shared by every store of a session.
pub type SharedAdapter = Rc<RefCell<PersistenceAdapter>>;

/// Where a lookup was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupSource {
    Snapshot,
    Local,
    /// Found under an older alternate key; the value is now cached under the requested key.
    Legacy { key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub value: Value,
    pub source: LookupSource,
}

impl Lookup {
    pub fn is_legacy(&self) -> bool {
        matches!(self.source, LookupSource::Legacy { .. })
    }
}

/// Result of feeding a host event into the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEffect {
    Acknowledged(Vec<WriteOutcome>),
    Reloaded { keys: usize },
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LegacyFallback {
    family_prefix: String,
    key: String,
}

/// Three-tier key/value persistence.
///
/// Reads try the host-injected snapshot, then the local store, then a registered legacy
/// key. Writes update the snapshot and local store synchronously and hand the value to the
/// durable write queue without waiting. Failures are logged and never returned to callers.
pub struct PersistenceAdapter {
    snapshot: Option<BTreeMap<String, Value>>,
    local: Box<dyn LocalStore>,
    durable: Option<DurableWriteQueue>,
    legacy: Vec<LegacyFallback>,
    outcomes: Vec<WriteOutcome>,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("snapshot_keys", &self.snapshot.as_ref().map(BTreeMap::len))
            .field("durable", &self.durable)
            .field("legacy", &self.legacy)
            .finish_non_exhaustive()
    }
}

impl Default for PersistenceAdapter {
    fn default() -> Self {
        Self::new(Box::new(MemoryLocalStore::new()))
    }
}

impl PersistenceAdapter {
    pub fn new(local: Box<dyn LocalStore>) -> Self {
        Self {
            snapshot: None,
            local,
            durable: None,
            legacy: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Host-provided persisted data, injected before the first render.
    pub fn with_snapshot(mut self, snapshot: BTreeMap<String, Value>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_durable_store(mut self, transport: Box<dyn HostTransport>) -> Self {
        self.durable = Some(DurableWriteQueue::new(transport));
        self
    }

    pub fn into_shared(self) -> SharedAdapter {
        Rc::new(RefCell::new(self))
    }

    /// Registers `key` as the alternate lookup for every key starting with `family_prefix`.
    pub fn register_legacy_fallback(&mut self, family_prefix: &str, key: &str) {
        let fallback = LegacyFallback {
            family_prefix: family_prefix.to_owned(),
            key: key.to_owned(),
        };
        if !self.legacy.contains(&fallback) {
            self.legacy.push(fallback);
        }
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn has_durable_store(&self) -> bool {
        self.durable.is_some()
    }

    pub fn durable_queue(&self) -> Option<&DurableWriteQueue> {
        self.durable.as_ref()
    }

    pub fn get_item(&mut self, key: &str) -> Option<Lookup> {
        if let Some(found) = self.get_item_exact(key) {
            return Some(found);
        }

        let legacy_key = self
            .legacy
            .iter()
            .find(|fallback| key.starts_with(&fallback.family_prefix) && key != fallback.key)
            .map(|fallback| fallback.key.clone())?;
        let found = self.get_item_exact(&legacy_key)?;
        debug!(key, %legacy_key, "served from legacy key");
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.insert(key.to_owned(), found.value.clone());
        }
        Some(Lookup {
            value: found.value,
            source: LookupSource::Legacy { key: legacy_key },
        })
    }

    /// Lookup without the legacy fallback.
    pub fn get_item_exact(&mut self, key: &str) -> Option<Lookup> {
        if let Some(value) = self.snapshot.as_ref().and_then(|snapshot| snapshot.get(key)) {
            return Some(Lookup {
                value: value.clone(),
                source: LookupSource::Snapshot,
            });
        }

        let raw = self.local.get(key)?;
        let value = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "ignoring malformed locally persisted value");
                return None;
            }
        };
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.insert(key.to_owned(), value.clone());
        }
        Some(Lookup {
            value,
            source: LookupSource::Local,
        })
    }

    pub fn set_item(&mut self, key: &str, value: &Value) {
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.insert(key.to_owned(), value.clone());
        }

        match serde_json::to_string(value) {
            Ok(raw) => {
                if let Err(err) = self.local.set(key, raw) {
                    error!(key, error = %err, "failed to write local store");
                }
            }
            Err(err) => error!(key, error = %err, "failed to serialize persisted value"),
        }

        if let Some(durable) = self.durable.as_mut() {
            self.outcomes
                .extend(durable.enqueue(key, DurableOp::Write(value.clone())));
        }
    }

    pub fn remove_item(&mut self, key: &str) {
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.remove(key);
        }
        self.local.remove(key);
        if let Some(durable) = self.durable.as_mut() {
            self.outcomes.extend(durable.enqueue(key, DurableOp::Delete));
        }
    }

    /// Replaces the snapshot wholesale with freshly reloaded host data.
    pub fn replace_snapshot(&mut self, data: BTreeMap<String, Value>) {
        self.snapshot = Some(data);
    }

    /// Asks the host to re-read the durable store and send it back.
    pub fn request_reload(&self) -> Result<(), PersistError> {
        let durable = self.durable.as_ref().ok_or(PersistError::NoDurableStore)?;
        durable.transport().post(&HostRequest::reload())?;
        Ok(())
    }

    pub fn handle_host_event(&mut self, event: HostEvent) -> HostEffect {
        match event {
            HostEvent::FileResponse { message } => {
                let response = match FileResponse::parse(&message) {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(error = %err, "ignoring malformed file response");
                        return HostEffect::Ignored;
                    }
                };
                let Some(durable) = self.durable.as_mut() else {
                    return HostEffect::Ignored;
                };
                let outcomes = durable.acknowledge(response);
                self.outcomes.extend(outcomes.iter().cloned());
                HostEffect::Acknowledged(outcomes)
            }
            HostEvent::ReloadPersistedData { persisted_data } => {
                let keys = persisted_data.len();
                debug!(keys, "replacing persisted snapshot");
                self.replace_snapshot(persisted_data);
                if let Some(durable) = self.durable.as_mut() {
                    durable.reset_in_flight();
                }
                HostEffect::Reloaded { keys }
            }
        }
    }

    /// Posts every parked durable write now, without waiting for outstanding
    /// acknowledgements.
    pub fn flush_durable(&mut self) {
        if let Some(durable) = self.durable.as_mut() {
            self.outcomes.extend(durable.flush_pending());
        }
    }

    /// Drains completion reports collected since the last call.
    pub fn take_outcomes(&mut self) -> Vec<WriteOutcome> {
        std::mem::take(&mut self.outcomes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::mpsc;

    use serde_json::json;

    use super::{HostEffect, LookupSource, PersistenceAdapter};
    use crate::persist::local::{LocalStore, MemoryLocalStore};
    use crate::persist::transport::ChannelTransport;
    use crate::persist::wire::{FileResponse, HostEvent};
    use crate::persist::PersistError;

    #[test]
    fn snapshot_wins_over_local() {
        let mut local = MemoryLocalStore::new();
        local.set("k", "\"local\"".to_owned()).unwrap();
        let mut adapter = PersistenceAdapter::new(Box::new(local))
            .with_snapshot(BTreeMap::from([("k".to_owned(), json!("snapshot"))]));

        let found = adapter.get_item("k").expect("found");
        assert_eq!(found.value, json!("snapshot"));
        assert_eq!(found.source, LookupSource::Snapshot);
    }

    #[test]
    fn local_hits_populate_snapshot() {
        let mut local = MemoryLocalStore::new();
        local.set("k", "[1,2]".to_owned()).unwrap();
        let mut adapter = PersistenceAdapter::new(Box::new(local)).with_snapshot(BTreeMap::new());

        assert_eq!(adapter.get_item("k").expect("found").source, LookupSource::Local);
        assert_eq!(adapter.get_item("k").expect("found").source, LookupSource::Snapshot);
    }

    #[test]
    fn malformed_local_value_reads_as_absent() {
        let mut local = MemoryLocalStore::new();
        local.set("k", "{broken".to_owned()).unwrap();
        let mut adapter = PersistenceAdapter::new(Box::new(local));
        assert!(adapter.get_item("k").is_none());
    }

    #[test]
    fn legacy_key_is_consulted_and_cached_for_registered_family() {
        let mut adapter = PersistenceAdapter::default()
            .with_snapshot(BTreeMap::from([("tableGroups:none".to_owned(), json!([]))]));
        adapter.register_legacy_fallback("tableGroups:", "tableGroups:none");

        let found = adapter.get_item("tableGroups:doc").expect("legacy");
        assert_eq!(
            found.source,
            LookupSource::Legacy {
                key: "tableGroups:none".to_owned()
            }
        );
        assert_eq!(adapter.get_item_exact("tableGroups:doc").expect("cached").source, LookupSource::Snapshot);
        assert!(adapter.get_item("tableCoords:doc").is_none());
    }

    #[test]
    fn writes_fan_out_to_every_tier() {
        let (tx, rx) = mpsc::channel();
        let mut adapter = PersistenceAdapter::default()
            .with_snapshot(BTreeMap::new())
            .with_durable_store(Box::new(ChannelTransport::new(tx)));

        adapter.set_item("k", &json!({"a": 1}));
        assert_eq!(adapter.get_item_exact("k").expect("found").value, json!({"a": 1}));
        assert_eq!(rx.try_iter().count(), 1);

        adapter.remove_item("k");
        assert!(adapter.get_item("k").is_none());
    }

    #[test]
    fn local_quota_failure_is_swallowed() {
        let mut adapter = PersistenceAdapter::new(Box::new(MemoryLocalStore::with_quota(4)));
        adapter.set_item("key", &json!("far too long"));
        assert!(adapter.get_item("key").is_none());
    }

    #[test]
    fn reload_replaces_snapshot_and_acks_flow_into_outcomes() {
        let (tx, _rx) = mpsc::channel();
        let mut adapter = PersistenceAdapter::default()
            .with_snapshot(BTreeMap::from([("old".to_owned(), json!(1))]))
            .with_durable_store(Box::new(ChannelTransport::new(tx)));

        adapter.set_item("k", &json!(1));
        let ack = HostEvent::file_response(&FileResponse::success("k")).unwrap();
        let HostEffect::Acknowledged(outcomes) = adapter.handle_host_event(ack) else {
            panic!("expected ack");
        };
        assert!(outcomes[0].ok);
        assert_eq!(adapter.take_outcomes().len(), 1);

        let reload = HostEvent::ReloadPersistedData {
            persisted_data: BTreeMap::from([("new".to_owned(), json!(2))]),
        };
        assert_eq!(adapter.handle_host_event(reload), HostEffect::Reloaded { keys: 1 });
        assert!(adapter.get_item_exact("old").is_none());
        assert_eq!(adapter.get_item_exact("new").unwrap().value, json!(2));
    }

    #[test]
    fn writes_behind_a_lost_ack_are_released() {
        let (tx, rx) = mpsc::channel();
        let mut adapter = PersistenceAdapter::default()
            .with_snapshot(BTreeMap::new())
            .with_durable_store(Box::new(ChannelTransport::new(tx)));

        adapter.set_item("k", &json!(1));
        adapter.set_item("k", &json!(2));
        assert_eq!(rx.try_iter().count(), 1);

        adapter.flush_durable();
        assert_eq!(rx.try_iter().count(), 1);

        let reload = HostEvent::ReloadPersistedData {
            persisted_data: BTreeMap::new(),
        };
        adapter.handle_host_event(reload);
        adapter.set_item("k", &json!(3));
        assert_eq!(rx.try_iter().count(), 1, "reload frees the unacknowledged slot");
        assert!(adapter.take_outcomes().is_empty());
    }

    #[test]
    fn reload_without_durable_store_is_a_soft_error() {
        let adapter = PersistenceAdapter::default();
        assert!(matches!(adapter.request_reload(), Err(PersistError::NoDurableStore)));
    }
}
