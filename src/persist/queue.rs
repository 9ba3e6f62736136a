// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;
use tracing::{debug, error, warn};

use super::transport::HostTransport;
use super::wire::{FileResponse, HostRequest};

/// What should end up in the durable store for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum DurableOp {
    Write(Value),
    Delete,
}

/// Completion report for one durable write or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub key: Option<String>,
    pub ok: bool,
    pub error: Option<String>,
}

impl WriteOutcome {
    fn failed(key: &str, error: impl ToString) -> Self {
        Self {
            key: Some(key.to_owned()),
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

/// Fire-and-forget queue in front of the host's durable store.
///
/// At most one request per key is in flight. Ops enqueued while their key is in flight are
/// parked, and a newer op replaces the parked one, so the last write wins. Acknowledgements
/// release the slot and dispatch whatever was parked meanwhile. An acknowledgement that
/// never arrives would hold its key forever; [`Self::flush_pending`] and
/// [`Self::reset_in_flight`] release such slots.
pub struct DurableWriteQueue {
    transport: Box<dyn HostTransport>,
    in_flight: VecDeque<String>,
    pending: HashMap<String, DurableOp>,
}

impl std::fmt::Debug for DurableWriteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableWriteQueue")
            .field("in_flight", &self.in_flight)
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl DurableWriteQueue {
    pub fn new(transport: Box<dyn HostTransport>) -> Self {
        Self {
            transport,
            in_flight: VecDeque::new(),
            pending: HashMap::new(),
        }
    }

    /// Queues `op` for `key`. Returns a failed outcome when the request could not be posted.
    pub fn enqueue(&mut self, key: &str, op: DurableOp) -> Option<WriteOutcome> {
        if self.is_in_flight(key) {
            debug!(key, "durable write parked behind in-flight request");
            self.pending.insert(key.to_owned(), op);
            return None;
        }
        self.dispatch(key, op)
    }

    /// Applies a host acknowledgement.
    ///
    /// A response without a key settles the oldest in-flight request.
    pub fn acknowledge(&mut self, response: FileResponse) -> Vec<WriteOutcome> {
        let slot = match response.key.as_deref() {
            Some(key) => self.in_flight.iter().position(|k| k == key),
            None => (!self.in_flight.is_empty()).then_some(0),
        };
        let settled = slot.and_then(|idx| self.in_flight.remove(idx));
        if settled.is_none() {
            debug!(key = ?response.key, "acknowledgement for unknown durable write");
        }

        if !response.ok {
            error!(
                key = ?settled.as_ref().or(response.key.as_ref()),
                error = ?response.error,
                "durable write failed"
            );
        }

        let mut outcomes = vec![WriteOutcome {
            key: settled.clone().or(response.key),
            ok: response.ok,
            error: response.error,
        }];

        if let Some(key) = settled {
            if let Some(op) = self.pending.remove(&key) {
                outcomes.extend(self.dispatch(&key, op));
            }
        }
        outcomes
    }

    /// Forgets every unacknowledged request and posts every parked op right away.
    ///
    /// A key may briefly have two requests in flight afterwards; hosts apply requests in
    /// order, so the parked op still lands last.
    pub fn flush_pending(&mut self) -> Vec<WriteOutcome> {
        if !self.in_flight.is_empty() {
            debug!(count = self.in_flight.len(), "releasing unacknowledged durable writes");
        }
        self.in_flight.clear();
        let mut parked = self.pending.drain().collect::<Vec<_>>();
        parked.sort_by(|a, b| a.0.cmp(&b.0));
        parked
            .into_iter()
            .filter_map(|(key, op)| self.dispatch(&key, op))
            .collect()
    }

    /// Forgets unacknowledged requests and drops parked ops. Used once the host has sent a
    /// full copy of the durable store, which then supersedes anything still queued.
    pub fn reset_in_flight(&mut self) -> usize {
        let dropped = self.pending.len();
        if !self.in_flight.is_empty() || dropped > 0 {
            warn!(
                in_flight = self.in_flight.len(),
                parked = dropped,
                "discarding unacknowledged durable writes"
            );
        }
        self.in_flight.clear();
        self.pending.clear();
        dropped
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.iter().any(|k| k == key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_op(&self, key: &str) -> Option<&DurableOp> {
        self.pending.get(key)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.pending.is_empty()
    }

    pub fn transport(&self) -> &dyn HostTransport {
        self.transport.as_ref()
    }

    fn dispatch(&mut self, key: &str, op: DurableOp) -> Option<WriteOutcome> {
        let request = match &op {
            DurableOp::Write(value) => HostRequest::file_write(key, value),
            DurableOp::Delete => HostRequest::file_delete(key),
        };
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                warn!(key, error = %err, "failed to encode durable request");
                return Some(WriteOutcome::failed(key, err));
            }
        };

        match self.transport.post(&request) {
            Ok(()) => {
                self.in_flight.push_back(key.to_owned());
                None
            }
            Err(err) => {
                error!(key, error = %err, "failed to reach durable store");
                Some(WriteOutcome::failed(key, err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use serde_json::json;

    use super::{DurableOp, DurableWriteQueue};
    use crate::persist::transport::ChannelTransport;
    use crate::persist::wire::{DecodedRequest, FileResponse, HostRequest};

    fn queue() -> (DurableWriteQueue, Receiver<HostRequest>) {
        let (tx, rx) = mpsc::channel();
        (DurableWriteQueue::new(Box::new(ChannelTransport::new(tx))), rx)
    }

    fn sent(rx: &Receiver<HostRequest>) -> Vec<DecodedRequest> {
        rx.try_iter().map(|r| r.decode().expect("decode")).collect()
    }

    #[test]
    fn coalesces_writes_behind_in_flight_request() {
        let (mut queue, rx) = queue();

        assert!(queue.enqueue("k", DurableOp::Write(json!(1))).is_none());
        assert!(queue.enqueue("k", DurableOp::Write(json!(2))).is_none());
        assert!(queue.enqueue("k", DurableOp::Write(json!(3))).is_none());

        assert_eq!(sent(&rx).len(), 1, "only one request per key in flight");
        assert_eq!(queue.pending_op("k"), Some(&DurableOp::Write(json!(3))));

        let outcomes = queue.acknowledge(FileResponse::success("k"));
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].ok);

        assert_eq!(
            sent(&rx),
            vec![DecodedRequest::Write {
                key: "k".to_owned(),
                value: json!(3)
            }]
        );
        assert_eq!(queue.in_flight_count(), 1);

        queue.acknowledge(FileResponse::success("k"));
        assert!(queue.is_idle());
    }

    #[test]
    fn different_keys_are_independent() {
        let (mut queue, rx) = queue();
        queue.enqueue("a", DurableOp::Write(json!(1)));
        queue.enqueue("b", DurableOp::Delete);
        assert_eq!(sent(&rx).len(), 2);
        assert_eq!(queue.in_flight_count(), 2);
    }

    #[test]
    fn keyless_failure_settles_oldest_request() {
        let (mut queue, _rx) = queue();
        queue.enqueue("first", DurableOp::Write(json!(1)));
        queue.enqueue("second", DurableOp::Write(json!(2)));

        let outcomes = queue.acknowledge(FileResponse::failure(None, "boom"));
        assert_eq!(outcomes[0].key.as_deref(), Some("first"));
        assert!(!outcomes[0].ok);
        assert!(queue.is_in_flight("second"));
        assert!(!queue.is_in_flight("first"));
    }

    #[test]
    fn lost_acknowledgement_does_not_strand_later_writes() {
        let (mut queue, rx) = queue();
        queue.enqueue("k", DurableOp::Write(json!(1)));
        queue.enqueue("k", DurableOp::Write(json!(2)));
        queue.enqueue("other", DurableOp::Delete);
        assert_eq!(sent(&rx).len(), 2);

        // The acknowledgement for the first write of "k" never arrives.
        assert!(queue.flush_pending().is_empty());
        assert_eq!(
            sent(&rx),
            vec![DecodedRequest::Write {
                key: "k".to_owned(),
                value: json!(2)
            }]
        );
        assert_eq!(queue.in_flight_count(), 1);

        queue.acknowledge(FileResponse::success("k"));
        assert!(queue.is_idle());
        queue.enqueue("k", DurableOp::Write(json!(3)));
        assert_eq!(sent(&rx).len(), 1);
    }

    #[test]
    fn reset_drops_parked_ops_and_unblocks_keys() {
        let (mut queue, rx) = queue();
        queue.enqueue("k", DurableOp::Write(json!(1)));
        queue.enqueue("k", DurableOp::Write(json!(2)));
        sent(&rx);

        assert_eq!(queue.reset_in_flight(), 1);
        assert!(queue.is_idle());
        assert!(sent(&rx).is_empty());

        queue.enqueue("k", DurableOp::Write(json!(3)));
        assert_eq!(
            sent(&rx),
            vec![DecodedRequest::Write {
                key: "k".to_owned(),
                value: json!(3)
            }]
        );
    }

    #[test]
    fn closed_channel_reports_failure_without_blocking() {
        let (mut queue, rx) = queue();
        drop(rx);

        let outcome = queue.enqueue("k", DurableOp::Write(json!(1))).expect("failure outcome");
        assert!(!outcome.ok);
        assert!(queue.is_idle());
    }
}
