// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Typed publish/subscribe bus scoped to one diagram session.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::config::ConnectionStyle;
use crate::model::{EntityKind, GroupId, MembershipDelta, Position};
use crate::persist::WriteOutcome;

#[derive(Debug, Clone, PartialEq)]
pub enum DiagramEvent {
    GroupsChanged,
    PositionsReset {
        kind: EntityKind,
        positions: BTreeMap<String, Position>,
    },
    EntityMoved {
        kind: EntityKind,
        name: String,
        position: Position,
    },
    MembershipChanged {
        group_id: GroupId,
        delta: MembershipDelta,
    },
    SelectionChanged(BTreeSet<String>),
    ConnectionStyleChanged(ConnectionStyle),
    PersistenceCompleted(WriteOutcome),
    PersistedDataReloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GroupsChanged,
    PositionsReset,
    EntityMoved,
    MembershipChanged,
    SelectionChanged,
    ConnectionStyleChanged,
    PersistenceCompleted,
    PersistedDataReloaded,
}

impl DiagramEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::GroupsChanged => EventKind::GroupsChanged,
            Self::PositionsReset { .. } => EventKind::PositionsReset,
            Self::EntityMoved { .. } => EventKind::EntityMoved,
            Self::MembershipChanged { .. } => EventKind::MembershipChanged,
            Self::SelectionChanged(_) => EventKind::SelectionChanged,
            Self::ConnectionStyleChanged(_) => EventKind::ConnectionStyleChanged,
            Self::PersistenceCompleted(_) => EventKind::PersistenceCompleted,
            Self::PersistedDataReloaded => EventKind::PersistedDataReloaded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Rc<RefCell<dyn FnMut(&DiagramEvent)>>;

struct Subscriber {
    id: SubscriptionId,
    kind: Option<EventKind>,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<Subscriber>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Subscribes to one event kind. Dropping the returned guard unsubscribes.
    pub fn subscribe(
        self: &Rc<Self>,
        kind: EventKind,
        handler: impl FnMut(&DiagramEvent) + 'static,
    ) -> Subscription {
        self.insert(Some(kind), Rc::new(RefCell::new(handler)))
    }

    pub fn subscribe_all(self: &Rc<Self>, handler: impl FnMut(&DiagramEvent) + 'static) -> Subscription {
        self.insert(None, Rc::new(RefCell::new(handler)))
    }

    fn insert(self: &Rc<Self>, kind: Option<EventKind>, handler: Handler) -> Subscription {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push(Subscriber { id, kind, handler });
        Subscription {
            id,
            bus: Rc::downgrade(self),
        }
    }

    /// Delivers `event` to every matching subscriber registered at call time.
    ///
    /// Handlers may subscribe, unsubscribe or emit. A handler that is already running
    /// further up the stack is skipped instead of re-entered.
    pub fn emit(&self, event: &DiagramEvent) {
        let kind = event.kind();
        let targets = self
            .subscribers
            .borrow()
            .iter()
            .filter(|sub| sub.kind.map_or(true, |k| k == kind))
            .map(|sub| (sub.id, sub.handler.clone()))
            .collect::<Vec<_>>();

        for (id, handler) in targets {
            if !self.is_subscribed(id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut handler) => handler(event),
                Err(_) => warn!(?kind, "skipping re-entrant event handler"),
            }
        }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().retain(|sub| sub.id != id);
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow().iter().any(|sub| sub.id == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Drops every subscriber.
    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

/// Guard returned by [`EventBus::subscribe`].
#[must_use = "dropping a subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<EventBus>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keeps the handler registered for the bus lifetime.
    pub fn detach(mut self) -> SubscriptionId {
        self.bus = Weak::new();
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}
