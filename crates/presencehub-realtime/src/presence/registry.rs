//! Presence registry: which sessions are currently connected.
//!
//! One slot per session id. A session may carry several transport
//! connections (browser tabs); the slot lives while at least one of them is
//! attached. The entry returned by a removal is the presence-change event:
//! exactly one caller receives it, so exactly one OFFLINE broadcast follows.
//! A slot only counts as announced once its ONLINE broadcast went out, so a
//! session removed before that point never produces an unmatched OFFLINE.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use presencehub_core::types::{ConnectionId, Principal, SessionId};

/// A connected session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// Session id.
    pub session_id: SessionId,
    /// Principal owning the session.
    pub principal: Principal,
    /// When the session became present.
    pub connected_at: DateTime<Utc>,
}

/// A session removed by [`PresenceRegistry::detach`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    /// The removed entry.
    pub entry: PresenceEntry,
    /// Whether ONLINE had been broadcast for it.
    pub announced: bool,
}

#[derive(Debug)]
struct PresenceSlot {
    entry: PresenceEntry,
    connections: HashSet<ConnectionId>,
    // connection whose attach created the slot
    origin: Option<ConnectionId>,
    announced: bool,
}

impl PresenceSlot {
    fn new(session_id: SessionId, principal: Principal, origin: Option<ConnectionId>) -> Self {
        Self {
            entry: PresenceEntry {
                session_id,
                principal,
                connected_at: Utc::now(),
            },
            connections: origin.into_iter().collect(),
            origin,
            announced: false,
        }
    }
}

/// Online user with the number of sessions it has connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    /// User name.
    pub username: String,
    /// Connected sessions.
    pub sessions: usize,
}

/// Concurrent map of session id to presence entry.
///
/// Every mutation is atomic per session id. No lock is held across an await.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    slots: DashMap<SessionId, PresenceSlot>,
}

impl PresenceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session without any connection. Returns false, changing
    /// nothing, if it is already present.
    ///
    /// Session-level primitive. The connection manager goes through
    /// [`attach`](Self::attach) and [`detach`](Self::detach), which refine
    /// it with a per-session connection count.
    pub fn add(&self, session_id: SessionId, principal: Principal) -> bool {
        match self.slots.entry(session_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PresenceSlot::new(session_id, principal, None));
                true
            }
        }
    }

    /// Removes a session regardless of its connections.
    ///
    /// Counterpart of [`add`](Self::add); see [`detach`](Self::detach) for
    /// the connection-counted removal.
    pub fn remove(&self, session_id: &SessionId) -> Option<PresenceEntry> {
        self.slots.remove(session_id).map(|(_, slot)| slot.entry)
    }

    /// Attaches a connection, registering the session if needed.
    ///
    /// Returns true only when the session was not present before.
    pub fn attach(
        &self,
        session_id: SessionId,
        principal: Principal,
        connection_id: ConnectionId,
    ) -> bool {
        match self.slots.entry(session_id) {
            Entry::Occupied(mut slot) => {
                slot.get_mut().connections.insert(connection_id);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(PresenceSlot::new(session_id, principal, Some(connection_id)));
                true
            }
        }
    }

    /// Marks the slot created by `origin` as announced.
    ///
    /// Returns false if that slot is gone, even when a newer slot for the
    /// same session exists.
    pub fn mark_announced(&self, session_id: &SessionId, origin: &ConnectionId) -> bool {
        match self.slots.get_mut(session_id) {
            Some(mut slot) if slot.origin == Some(*origin) => {
                slot.announced = true;
                true
            }
            _ => false,
        }
    }

    /// Detaches a connection. Returns the removed session if it was the
    /// session's last connection.
    pub fn detach(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Option<Detached> {
        self.slots
            .remove_if_mut(session_id, |_, slot| {
                slot.connections.remove(connection_id) && slot.connections.is_empty()
            })
            .map(|(_, slot)| Detached {
                entry: slot.entry,
                announced: slot.announced,
            })
    }

    /// Whether the session is present.
    pub fn is_live(&self, session_id: &SessionId) -> bool {
        self.slots.contains_key(session_id)
    }

    /// Whether the session is present with this connection attached.
    pub fn is_attached(&self, session_id: &SessionId, connection_id: &ConnectionId) -> bool {
        self.slots
            .get(session_id)
            .is_some_and(|slot| slot.connections.contains(connection_id))
    }

    /// Entry for one session.
    pub fn get(&self, session_id: &SessionId) -> Option<PresenceEntry> {
        self.slots.get(session_id).map(|slot| slot.entry.clone())
    }

    /// Distinct principals with at least one present session.
    pub fn snapshot(&self) -> HashSet<Principal> {
        self.slots
            .iter()
            .map(|slot| slot.entry.principal.clone())
            .collect()
    }

    /// All entries, one per present session.
    pub fn entries(&self) -> Vec<PresenceEntry> {
        self.slots.iter().map(|slot| slot.entry.clone()).collect()
    }

    /// Online users sorted by name, with their session counts.
    pub fn online_users(&self) -> Vec<OnlineUser> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for slot in self.slots.iter() {
            *counts
                .entry(slot.entry.principal.username.clone())
                .or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(username, sessions)| OnlineUser { username, sessions })
            .collect()
    }

    /// Sorted names of online users.
    pub fn online_usernames(&self) -> Vec<String> {
        self.online_users()
            .into_iter()
            .map(|user| user.username)
            .collect()
    }

    /// Number of present sessions.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when nobody is present.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_is_idempotent() {
        let registry = PresenceRegistry::new();
        let id = SessionId::new();
        assert!(registry.add(id, Principal::named("alice")));
        assert!(!registry.add(id, Principal::named("alice")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries().len(), 1);
    }

    #[test]
    fn test_remove_once() {
        let registry = PresenceRegistry::new();
        let id = SessionId::new();
        registry.add(id, Principal::named("alice"));
        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
        assert!(!registry.is_live(&id));
    }

    #[test]
    fn test_attach_detach_multiple_connections() {
        let registry = PresenceRegistry::new();
        let sid = SessionId::new();
        let (c1, c2) = (ConnectionId::new(), ConnectionId::new());

        assert!(registry.attach(sid, Principal::named("bob"), c1));
        assert!(!registry.attach(sid, Principal::named("bob"), c2));
        assert!(registry.is_attached(&sid, &c2));

        assert!(registry.detach(&sid, &c1).is_none());
        assert!(registry.is_live(&sid));
        // unknown connection leaves the slot alone
        assert!(registry.detach(&sid, &c1).is_none());

        let detached = registry.detach(&sid, &c2).unwrap();
        assert_eq!(detached.entry.principal.username, "bob");
        assert!(!detached.announced);
        assert!(!registry.is_live(&sid));
        assert!(registry.detach(&sid, &c2).is_none());
    }

    #[test]
    fn test_announced_only_for_origin_slot() {
        let registry = PresenceRegistry::new();
        let sid = SessionId::new();
        let (c1, c2) = (ConnectionId::new(), ConnectionId::new());

        registry.attach(sid, Principal::named("erin"), c1);
        assert!(!registry.mark_announced(&sid, &c2));
        assert!(registry.mark_announced(&sid, &c1));
        assert!(registry.detach(&sid, &c1).unwrap().announced);

        // a slot recreated by another connection is not the one c1 announced
        assert!(!registry.mark_announced(&sid, &c1));
        registry.attach(sid, Principal::named("erin"), c2);
        assert!(!registry.mark_announced(&sid, &c1));
        assert!(!registry.detach(&sid, &c2).unwrap().announced);
    }

    #[test]
    fn test_multi_device_snapshot() {
        let registry = PresenceRegistry::new();
        let carol = Principal::named("carol");
        registry.add(SessionId::new(), carol.clone());
        registry.add(SessionId::new(), carol.clone());
        registry.add(SessionId::new(), Principal::named("alice"));

        assert_eq!(registry.entries().len(), 3);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(&carol));
        assert_eq!(
            registry.online_users(),
            vec![
                OnlineUser { username: "alice".into(), sessions: 1 },
                OnlineUser { username: "carol".into(), sessions: 2 },
            ]
        );
    }

    #[test]
    fn test_concurrent_detach_yields_one_entry() {
        let registry = Arc::new(PresenceRegistry::new());
        let sid = SessionId::new();
        let conn = ConnectionId::new();
        registry.attach(sid, Principal::named("dave"), conn);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.detach(&sid, &conn).is_some())
            })
            .collect();
        let removed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|removed| *removed)
            .count();
        assert_eq!(removed, 1);
    }
}
