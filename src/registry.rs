//! In-memory device registry: MAC identity to session state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use log::info;
use uuid::Uuid;

use crate::session::{DeviceSession, DeviceState};

#[derive(Default)]
struct Inner {
    by_mac: HashMap<String, DeviceSession>,
    by_id: HashMap<Uuid, String>,
}

/// Owns every [`DeviceSession`], keyed by stable MAC with a Uuid index for
/// external callers.
///
/// Sessions are created on first discovery or pre-registered from persisted
/// configuration, and never destroyed: disabling is a soft state. Color and
/// power fields are only ever written from the dispatcher task; the mutex
/// exists for concurrent read access by observers and the poller.
pub struct DeviceRegistry {
    inner: Mutex<Inner>,
    poll_generation: AtomicU64,
    discovery_rounds: AtomicU32,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry {
            inner: Mutex::new(Inner::default()),
            poll_generation: AtomicU64::new(0),
            discovery_rounds: AtomicU32::new(0),
        }
    }

    /// Register a MAC, creating a session if it is not yet known.
    ///
    /// Returns the session id either way.
    pub fn register(&self, mac: &str) -> Uuid {
        let mut inner = self.inner.lock().unwrap();
        if let Some(session) = inner.by_mac.get(mac) {
            return session.id;
        }
        let session = DeviceSession::new(mac);
        let id = session.id;
        info!("registered device {mac} as {id}");
        inner.by_id.insert(id, mac.to_string());
        inner.by_mac.insert(mac.to_string(), session);
        id
    }

    pub fn contains_mac(&self, mac: &str) -> bool {
        self.inner.lock().unwrap().by_mac.contains_key(mac)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().by_mac.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the session with the given id.
    pub fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut DeviceSession) -> R) -> Option<R> {
        let mut inner = self.inner.lock().unwrap();
        let mac = inner.by_id.get(&id)?.clone();
        inner.by_mac.get_mut(&mac).map(f)
    }

    /// Run `f` against the session with the given MAC.
    pub fn with_session_by_mac<R>(
        &self,
        mac: &str,
        f: impl FnOnce(&mut DeviceSession) -> R,
    ) -> Option<R> {
        self.inner.lock().unwrap().by_mac.get_mut(mac).map(f)
    }

    /// Run `f` once per session (in unspecified order).
    pub fn for_each(&self, mut f: impl FnMut(&mut DeviceSession)) {
        let mut inner = self.inner.lock().unwrap();
        for session in inner.by_mac.values_mut() {
            f(session);
        }
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.inner.lock().unwrap().by_id.keys().copied().collect()
    }

    /// Published snapshot for one device.
    pub fn state(&self, id: Uuid) -> Option<DeviceState> {
        self.with_session(id, |s| s.state().clone())
    }

    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> bool {
        self.with_session(id, |s| s.enabled = enabled).is_some()
    }

    /// Advance the polling generation; returns the new value.
    pub fn next_poll_generation(&self) -> u64 {
        self.poll_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn poll_generation(&self) -> u64 {
        self.poll_generation.load(Ordering::SeqCst)
    }

    /// Count one completed discovery sweep.
    pub fn record_discovery_round(&self) -> u32 {
        self.discovery_rounds.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn discovery_rounds(&self) -> u32 {
        self.discovery_rounds.load(Ordering::SeqCst)
    }
}
