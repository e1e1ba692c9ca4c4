//! Session coordinator
//!
//! Owns the injected [`Store`], the [`EventBus`], the runtime policy and a
//! table of per-session locks. Every engine operation is a method on
//! [`Coordinator`]; the methods are spread over the `membership`, `items`,
//! `readiness`, `phase`, `selection`, `restart` and `state` modules.
//!
//! Each read-decide-write sequence holds the session's lock for its whole
//! duration, so two requests for the same session never interleave while
//! requests for different sessions never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use wkune_common::config::PolicyConfig;
use wkune_common::db::{Member, Phase, Session, Store};
use wkune_common::events::{EventBus, SessionEvent};
use wkune_common::{Error, Result};

/// Timing policy evaluated on access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Not-ready members unseen for longer than this count as ready
    pub auto_ready_timeout: Duration,
    /// Creator counts as connected if seen within this window
    pub creator_presence: Duration,
    /// Sessions inactive for longer than this are purged
    pub session_expiry: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self::from(&PolicyConfig::default())
    }
}

impl From<&PolicyConfig> for Policy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            auto_ready_timeout: secs(config.auto_ready_timeout_secs),
            creator_presence: secs(config.creator_presence_secs),
            session_expiry: Duration::days(config.session_expiry_days.min(MAX_POLICY_DAYS) as i64),
        }
    }
}

/// Upper bound for configured windows, keeps timestamp arithmetic in range
const MAX_POLICY_DAYS: u64 = 36_500;

fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_POLICY_DAYS * 86_400) as i64)
}

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

/// The session coordination engine
pub struct Coordinator {
    store: Arc<dyn Store>,
    events: EventBus,
    policy: Policy,
    locks: Mutex<LockTable>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn Store>, events: EventBus, policy: Policy) -> Self {
        Self {
            store,
            events,
            policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Lock a live session for a read-decide-write sequence
    ///
    /// The session is re-read under the lock. An unknown code leaves no
    /// entry behind in the lock table.
    pub(crate) async fn lock_session(&self, code: &str) -> Result<(OwnedMutexGuard<()>, Session)> {
        let guard = self.acquire_lock(code).await;
        match self.require_session(code).await {
            Ok(session) => Ok((guard, session)),
            Err(e) => {
                drop(guard);
                self.release_lock(code);
                Err(e)
            }
        }
    }

    async fn acquire_lock(&self, code: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(code.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry for `code` unless someone holds or awaits it
    pub(crate) fn release_lock(&self, code: &str) {
        let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if table.get(code).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            table.remove(code);
        }
    }

    /// Session codes with a lock entry that nobody currently holds
    pub(crate) fn idle_lock_codes(&self) -> Vec<String> {
        let table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        table
            .iter()
            .filter(|(_, lock)| Arc::strong_count(lock) == 1)
            .map(|(code, _)| code.clone())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) async fn require_session(&self, code: &str) -> Result<Session> {
        self.store
            .get_session(code)
            .await?
            .ok_or_else(|| Error::SessionNotFound(code.to_string()))
    }

    /// Fail with `WrongPhase` unless the session is in `expected`
    pub(crate) fn require_phase(session: &Session, expected: Phase) -> Result<()> {
        if session.phase != expected {
            return Err(Error::WrongPhase(session.phase.to_string()));
        }
        Ok(())
    }

    pub(crate) async fn require_member(&self, code: &str, member_id: &str) -> Result<Member> {
        self.store
            .get_member(code, member_id)
            .await?
            .ok_or_else(|| Error::MemberNotFound(member_id.to_string()))
    }

    /// Publish an event; nobody listening is normal
    pub(crate) fn emit(&self, event: SessionEvent) {
        let event_type = event.event_type();
        let code = event.session_code().to_string();
        match self.events.emit(event) {
            Ok(subscribers) => debug!(
                "Emitted {} for session {} to {} subscriber(s)",
                event_type, code, subscribers
            ),
            Err(_) => debug!("Emitted {} for session {} with no subscribers", event_type, code),
        }
    }
}
