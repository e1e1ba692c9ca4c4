//! Session and member lifecycle
//!
//! Creation, join/rejoin, heartbeat, leave, creator presence, deletion and
//! expiry. Members are never deleted individually; a member who leaves keeps
//! their items and acceptances.

use serde::Serialize;
use tracing::{debug, info, warn};
use wkune_common::db::{Phase, Session};
use wkune_common::events::SessionEvent;
use wkune_common::time::{is_older_than, now};
use wkune_common::uuid_utils::{generate_session_code, normalize_session_code};
use wkune_common::{Error, Result};

use crate::coordinator::Coordinator;

/// Code draws before `create_session` gives up
const MAX_CODE_ATTEMPTS: usize = 64;

/// Result of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    /// Member already existed (or won a concurrent insert)
    pub rejoined: bool,
    pub is_observer: bool,
    pub phase: Phase,
}

impl Coordinator {
    /// Create a session in ADDING with `creator_id` as its first member
    pub async fn create_session(&self, creator_id: &str) -> Result<String> {
        let creator_id = creator_id.trim();
        if creator_id.is_empty() {
            return Err(Error::InvalidInput("creator id must not be empty".to_string()));
        }

        self.cleanup_expired().await?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_session_code(&mut rand::thread_rng());
            if self.store().session_exists(&code).await? {
                continue;
            }
            if self.store().create_session(&code, creator_id, now()).await? {
                info!("Session {} created by {}", code, creator_id);
                return Ok(code);
            }
            debug!("Session code {} taken at insert, drawing again", code);
        }

        Err(Error::Internal(format!(
            "no free session code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    /// Join a session, or refresh an existing membership
    ///
    /// New members joining after ADDING become observers until the next
    /// restart. A rejoin never changes the stored observer flag.
    pub async fn join(&self, code: &str, member_id: &str) -> Result<JoinOutcome> {
        let code = normalize_session_code(code);
        let member_id = member_id.trim();
        if member_id.is_empty() {
            return Err(Error::InvalidInput("member id must not be empty".to_string()));
        }

        let (_guard, session) = self.lock_session(&code).await?;
        let ts = now();

        if let Some(member) = self.store().get_member(&code, member_id).await? {
            self.store().update_member_last_seen(&code, member_id, ts).await?;
            self.store().touch_session(&code, ts).await?;
            debug!("Member {} rejoined session {}", member_id, code);
            self.emit(SessionEvent::refresh(&code));
            return Ok(JoinOutcome {
                rejoined: true,
                is_observer: member.is_observer,
                phase: session.phase,
            });
        }

        let is_observer = session.phase != Phase::Adding;
        if self.store().add_member(&code, member_id, is_observer, ts).await? {
            info!(
                "Member {} joined session {}{}",
                member_id,
                code,
                if is_observer { " as observer" } else { "" }
            );
            self.emit(SessionEvent::refresh(&code));
            return Ok(JoinOutcome {
                rejoined: false,
                is_observer,
                phase: session.phase,
            });
        }

        // Lost an insert race against another process sharing the store
        match self.store().get_member(&code, member_id).await? {
            Some(member) => {
                warn!("Concurrent join for {} in {}; treating as rejoin", member_id, code);
                Ok(JoinOutcome {
                    rejoined: true,
                    is_observer: member.is_observer,
                    phase: session.phase,
                })
            }
            None => Err(Error::JoinConflict(code)),
        }
    }

    /// Refresh a member's `last_seen_at`
    pub async fn heartbeat(&self, code: &str, member_id: &str) -> Result<()> {
        let code = normalize_session_code(code);
        let _guard = self.lock_session(&code).await?;
        self.require_member(&code, member_id).await?;
        self.store().update_member_last_seen(&code, member_id, now()).await
    }

    /// Mark a member as gone; nothing is deleted
    pub async fn leave(&self, code: &str, member_id: &str) -> Result<()> {
        let code = normalize_session_code(code);
        let _guard = self.lock_session(&code).await?;
        self.require_member(&code, member_id).await?;
        debug!("Member {} left session {}", member_id, code);
        self.emit(SessionEvent::refresh(&code));
        Ok(())
    }

    /// Clear the observer flag on every member
    pub async fn promote_observers(&self, code: &str) -> Result<()> {
        let code = normalize_session_code(code);
        let _guard = self.lock_session(&code).await?;
        self.store().promote_observers(&code).await
    }

    /// Look up a live session
    pub async fn get_session(&self, code: &str) -> Result<Session> {
        self.require_session(&normalize_session_code(code)).await
    }

    pub async fn is_creator(&self, code: &str, member_id: &str) -> Result<bool> {
        let code = normalize_session_code(code);
        let session = self.require_session(&code).await?;
        Ok(session.creator_id == member_id)
    }

    /// True if the creator was seen within the presence window
    pub async fn creator_connected(&self, code: &str) -> Result<bool> {
        let code = normalize_session_code(code);
        let session = self.require_session(&code).await?;
        let creator = self.store().get_member(&code, &session.creator_id).await?;
        Ok(creator.is_some_and(|c| {
            !is_older_than(c.last_seen_at, self.policy().creator_presence, now())
        }))
    }

    /// Remove a session and all its members
    pub async fn delete_session(&self, code: &str) -> Result<()> {
        let code = normalize_session_code(code);
        {
            let _guard = self.lock_session(&code).await?;
            self.store().delete_session(&code).await?;
        }
        self.release_lock(&code);
        info!("Session {} deleted", code);
        Ok(())
    }

    /// Purge sessions inactive for longer than the expiry window
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let cutoff = now() - self.policy().session_expiry;
        let removed = self.store().cleanup_expired(cutoff).await?;
        if removed > 0 {
            info!("Removed {} expired session(s)", removed);
        }
        self.prune_locks().await?;
        Ok(removed)
    }

    async fn prune_locks(&self) -> Result<()> {
        for code in self.idle_lock_codes() {
            if !self.store().session_exists(&code).await? {
                self.release_lock(&code);
            }
        }
        Ok(())
    }
}
