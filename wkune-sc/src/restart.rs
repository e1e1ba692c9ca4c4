//! Restart barrier
//!
//! A unanimous vote of the active members sends the session back to ADDING
//! with a clean slate. Observers may vote, but only active members are
//! required for unanimity.

use serde::Serialize;
use tracing::{debug, info};
use wkune_common::db::Phase;
use wkune_common::events::SessionEvent;
use wkune_common::time::now;
use wkune_common::uuid_utils::normalize_session_code;
use wkune_common::Result;

use crate::coordinator::Coordinator;

/// Restart vote tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestartVoteStatus {
    /// Size of the recorded vote set, observers included
    pub votes: usize,
    /// Active members
    pub total: usize,
    pub all_voted: bool,
}

impl Coordinator {
    /// Record a restart vote; a completing vote resets the session
    pub async fn vote_restart(&self, code: &str, member_id: &str) -> Result<RestartVoteStatus> {
        let code = normalize_session_code(code);
        let (_guard, session) = self.lock_session(&code).await?;
        self.require_member(&code, member_id).await?;
        Coordinator::require_phase(&session, Phase::Result)?;

        self.store().add_restart_vote(&code, member_id).await?;
        self.store().touch_session(&code, now()).await?;

        let votes = self.store().get_restart_votes(&code).await?;
        let active = self.store().get_active_members(&code).await?;
        let all_voted = !active.is_empty()
            && active
                .iter()
                .all(|m| votes.iter().any(|v| *v == m.member_id));

        let status = RestartVoteStatus {
            votes: votes.len(),
            total: active.len(),
            all_voted,
        };
        debug!(
            "Restart vote by {} in {}: {}/{}",
            member_id, code, status.votes, status.total
        );

        if all_voted {
            self.start_fresh_locked(&code).await?;
        } else {
            self.emit(SessionEvent::restart_vote_update(&code, status.votes, status.total));
        }
        Ok(status)
    }

    /// Reset the session to ADDING, promoting observers
    pub async fn start_fresh(&self, code: &str) -> Result<()> {
        let code = normalize_session_code(code);
        let _guard = self.lock_session(&code).await?;
        self.start_fresh_locked(&code).await
    }

    /// Session reset; caller holds the session lock
    async fn start_fresh_locked(&self, code: &str) -> Result<()> {
        let store = self.store();
        store.clear_all_items(code).await?;
        store.reset_all_ready(code).await?;
        store.reset_all_accepted(code).await?;
        store.set_excluded_items(code, &[]).await?;
        store.clear_restart_votes(code).await?;
        store.set_current_result(code, None).await?;
        store.promote_observers(code).await?;
        store.set_phase(code, Phase::Adding, now()).await?;

        info!("Session {} reset for a fresh round", code);
        self.emit(SessionEvent::session_reset(code));
        Ok(())
    }
}
