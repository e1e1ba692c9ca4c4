//! Per-member view of a session
//!
//! Clients re-fetch this snapshot whenever an event arrives.

use serde::Serialize;
use wkune_common::db::Phase;
use wkune_common::time::{is_older_than, now};
use wkune_common::uuid_utils::normalize_session_code;
use wkune_common::Result;

use crate::coordinator::Coordinator;
use crate::items::pooled_items;
use crate::readiness::ReadinessStatus;

/// Everything a member's screen needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub code: String,
    pub phase: Phase,
    pub is_creator: bool,
    pub creator_connected: bool,
    pub is_observer: bool,
    pub my_items: Vec<String>,
    pub my_accepted_items: Vec<String>,
    pub is_ready: bool,
    #[serde(flatten)]
    pub readiness: ReadinessStatus,
    pub restart_votes: usize,
    pub current_result: Option<String>,
    /// Pooled items; empty outside RESULT
    pub all_items: Vec<String>,
}

impl Coordinator {
    /// Snapshot of the session as seen by `member_id`
    ///
    /// Runs the readiness tally, so stale members may be auto-readied.
    pub async fn session_state(&self, code: &str, member_id: &str) -> Result<SessionState> {
        let code = normalize_session_code(code);
        let (_guard, session) = self.lock_session(&code).await?;
        let readiness = self.tally_locked(&code).await?;
        let member = self.require_member(&code, member_id).await?;

        let creator_connected = match self.store().get_member(&code, &session.creator_id).await? {
            Some(creator) => {
                !is_older_than(creator.last_seen_at, self.policy().creator_presence, now())
            }
            None => false,
        };

        let all_items = if session.phase == Phase::Result {
            pooled_items(&self.store().get_active_members(&code).await?)
        } else {
            Vec::new()
        };

        Ok(SessionState {
            is_creator: session.creator_id == member.member_id,
            creator_connected,
            phase: session.phase,
            is_observer: member.is_observer,
            my_items: member.items,
            my_accepted_items: member.accepted_items,
            is_ready: member.is_ready,
            readiness,
            restart_votes: session.restart_votes.len(),
            current_result: session.current_result,
            all_items,
            code,
        })
    }
}
