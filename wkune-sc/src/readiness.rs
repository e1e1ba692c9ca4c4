//! Readiness barrier
//!
//! Active members flag themselves ready; members who stay silent longer than
//! the auto-ready timeout are counted (and stored) as ready so a vanished
//! participant cannot stall the group.

use serde::Serialize;
use tracing::{debug, info};
use wkune_common::db::Phase;
use wkune_common::events::SessionEvent;
use wkune_common::time::{is_older_than, now};
use wkune_common::uuid_utils::normalize_session_code;
use wkune_common::{Error, Result};

use crate::coordinator::Coordinator;

/// Readiness tally over the active members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadinessStatus {
    pub ready_count: usize,
    pub total_count: usize,
    pub all_ready: bool,
}

/// Result of a `set_ready` call, taken under one session lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadyOutcome {
    /// Phase entered by this call, if the barrier released
    pub advanced_to: Option<Phase>,
    /// Phase after the call
    pub phase: Phase,
    #[serde(flatten)]
    pub readiness: ReadinessStatus,
}

impl Coordinator {
    /// Set a member's ready flag and try to advance the phase
    pub async fn set_ready(&self, code: &str, member_id: &str, ready: bool) -> Result<ReadyOutcome> {
        let code = normalize_session_code(code);

        let (_guard, session) = self.lock_session(&code).await?;
        let member = self.require_member(&code, member_id).await?;

        if member.is_observer {
            return Err(Error::ObserverForbidden("set ready status"));
        }

        let ts = now();
        self.store().set_member_ready(&code, member_id, ready).await?;
        self.store().update_member_last_seen(&code, member_id, ts).await?;
        self.store().touch_session(&code, ts).await?;
        debug!("Member {} in {} ready={}", member_id, code, ready);

        let advanced = if ready {
            self.advance_locked(&code).await?
        } else {
            None
        };
        if advanced.is_none() {
            self.emit(SessionEvent::refresh(&code));
        }

        Ok(ReadyOutcome {
            advanced_to: advanced,
            phase: advanced.unwrap_or(session.phase),
            readiness: self.tally_locked(&code).await?,
        })
    }

    /// Tally readiness, auto-readying stale members
    pub async fn readiness_status(&self, code: &str) -> Result<ReadinessStatus> {
        let code = normalize_session_code(code);
        let _guard = self.lock_session(&code).await?;
        self.tally_locked(&code).await
    }

    /// Readiness tally; caller holds the session lock
    pub(crate) async fn tally_locked(&self, code: &str) -> Result<ReadinessStatus> {
        let members = self.store().get_active_members(code).await?;
        let ts = now();
        let timeout = self.policy().auto_ready_timeout;

        let mut ready_count = 0;
        for member in &members {
            if member.is_ready {
                ready_count += 1;
            } else if is_older_than(member.last_seen_at, timeout, ts) {
                self.store()
                    .set_member_ready(code, &member.member_id, true)
                    .await?;
                info!("Auto-ready for idle member {} in {}", member.member_id, code);
                ready_count += 1;
            }
        }

        let total_count = members.len();
        Ok(ReadinessStatus {
            ready_count,
            total_count,
            all_ready: total_count > 0 && ready_count == total_count,
        })
    }
}
