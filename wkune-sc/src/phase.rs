//! Phase state machine
//!
//! ADDING → ACCEPTING → RESULT, driven only by the readiness barrier. The
//! machine is passive: it advances when asked and never on a timer. The
//! way back to ADDING is the restart barrier.

use tracing::info;
use wkune_common::db::Phase;
use wkune_common::events::SessionEvent;
use wkune_common::time::now;
use wkune_common::uuid_utils::normalize_session_code;
use wkune_common::Result;

use crate::coordinator::Coordinator;

impl Coordinator {
    /// Advance the phase if every active member is ready
    pub async fn check_and_advance(&self, code: &str) -> Result<Option<Phase>> {
        let code = normalize_session_code(code);
        let _guard = self.lock_session(&code).await?;
        self.advance_locked(&code).await
    }

    /// Phase advancement; caller holds the session lock
    pub(crate) async fn advance_locked(&self, code: &str) -> Result<Option<Phase>> {
        let session = self.require_session(code).await?;
        let status = self.tally_locked(code).await?;
        if !status.all_ready {
            return Ok(None);
        }

        let Some(next) = session.phase.next() else {
            return Ok(None);
        };
        // Acceptance starts with a fresh barrier; RESULT keeps the flags
        if next == Phase::Accepting {
            self.store().reset_all_ready(code).await?;
        }
        self.store().set_phase(code, next, now()).await?;

        info!("Session {} entered {}", code, next);
        self.emit(SessionEvent::phase_changed(code, next));

        if next == Phase::Result {
            self.select_locked(code).await?;
        }
        Ok(Some(next))
    }
}
