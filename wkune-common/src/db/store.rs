//! Persistence contract consumed by the session coordinator
//!
//! The store is a keyed record store: sessions by code, members by
//! (code, member_id). It understands no policy; list-valued fields are
//! opaque ordered collections. Serializing read-decide-write sequences is
//! the caller's job (the coordinator holds a per-session lock).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{Member, Phase, Session};
use crate::Result;

/// Keyed record store for sessions and members
///
/// Methods that modify a member on behalf of that member (`items`,
/// `accepted_items`) also refresh the member's `last_seen_at` and the
/// session's `last_activity_at` to `now`.
#[async_trait]
pub trait Store: Send + Sync {
    // ----- sessions -----

    async fn session_exists(&self, code: &str) -> Result<bool>;

    /// Insert a session in ADDING plus the creator's member row.
    ///
    /// Returns `false` if the code is already taken.
    async fn create_session(&self, code: &str, creator_id: &str, now: DateTime<Utc>)
        -> Result<bool>;

    async fn get_session(&self, code: &str) -> Result<Option<Session>>;

    /// Set the phase and refresh session activity
    async fn set_phase(&self, code: &str, phase: Phase, now: DateTime<Utc>) -> Result<()>;

    /// Refresh session activity
    async fn touch_session(&self, code: &str, now: DateTime<Utc>) -> Result<()>;

    async fn set_current_result(&self, code: &str, item: Option<&str>) -> Result<()>;

    /// Remove a session and all its members
    async fn delete_session(&self, code: &str) -> Result<()>;

    /// Remove sessions whose last activity is before `cutoff`; returns how many
    async fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    // ----- members -----

    /// Insert a member. Returns `false` if (code, member_id) already exists.
    async fn add_member(
        &self,
        code: &str,
        member_id: &str,
        is_observer: bool,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    async fn get_member(&self, code: &str, member_id: &str) -> Result<Option<Member>>;

    /// All members in join order
    async fn get_all_members(&self, code: &str) -> Result<Vec<Member>>;

    /// Non-observer members in join order
    async fn get_active_members(&self, code: &str) -> Result<Vec<Member>> {
        let members = self.get_all_members(code).await?;
        Ok(members.into_iter().filter(Member::is_active).collect())
    }

    async fn update_member_items(
        &self,
        code: &str,
        member_id: &str,
        items: &[String],
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Flip the ready flag only; no timestamps change
    async fn set_member_ready(&self, code: &str, member_id: &str, ready: bool) -> Result<()>;

    async fn update_member_accepted_items(
        &self,
        code: &str,
        member_id: &str,
        accepted: &[String],
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn update_member_last_seen(
        &self,
        code: &str,
        member_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    // ----- session-scoped bulk updates -----

    async fn reset_all_ready(&self, code: &str) -> Result<()>;

    async fn reset_all_accepted(&self, code: &str) -> Result<()>;

    async fn clear_all_items(&self, code: &str) -> Result<()>;

    async fn promote_observers(&self, code: &str) -> Result<()>;

    // ----- exclusion list / restart votes -----

    async fn get_excluded_items(&self, code: &str) -> Result<Vec<String>>;

    async fn set_excluded_items(&self, code: &str, items: &[String]) -> Result<()>;

    async fn get_restart_votes(&self, code: &str) -> Result<Vec<String>>;

    /// Add a vote; no-op if the member already voted
    async fn add_restart_vote(&self, code: &str, member_id: &str) -> Result<()>;

    async fn clear_restart_votes(&self, code: &str) -> Result<()>;
}
