//! SQLite implementation of the [`Store`] contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::models::{Member, Phase, Session};
use super::store::Store;
use crate::time::{from_millis, to_millis};
use crate::Result;

/// Store backed by a sqlx SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn encode_list(items: &[String]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

fn decode_list(raw: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn session_from_row(row: &SqliteRow) -> Result<Session> {
    let phase: String = row.try_get("phase")?;
    let excluded: String = row.try_get("excluded_items")?;
    let votes: String = row.try_get("restart_votes")?;
    Ok(Session {
        code: row.try_get("code")?,
        creator_id: row.try_get("creator_id")?,
        phase: phase.parse()?,
        created_at: from_millis(row.try_get("created_at")?),
        last_activity_at: from_millis(row.try_get("last_activity_at")?),
        excluded_items: decode_list(&excluded)?,
        restart_votes: decode_list(&votes)?,
        current_result: row.try_get("current_result")?,
    })
}

fn member_from_row(row: &SqliteRow) -> Result<Member> {
    let items: String = row.try_get("items")?;
    let accepted: String = row.try_get("accepted_items")?;
    Ok(Member {
        session_code: row.try_get("session_code")?,
        member_id: row.try_get("member_id")?,
        items: decode_list(&items)?,
        is_ready: row.try_get("is_ready")?,
        accepted_items: decode_list(&accepted)?,
        is_observer: row.try_get("is_observer")?,
        last_seen_at: from_millis(row.try_get("last_seen_at")?),
    })
}

const MEMBER_COLUMNS: &str =
    "session_code, member_id, items, is_ready, accepted_items, is_observer, last_seen_at";

#[async_trait]
impl Store for SqliteStore {
    async fn session_exists(&self, code: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sessions WHERE code = ?)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create_session(
        &self,
        code: &str,
        creator_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let ts = to_millis(now);
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO sessions (code, creator_id, phase, created_at, last_activity_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(code)
        .bind(creator_id)
        .bind(Phase::Adding.as_str())
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                debug!("Session code {} already taken", code);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        sqlx::query("INSERT INTO members (session_code, member_id, last_seen_at) VALUES (?, ?, ?)")
            .bind(code)
            .bind(creator_id)
            .bind(ts)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_session(&self, code: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT code, creator_id, phase, created_at, last_activity_at,
                   excluded_items, restart_votes, current_result
            FROM sessions WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn set_phase(&self, code: &str, phase: Phase, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sessions SET phase = ?, last_activity_at = ? WHERE code = ?")
            .bind(phase.as_str())
            .bind(to_millis(now))
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch_session(&self, code: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sessions SET last_activity_at = ? WHERE code = ?")
            .bind(to_millis(now))
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_current_result(&self, code: &str, item: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE sessions SET current_result = ? WHERE code = ?")
            .bind(item)
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, code: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM members WHERE session_code = ?")
            .bind(code)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE code = ?")
            .bind(code)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let cutoff = to_millis(cutoff);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            DELETE FROM members WHERE session_code IN
                (SELECT code FROM sessions WHERE last_activity_at < ?)
            "#,
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;
        let deleted = sqlx::query("DELETE FROM sessions WHERE last_activity_at < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted)
    }

    async fn add_member(
        &self,
        code: &str,
        member_id: &str,
        is_observer: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let ts = to_millis(now);
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO members (session_code, member_id, is_observer, last_seen_at) VALUES (?, ?, ?, ?)",
        )
        .bind(code)
        .bind(member_id)
        .bind(is_observer)
        .bind(ts)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        sqlx::query("UPDATE sessions SET last_activity_at = ? WHERE code = ?")
            .bind(ts)
            .bind(code)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_member(&self, code: &str, member_id: &str) -> Result<Option<Member>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM members WHERE session_code = ? AND member_id = ?",
            MEMBER_COLUMNS
        ))
        .bind(code)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(member_from_row).transpose()
    }

    async fn get_all_members(&self, code: &str) -> Result<Vec<Member>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM members WHERE session_code = ? ORDER BY id",
            MEMBER_COLUMNS
        ))
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    async fn update_member_items(
        &self,
        code: &str,
        member_id: &str,
        items: &[String],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ts = to_millis(now);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE members SET items = ?, last_seen_at = ? WHERE session_code = ? AND member_id = ?",
        )
        .bind(encode_list(items)?)
        .bind(ts)
        .bind(code)
        .bind(member_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE sessions SET last_activity_at = ? WHERE code = ?")
            .bind(ts)
            .bind(code)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_member_ready(&self, code: &str, member_id: &str, ready: bool) -> Result<()> {
        sqlx::query("UPDATE members SET is_ready = ? WHERE session_code = ? AND member_id = ?")
            .bind(ready)
            .bind(code)
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_member_accepted_items(
        &self,
        code: &str,
        member_id: &str,
        accepted: &[String],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ts = to_millis(now);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE members SET accepted_items = ?, last_seen_at = ? WHERE session_code = ? AND member_id = ?",
        )
        .bind(encode_list(accepted)?)
        .bind(ts)
        .bind(code)
        .bind(member_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE sessions SET last_activity_at = ? WHERE code = ?")
            .bind(ts)
            .bind(code)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_member_last_seen(
        &self,
        code: &str,
        member_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE members SET last_seen_at = ? WHERE session_code = ? AND member_id = ?")
            .bind(to_millis(now))
            .bind(code)
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset_all_ready(&self, code: &str) -> Result<()> {
        sqlx::query("UPDATE members SET is_ready = 0 WHERE session_code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset_all_accepted(&self, code: &str) -> Result<()> {
        sqlx::query("UPDATE members SET accepted_items = '[]' WHERE session_code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_all_items(&self, code: &str) -> Result<()> {
        sqlx::query("UPDATE members SET items = '[]' WHERE session_code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn promote_observers(&self, code: &str) -> Result<()> {
        sqlx::query("UPDATE members SET is_observer = 0 WHERE session_code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_excluded_items(&self, code: &str) -> Result<Vec<String>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT excluded_items FROM sessions WHERE code = ?")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        raw.map(|r| decode_list(&r)).transpose().map(Option::unwrap_or_default)
    }

    async fn set_excluded_items(&self, code: &str, items: &[String]) -> Result<()> {
        sqlx::query("UPDATE sessions SET excluded_items = ? WHERE code = ?")
            .bind(encode_list(items)?)
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_restart_votes(&self, code: &str) -> Result<Vec<String>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT restart_votes FROM sessions WHERE code = ?")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        raw.map(|r| decode_list(&r)).transpose().map(Option::unwrap_or_default)
    }

    async fn add_restart_vote(&self, code: &str, member_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let raw: Option<String> =
            sqlx::query_scalar("SELECT restart_votes FROM sessions WHERE code = ?")
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(raw) = raw else {
            return Ok(());
        };

        let mut votes = decode_list(&raw)?;
        if !votes.iter().any(|v| v == member_id) {
            votes.push(member_id.to_string());
            sqlx::query("UPDATE sessions SET restart_votes = ? WHERE code = ?")
                .bind(encode_list(&votes)?)
                .bind(code)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear_restart_votes(&self, code: &str) -> Result<()> {
        sqlx::query("UPDATE sessions SET restart_votes = '[]' WHERE code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
