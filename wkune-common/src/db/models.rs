//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Session phase
///
/// Moves forward ADDING → ACCEPTING → RESULT; only a unanimous restart
/// moves it back to ADDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Members propose items
    Adding,
    /// Members tick the items of others they would accept
    Accepting,
    /// A result has been drawn
    Result,
}

impl Phase {
    /// Storage / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Adding => "adding",
            Phase::Accepting => "accepting",
            Phase::Result => "result",
        }
    }

    /// Phase reached when the readiness barrier releases, if any
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Adding => Some(Phase::Accepting),
            Phase::Accepting => Some(Phase::Result),
            Phase::Result => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adding" => Ok(Phase::Adding),
            "accepting" => Ok(Phase::Accepting),
            "result" => Ok(Phase::Result),
            other => Err(Error::Internal(format!("unknown phase '{}'", other))),
        }
    }
}

/// Session record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub code: String,
    pub creator_id: String,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Items removed from the draw by roll-next, in exclusion order
    pub excluded_items: Vec<String>,
    /// Member ids who voted to restart, in vote order, no repeats
    pub restart_votes: Vec<String>,
    /// Last drawn result, shared by every member
    pub current_result: Option<String>,
}

/// Member record, identified by (session_code, member_id)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub session_code: String,
    pub member_id: String,
    /// Proposed items in display form
    pub items: Vec<String>,
    pub is_ready: bool,
    /// Items of other members this member accepts
    pub accepted_items: Vec<String>,
    pub is_observer: bool,
    pub last_seen_at: DateTime<Utc>,
}

impl Member {
    /// Active members take part in readiness, acceptance and voting
    pub fn is_active(&self) -> bool {
        !self.is_observer
    }
}
