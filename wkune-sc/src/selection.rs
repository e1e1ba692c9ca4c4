//! Selection engine
//!
//! Items are bucketed by the exact set of members who accept them, then a
//! two-stage draw picks a bucket uniformly and an item within it uniformly.
//! A popular bucket with many items therefore has no more weight than a
//! niche bucket with one.

use std::collections::{BTreeSet, HashMap};

use rand::Rng;
use tracing::{debug, info};
use wkune_common::db::{Member, Phase};
use wkune_common::events::SessionEvent;
use wkune_common::uuid_utils::normalize_session_code;
use wkune_common::{items_equal, normalize_item, Result};

use crate::coordinator::Coordinator;
use crate::items::pooled_items;

/// Items sharing one acceptor set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceGroup {
    pub acceptors: BTreeSet<String>,
    pub items: Vec<String>,
}

/// Acceptance groups in first-encounter order
pub type AcceptanceGroups = Vec<AcceptanceGroup>;

/// Pick an index in `0..n` from a scaled range
///
/// Draws uniformly from `[10000 * n, 90000 * n]` and reduces modulo `n`.
/// Returns 0 for `n == 0`.
pub fn fair_select<R: Rng + ?Sized>(rng: &mut R, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let low = 10_000u64 * n as u64;
    let high = 90_000u64 * n as u64;
    (rng.gen_range(low..=high) % n as u64) as usize
}

/// Bucket the pooled items of `members` by acceptor set
///
/// Owners accept their own items. An accepted string credits its acceptor
/// only when it matches a pooled item. Items matching `excluded` are left
/// out, as are items nobody accepts.
pub fn group_by_acceptance(members: &[Member], excluded: &[String]) -> AcceptanceGroups {
    let pooled = pooled_items(members);
    let keys: Vec<String> = pooled.iter().map(|item| normalize_item(item)).collect();
    let index_of: HashMap<&str, usize> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| (key.as_str(), i))
        .collect();

    let mut acceptors: Vec<BTreeSet<String>> = vec![BTreeSet::new(); pooled.len()];
    for member in members {
        for item in member.items.iter().chain(member.accepted_items.iter()) {
            if let Some(&i) = index_of.get(normalize_item(item).as_str()) {
                acceptors[i].insert(member.member_id.clone());
            }
        }
    }

    let mut groups: AcceptanceGroups = Vec::new();
    for (item, accepted_by) in pooled.into_iter().zip(acceptors) {
        if accepted_by.is_empty() || excluded.iter().any(|e| items_equal(e, &item)) {
            continue;
        }
        match groups.iter_mut().find(|g| g.acceptors == accepted_by) {
            Some(group) => group.items.push(item),
            None => groups.push(AcceptanceGroup {
                acceptors: accepted_by,
                items: vec![item],
            }),
        }
    }
    groups
}

/// Two-stage draw over the groups
pub fn draw<R: Rng + ?Sized>(rng: &mut R, groups: &[AcceptanceGroup]) -> Option<String> {
    if groups.is_empty() {
        return None;
    }
    let group = &groups[fair_select(rng, groups.len())];
    group.items.get(fair_select(rng, group.items.len())).cloned()
}

impl Coordinator {
    /// Current acceptance groups of the session
    pub async fn group_by_acceptance(&self, code: &str) -> Result<AcceptanceGroups> {
        let code = normalize_session_code(code);
        self.require_session(&code).await?;
        let members = self.store().get_active_members(&code).await?;
        let excluded = self.store().get_excluded_items(&code).await?;
        Ok(group_by_acceptance(&members, &excluded))
    }

    /// Draw a result and store it on the session
    pub async fn select_item(&self, code: &str) -> Result<Option<String>> {
        let code = normalize_session_code(code);
        let _guard = self.lock_session(&code).await?;
        self.select_locked(&code).await
    }

    /// Draw again with the exclusions unchanged
    pub async fn reroll(&self, code: &str) -> Result<Option<String>> {
        let code = normalize_session_code(code);
        let (_guard, session) = self.lock_session(&code).await?;
        Coordinator::require_phase(&session, Phase::Result)?;
        self.select_locked(&code).await
    }

    /// Exclude the current item, then draw
    ///
    /// With `current_item` of `None` the stored result is excluded.
    pub async fn roll_next(&self, code: &str, current_item: Option<&str>) -> Result<Option<String>> {
        let code = normalize_session_code(code);
        let (_guard, session) = self.lock_session(&code).await?;
        Coordinator::require_phase(&session, Phase::Result)?;

        let current = current_item
            .map(str::to_string)
            .or(session.current_result);
        if let Some(current) = current {
            let mut excluded = session.excluded_items;
            if !excluded.iter().any(|e| items_equal(e, &current)) {
                debug!("Excluding '{}' from draws in {}", current, code);
                excluded.push(current);
                self.store().set_excluded_items(&code, &excluded).await?;
            }
        }

        self.select_locked(&code).await
    }

    /// Selection; caller holds the session lock
    pub(crate) async fn select_locked(&self, code: &str) -> Result<Option<String>> {
        let members = self.store().get_active_members(code).await?;
        let excluded = self.store().get_excluded_items(code).await?;

        let mut groups = group_by_acceptance(&members, &excluded);
        if groups.is_empty() {
            // Every candidate was excluded: start the exclusion list over
            self.store().set_excluded_items(code, &[]).await?;
            groups = group_by_acceptance(&members, &[]);
        }

        let item = draw(&mut rand::thread_rng(), &groups);
        self.store().set_current_result(code, item.as_deref()).await?;

        match &item {
            Some(item) => info!(
                "Session {} selected '{}' from {} group(s)",
                code,
                item,
                groups.len()
            ),
            None => info!("Session {} has nothing to select", code),
        }
        self.emit(SessionEvent::result_selected(code, item.clone()));
        Ok(item)
    }
}
