//! Per-member item lists and acceptance lists

use tracing::debug;
use wkune_common::db::{Member, Phase};
use wkune_common::events::SessionEvent;
use wkune_common::time::now;
use wkune_common::uuid_utils::normalize_session_code;
use wkune_common::{dedup_items, is_duplicate_item, Error, Result};

use crate::coordinator::Coordinator;

/// Items of the given members, deduplicated by normalized key
///
/// Members are visited in join order and items in list order; the first
/// spelling seen wins.
pub fn pooled_items<'a, I>(members: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Member>,
{
    dedup_items(members.into_iter().flat_map(|m| m.items.iter()))
}

impl Coordinator {
    /// Append an item to the member's list, returning the new list
    pub async fn add_item(&self, code: &str, member_id: &str, text: &str) -> Result<Vec<String>> {
        let code = normalize_session_code(code);
        let text = text.trim();

        let (_guard, session) = self.lock_session(&code).await?;
        let member = self.require_member(&code, member_id).await?;

        if member.is_observer {
            return Err(Error::ObserverForbidden("add items"));
        }
        Coordinator::require_phase(&session, Phase::Adding)?;
        if member.is_ready {
            return Err(Error::AlreadyReady);
        }
        if is_duplicate_item(text, &member.items) {
            return Err(Error::EmptyOrDuplicateItem);
        }

        let mut items = member.items;
        items.push(text.to_string());
        self.store()
            .update_member_items(&code, member_id, &items, now())
            .await?;

        debug!("Member {} added item to {} ({} total)", member_id, code, items.len());
        self.emit(SessionEvent::refresh(&code));
        Ok(items)
    }

    /// Remove the item at `index`, returning the new list
    pub async fn remove_item(
        &self,
        code: &str,
        member_id: &str,
        index: usize,
    ) -> Result<Vec<String>> {
        let code = normalize_session_code(code);

        let (_guard, session) = self.lock_session(&code).await?;
        let member = self.require_member(&code, member_id).await?;

        Coordinator::require_phase(&session, Phase::Adding)?;
        if member.is_ready {
            return Err(Error::AlreadyReady);
        }
        if index >= member.items.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: member.items.len(),
            });
        }

        let mut items = member.items;
        items.remove(index);
        self.store()
            .update_member_items(&code, member_id, &items, now())
            .await?;

        self.emit(SessionEvent::refresh(&code));
        Ok(items)
    }

    /// Replace the member's accepted list verbatim
    pub async fn set_accepted_items(
        &self,
        code: &str,
        member_id: &str,
        accepted: &[String],
    ) -> Result<()> {
        let code = normalize_session_code(code);

        let (_guard, session) = self.lock_session(&code).await?;
        let member = self.require_member(&code, member_id).await?;

        if member.is_observer {
            return Err(Error::ObserverForbidden("accept items"));
        }
        Coordinator::require_phase(&session, Phase::Accepting)?;

        self.store()
            .update_member_accepted_items(&code, member_id, accepted, now())
            .await?;

        debug!("Member {} accepts {} item(s) in {}", member_id, accepted.len(), code);
        self.emit(SessionEvent::refresh(&code));
        Ok(())
    }

    /// Items of every other active member, deduplicated
    pub async fn items_for_acceptance(&self, code: &str, member_id: &str) -> Result<Vec<String>> {
        let code = normalize_session_code(code);
        self.require_session(&code).await?;
        let members = self.store().get_active_members(&code).await?;
        Ok(pooled_items(members.iter().filter(|m| m.member_id != member_id)))
    }

    /// Items of every active member, deduplicated
    pub async fn all_items(&self, code: &str) -> Result<Vec<String>> {
        let code = normalize_session_code(code);
        self.require_session(&code).await?;
        let members = self.store().get_active_members(&code).await?;
        Ok(pooled_items(&members))
    }

    /// Pooled items as newline-separated text
    pub async fn export_items(&self, code: &str) -> Result<String> {
        Ok(self.all_items(code).await?.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::test_support::{coordinator, session_with};
    use std::sync::Arc;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_item_trims_and_appends() {
        let coord = coordinator().await;
        let code = session_with(&coord, &[]).await;

        let items = coord.add_item(&code, "alice", "  Pizza  ").await.unwrap();
        assert_eq!(items, vec!["Pizza"]);
        let items = coord.add_item(&code, "alice", "Thai Curry").await.unwrap();
        assert_eq!(items, vec!["Pizza", "Thai Curry"]);
    }

    #[tokio::test]
    async fn test_add_item_rejects_normalized_duplicate() {
        let coord = coordinator().await;
        let code = session_with(&coord, &[]).await;

        coord.add_item(&code, "alice", "Pizza").await.unwrap();
        let err = coord.add_item(&code, "alice", " pizza!").await.unwrap_err();
        assert!(matches!(err, Error::EmptyOrDuplicateItem));

        let err = coord.add_item(&code, "alice", "  !!  ").await.unwrap_err();
        assert!(matches!(err, Error::EmptyOrDuplicateItem));
    }

    #[tokio::test]
    async fn test_same_item_allowed_for_different_members() {
        let coord = coordinator().await;
        let code = session_with(&coord, &["bob"]).await;

        coord.add_item(&code, "alice", "Pizza").await.unwrap();
        coord.add_item(&code, "bob", "PIZZA").await.unwrap();

        assert_eq!(coord.all_items(&code).await.unwrap(), vec!["Pizza"]);
    }

    #[tokio::test]
    async fn test_add_item_after_ready_fails() {
        let coord = coordinator().await;
        let code = session_with(&coord, &["bob"]).await;

        coord.set_ready(&code, "alice", true).await.unwrap();
        let err = coord.add_item(&code, "alice", "Pizza").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyReady));
    }

    #[tokio::test]
    async fn test_add_item_unknown_member() {
        let coord = coordinator().await;
        let code = session_with(&coord, &[]).await;
        let err = coord.add_item(&code, "mallory", "Pizza").await.unwrap_err();
        assert!(matches!(err, Error::MemberNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_item_by_index() {
        let coord = coordinator().await;
        let code = session_with(&coord, &[]).await;
        for item in ["A", "B", "C"] {
            coord.add_item(&code, "alice", item).await.unwrap();
        }

        let items = coord.remove_item(&code, "alice", 1).await.unwrap();
        assert_eq!(items, vec!["A", "C"]);

        let err = coord.remove_item(&code, "alice", 2).await.unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2 }));
    }

    #[tokio::test]
    async fn test_items_for_acceptance_excludes_own_and_observers() {
        let coord = coordinator().await;
        let code = session_with(&coord, &["bob", "carol"]).await;
        coord.add_item(&code, "alice", "Tea").await.unwrap();
        coord.add_item(&code, "bob", "Coffee").await.unwrap();
        coord.add_item(&code, "bob", "tea").await.unwrap();
        coord.add_item(&code, "carol", "Juice").await.unwrap();

        let for_alice = coord.items_for_acceptance(&code, "alice").await.unwrap();
        assert_eq!(for_alice, vec!["Coffee", "tea", "Juice"]);

        let for_bob = coord.items_for_acceptance(&code, "bob").await.unwrap();
        assert_eq!(for_bob, vec!["Tea", "Juice"]);

        coord
            .store()
            .set_phase(&code, Phase::Accepting, now())
            .await
            .unwrap();
        coord.join(&code, "dave").await.unwrap();
        let for_dave = coord.items_for_acceptance(&code, "dave").await.unwrap();
        assert_eq!(for_dave, vec!["Tea", "Coffee", "Juice"]);
    }

    /// Move a session with alice and bob into ACCEPTING
    async fn enter_accepting(coord: &Coordinator, code: &str) {
        coord.set_ready(code, "alice", true).await.unwrap();
        let outcome = coord.set_ready(code, "bob", true).await.unwrap();
        assert_eq!(outcome.phase, Phase::Accepting);
    }

    #[tokio::test]
    async fn test_set_accepted_items_replaces_list() {
        let coord = coordinator().await;
        let code = session_with(&coord, &["bob"]).await;
        enter_accepting(&coord, &code).await;

        coord
            .set_accepted_items(&code, "bob", &strings(&["Tea", "Coffee"]))
            .await
            .unwrap();
        coord.set_accepted_items(&code, "bob", &strings(&["Tea"])).await.unwrap();

        let bob = coord.store().get_member(&code, "bob").await.unwrap().unwrap();
        assert_eq!(bob.accepted_items, vec!["Tea"]);
    }

    #[tokio::test]
    async fn test_item_list_frozen_outside_adding() {
        let coord = coordinator().await;
        let code = session_with(&coord, &["bob"]).await;
        coord.add_item(&code, "alice", "Tea").await.unwrap();
        enter_accepting(&coord, &code).await;

        let err = coord.add_item(&code, "bob", "Sneaky").await.unwrap_err();
        assert!(matches!(err, Error::WrongPhase(phase) if phase == "accepting"));
        let err = coord.remove_item(&code, "alice", 0).await.unwrap_err();
        assert!(matches!(err, Error::WrongPhase(_)));

        let alice = coord.store().get_member(&code, "alice").await.unwrap().unwrap();
        assert_eq!(alice.items, vec!["Tea"]);
        let bob = coord.store().get_member(&code, "bob").await.unwrap().unwrap();
        assert!(bob.items.is_empty());
    }

    #[tokio::test]
    async fn test_accepting_only_during_accepting_phase() {
        let coord = coordinator().await;
        let code = session_with(&coord, &["bob"]).await;

        let err = coord
            .set_accepted_items(&code, "bob", &strings(&["Tea"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WrongPhase(phase) if phase == "adding"));

        enter_accepting(&coord, &code).await;
        coord.set_ready(&code, "alice", true).await.unwrap();
        coord.set_ready(&code, "bob", true).await.unwrap();

        let err = coord
            .set_accepted_items(&code, "bob", &strings(&["Tea"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WrongPhase(phase) if phase == "result"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_adds_keep_one() {
        let coord = Arc::new(coordinator().await);
        let code = session_with(&coord, &[]).await;

        let handles: Vec<_> = ["Pizza", " pizza!"]
            .into_iter()
            .map(|text| {
                let coord = Arc::clone(&coord);
                let code = code.clone();
                tokio::spawn(async move { coord.add_item(&code, "alice", text).await })
            })
            .collect();

        let mut added = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => added += 1,
                Err(Error::EmptyOrDuplicateItem) => duplicates += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!((added, duplicates), (1, 1));

        let alice = coord.store().get_member(&code, "alice").await.unwrap().unwrap();
        assert_eq!(alice.items.len(), 1);
    }

    #[tokio::test]
    async fn test_export_joins_with_newlines() {
        let coord = coordinator().await;
        let code = session_with(&coord, &["bob"]).await;
        coord.add_item(&code, "alice", "Tea").await.unwrap();
        coord.add_item(&code, "bob", "Coffee").await.unwrap();

        assert_eq!(coord.export_items(&code).await.unwrap(), "Tea\nCoffee");
    }

    #[tokio::test]
    async fn test_export_empty_session() {
        let coord = coordinator().await;
        let code = session_with(&coord, &[]).await;
        assert_eq!(coord.export_items(&code).await.unwrap(), "");
    }
}
