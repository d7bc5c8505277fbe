//! Lookups over the in-progress matches of an identity.

use tracing::warn;

use crate::{
    dao::{
        models::{MatchEntity, MatchId, MatchPatch},
        repository::MatchRepository,
    },
    state::identity::Identity,
};

/// Stateless view over the repository answering "what is still running?".
///
/// Read failures degrade to "nothing active" and are logged; callers that
/// need to tell the difference go through the repository directly.
#[derive(Clone)]
pub struct ActiveMatchRegistry {
    repository: MatchRepository,
}

impl ActiveMatchRegistry {
    pub fn new(repository: MatchRepository) -> Self {
        Self { repository }
    }

    /// In-progress matches of `identity`, newest first.
    pub async fn fetch_active_matches(&self, identity: &Identity) -> Vec<MatchEntity> {
        match self.repository.get_active_matches(identity).await {
            Ok(matches) => matches,
            Err(err) => {
                warn!(%identity, error = %err, "could not load active matches");
                Vec::new()
            }
        }
    }

    /// Most recently created in-progress match.
    ///
    /// Stores list newest first; on equal timestamps the earlier entry wins.
    pub async fn get_first_active_match(&self, identity: &Identity) -> Option<MatchEntity> {
        self.fetch_active_matches(identity)
            .await
            .into_iter()
            .reduce(|first, entity| {
                if entity.created_at > first.created_at {
                    entity
                } else {
                    first
                }
            })
    }

    pub async fn has_active_match(&self, identity: &Identity) -> bool {
        !self.fetch_active_matches(identity).await.is_empty()
    }

    pub async fn active_match_count(&self, identity: &Identity) -> usize {
        self.fetch_active_matches(identity).await.len()
    }

    /// Flag a match as no longer in progress. Returns whether the write landed.
    pub async fn mark_match_inactive(&self, id: &MatchId, identity: &Identity) -> bool {
        match self
            .repository
            .update_match(identity, id, MatchPatch::inactive())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(match_id = %id, %identity, error = %err, "could not mark match inactive");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::{
            match_store::{
                local::{LocalMatchStore, MemoryDeviceStorage},
                testing::FakeRemote,
            },
            models::{MatchType, NewMatchEntity, Side},
        },
        state::identity::{GuestId, UserId},
    };

    fn registry_with(remote: &FakeRemote) -> ActiveMatchRegistry {
        ActiveMatchRegistry::new(MatchRepository::new(
            Arc::new(LocalMatchStore::new(Arc::new(MemoryDeviceStorage::new()))),
            Some(Arc::new(remote.clone())),
        ))
    }

    fn active_match(score_p1: u32) -> NewMatchEntity {
        NewMatchEntity {
            score_p1,
            score_p2: 0,
            match_type: MatchType::Singles,
            scoring_rule: 11,
            team_a_name: Some("Ana".into()),
            team_b_name: Some("Bo".into()),
            duration_seconds: None,
            rally_count: score_p1,
            server: Side::TeamA,
            ended_at: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn guest_match_disappears_once_marked_inactive() {
        let registry = registry_with(&FakeRemote::new());
        let guest = Identity::Local(GuestId::new("guest_1_abc"));
        let created = registry
            .repository
            .save_match(&guest, active_match(3))
            .await
            .unwrap();

        let first = registry.get_first_active_match(&guest).await.unwrap();
        assert_eq!(first.id, created.id);
        assert!(registry.has_active_match(&guest).await);

        assert!(registry.mark_match_inactive(&created.id, &guest).await);

        assert!(registry.get_first_active_match(&guest).await.is_none());
        assert_eq!(registry.active_match_count(&guest).await, 0);
    }

    #[tokio::test]
    async fn newest_active_match_comes_first() {
        let registry = registry_with(&FakeRemote::new());
        let guest = Identity::Local(GuestId::new("guest_1_abc"));
        registry
            .repository
            .save_match(&guest, active_match(1))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newest = registry
            .repository
            .save_match(&guest, active_match(2))
            .await
            .unwrap();

        assert_eq!(registry.active_match_count(&guest).await, 2);
        let first = registry.get_first_active_match(&guest).await.unwrap();
        assert_eq!(first.id, newest.id);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_the_listed_order() {
        let registry = registry_with(&FakeRemote::new());
        let user = Identity::Remote(UserId::new("user-1"));
        registry
            .repository
            .save_matches(&user, vec![active_match(1), active_match(2)])
            .await
            .unwrap();

        let listed = registry.fetch_active_matches(&user).await;
        assert_eq!(listed[0].created_at, listed[1].created_at);
        let first = registry.get_first_active_match(&user).await.unwrap();
        assert_eq!(first.id, listed[0].id);
    }

    #[tokio::test]
    async fn read_failures_look_like_no_active_match() {
        let remote = FakeRemote::new();
        let registry = registry_with(&remote);
        let user = Identity::Remote(UserId::new("user-1"));
        registry
            .repository
            .save_match(&user, active_match(4))
            .await
            .unwrap();

        remote.fail_reads(true);
        assert!(!registry.has_active_match(&user).await);
        assert!(registry.get_first_active_match(&user).await.is_none());
    }

    #[tokio::test]
    async fn failed_inactive_write_reports_false() {
        let remote = FakeRemote::new();
        let registry = registry_with(&remote);
        let user = Identity::Remote(UserId::new("user-1"));
        let created = registry
            .repository
            .save_match(&user, active_match(0))
            .await
            .unwrap();

        remote.fail_writes(true);
        assert!(!registry.mark_match_inactive(&created.id, &user).await);
        remote.fail_writes(false);
        assert!(registry.has_active_match(&user).await);
    }
}
