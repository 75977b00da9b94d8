//! Push-then-pull reconciliation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::record::{DomainStore, SyncedRecord};
use super::report::{SyncCounts, SyncReport};
use crate::error::SyncError;
use crate::model::{Article, Domain, Tip};
use crate::network::Connectivity;
use crate::remote::{RemoteBackend, RemoteQuery};
use crate::storage::{
    ContentCache, DEFAULT_CONTENT_TTL, Database, GoalStore, KickStore, ProfileStore, SymptomStore,
    SyncStateTracker,
};

/// Remote article table.
pub const ARTICLES_TABLE: &str = "articles";
/// Remote tip table.
pub const TIPS_TABLE: &str = "tips";
/// Newest articles fetched per content refresh.
pub const ARTICLE_PULL_LIMIT: u32 = 100;

/// Options for [`SyncOrchestrator::sync_all`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Refresh the content cache after the user domains.
    pub include_content: bool,
    /// Do nothing when the reachability check reports offline.
    pub skip_if_offline: bool,
}

/// Reconciles the local store with the remote backend.
///
/// Conflict policy is last writer wins at row granularity: a pull overwrites
/// the local row whatever its status. Every write is an upsert keyed by id,
/// so overlapping runs cost redundant calls but cannot tear a row.
pub struct SyncOrchestrator<R> {
    remote: R,
    connectivity: Arc<dyn Connectivity>,
    db: Database,
    tracker: SyncStateTracker,
    profile: ProfileStore,
    kicks: KickStore,
    symptoms: SymptomStore,
    goals: GoalStore,
    content: ContentCache,
    content_ttl: Duration,
}

impl<R: RemoteBackend> SyncOrchestrator<R> {
    pub fn new(db: Database, remote: R, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            remote,
            connectivity,
            tracker: SyncStateTracker::new(db.clone()),
            profile: ProfileStore::new(db.clone()),
            kicks: KickStore::new(db.clone()),
            symptoms: SymptomStore::new(db.clone()),
            goals: GoalStore::new(db.clone()),
            content: ContentCache::new(db.clone()),
            content_ttl: DEFAULT_CONTENT_TTL,
            db,
        }
    }

    /// Override the lifetime of refreshed content.
    #[must_use]
    pub const fn with_content_ttl(mut self, ttl: Duration) -> Self {
        self.content_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn tracker(&self) -> &SyncStateTracker {
        &self.tracker
    }

    pub async fn is_online(&self) -> bool {
        self.connectivity.is_online().await
    }

    /// Run one cycle for `domain` and record its outcome.
    ///
    /// For the user domains this is push-then-pull; for
    /// [`Domain::Content`] it is a cache refresh and `owner` is unused.
    ///
    /// # Errors
    ///
    /// Returns the first error of the cycle. It has already been recorded
    /// in the sync state when this returns.
    pub async fn sync_domain(&self, owner: &str, domain: Domain) -> Result<SyncCounts, SyncError> {
        let result = match domain {
            Domain::Profile => self.reconcile(&self.profile, owner).await,
            Domain::Kicks => self.reconcile(&self.kicks, owner).await,
            Domain::Symptoms => self.reconcile(&self.symptoms, owner).await,
            Domain::Goals => self.reconcile(&self.goals, owner).await,
            Domain::Content => self.refresh_content().await,
        };
        self.record_outcome(domain, &result).await;
        result
    }

    /// Sync every domain for `owner`.
    ///
    /// Profile goes first. Kicks, symptoms and goals then run concurrently
    /// and fail independently. Content, when requested, runs last.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Partial`] when at least one domain failed; the
    /// others still ran and their results are in the carried report. Being
    /// offline with `skip_if_offline` set is not an error.
    pub async fn sync_all(&self, owner: &str, options: SyncOptions) -> Result<SyncReport, SyncError> {
        if options.skip_if_offline && !self.is_online().await {
            info!(owner, "Offline, skipping sync");
            return Ok(SyncReport::offline());
        }

        info!(owner, include_content = options.include_content, "Starting sync");
        let mut report = SyncReport::default();

        let profile = self.sync_domain(owner, Domain::Profile).await;
        report.record(Domain::Profile, &profile);

        let (kicks, symptoms, goals) = tokio::join!(
            self.sync_domain(owner, Domain::Kicks),
            self.sync_domain(owner, Domain::Symptoms),
            self.sync_domain(owner, Domain::Goals),
        );
        report.record(Domain::Kicks, &kicks);
        report.record(Domain::Symptoms, &symptoms);
        report.record(Domain::Goals, &goals);

        if options.include_content {
            let content = self.sync_domain(owner, Domain::Content).await;
            report.record(Domain::Content, &content);
        }

        info!(
            owner,
            pushed = report.total_pushed(),
            pulled = report.total_pulled(),
            failed = report.failed_domains().len(),
            "Sync finished"
        );
        report.into_result()
    }

    /// Push pending rows, then pull the remote set over the local one.
    async fn reconcile<S: DomainStore>(&self, store: &S, owner: &str) -> Result<SyncCounts, SyncError> {
        let domain = S::Record::DOMAIN;
        let store_err = |source| SyncError::Store { domain, source };
        let mut counts = SyncCounts::default();

        if S::Record::QUEUED {
            let pending = store.pending(owner).await.map_err(store_err)?;
            if pending.is_empty() {
                debug!(%domain, owner, "Nothing to push");
            } else {
                let pushed: Vec<(String, String)> = pending
                    .iter()
                    .map(|r| (r.id().to_string(), r.updated_at().to_string()))
                    .collect();
                let rows = pending
                    .iter()
                    .map(SyncedRecord::to_remote)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|source| SyncError::Decode { domain, source })?;

                self.remote
                    .upsert(S::Record::TABLE, rows)
                    .await
                    .map_err(|source| SyncError::Push { domain, source })?;
                counts.pushed = pushed.len();
                store.acknowledge(pushed).await.map_err(store_err)?;
                info!(%domain, owner, count = counts.pushed, "Pushed pending rows");
            }
        }

        let query = RemoteQuery::table(S::Record::TABLE)
            .owned_by(S::Record::OWNER_COLUMN, owner)
            .order_by(S::Record::ORDER_BY, S::Record::DESCENDING)
            .limit(S::Record::PULL_LIMIT);
        let rows = self
            .remote
            .select(&query)
            .await
            .map_err(|source| SyncError::Pull { domain, source })?;

        if rows.is_empty() {
            debug!(%domain, owner, "Remote has no rows");
            return Ok(counts);
        }

        let now = self.db.clock().now_iso();
        let records = rows
            .into_iter()
            .map(|row| S::Record::from_remote(row, &now))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| SyncError::Decode { domain, source })?;
        counts.pulled = records.len();
        store.store_pulled(records).await.map_err(store_err)?;
        info!(%domain, owner, count = counts.pulled, "Pulled remote rows");

        Ok(counts)
    }

    /// Fetch articles and tips, purge stale cache rows, write fresh batches.
    async fn refresh_content(&self) -> Result<SyncCounts, SyncError> {
        let domain = Domain::Content;
        let pull_err = |source| SyncError::Pull { domain, source };
        let store_err = |source| SyncError::Store { domain, source };
        let decode_err = |source| SyncError::Decode { domain, source };

        let articles_query = RemoteQuery::table(ARTICLES_TABLE)
            .order_by("published_at", true)
            .limit(Some(ARTICLE_PULL_LIMIT));
        let tips_query = RemoteQuery::table(TIPS_TABLE).order_by("week", false);

        let articles: Vec<Article> = self
            .remote
            .select(&articles_query)
            .await
            .map_err(pull_err)?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .map_err(decode_err)?;
        let tips: Vec<Tip> = self
            .remote
            .select(&tips_query)
            .await
            .map_err(pull_err)?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .map_err(decode_err)?;

        let purged = self.content.purge_expired().await.map_err(store_err)?;
        let counts = SyncCounts {
            pushed: 0,
            pulled: articles.len() + tips.len(),
        };
        self.content
            .cache_articles(articles, self.content_ttl)
            .await
            .map_err(store_err)?;
        self.content
            .cache_tips(tips, self.content_ttl)
            .await
            .map_err(store_err)?;

        info!(count = counts.pulled, purged, "Refreshed content cache");
        Ok(counts)
    }

    /// Write a cycle's outcome to the sync state. Bookkeeping failures never
    /// fail the cycle.
    async fn record_outcome(&self, domain: Domain, result: &Result<SyncCounts, SyncError>) {
        let written = match result {
            Ok(_) => self.tracker.record_success(domain).await,
            Err(e) => {
                warn!(%domain, error = %e, "Sync cycle failed");
                self.tracker.record_failure(domain, &e.to_string()).await
            }
        };
        if let Err(e) = written {
            warn!(%domain, error = %e, "Could not update sync state");
        }
    }
}

impl<R> std::fmt::Debug for SyncOrchestrator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("connectivity", &self.connectivity)
            .field("content_ttl", &self.content_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{GoalDraft, KickEntryDraft, SymptomLogDraft, SyncStatus};
    use crate::network::StaticConnectivity;
    use crate::remote::MemoryRemote;
    use crate::storage::{ContentFilter, KickFilter};
    use serde_json::json;

    const START: i64 = 1_736_497_800_000;

    struct Harness {
        db: Database,
        remote: MemoryRemote,
        net: StaticConnectivity,
        clock: ManualClock,
        sync: SyncOrchestrator<MemoryRemote>,
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(START);
        let db = Database::in_memory().with_clock(Arc::new(clock.clone()));
        let remote = MemoryRemote::new();
        let net = StaticConnectivity::online();
        let sync = SyncOrchestrator::new(db.clone(), remote.clone(), Arc::new(net.clone()));
        Harness {
            db,
            remote,
            net,
            clock,
            sync,
        }
    }

    #[tokio::test]
    async fn test_offline_kick_entry_syncs() {
        let h = harness();
        let kicks = KickStore::new(h.db.clone());
        let entry = kicks
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 3))
            .await
            .unwrap();

        let pending = kicks.get_pending("u1").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].sync_status, SyncStatus::Pending);

        let counts = h.sync.sync_domain("u1", Domain::Kicks).await.unwrap();
        assert_eq!(counts, SyncCounts { pushed: 1, pulled: 1 });

        assert!(kicks.get_pending("u1").await.unwrap().is_empty());
        let rows = kicks.get(KickFilter::owner("u1")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, entry.id);
        assert_eq!(rows[0].sync_status, SyncStatus::Synced);

        let remote_rows = h.remote.rows("kick_entries");
        assert_eq!(remote_rows.len(), 1);
        assert_eq!(remote_rows[0]["count"], 3);

        let state = h.sync.tracker().get(Domain::Kicks).await.unwrap();
        assert!(state.last_success_at.is_some());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_second_cycle_is_idempotent() {
        let h = harness();
        let goals = GoalStore::new(h.db.clone());
        goals.upsert(GoalDraft::new("u1", "Walk daily")).await.unwrap();

        h.sync.sync_domain("u1", Domain::Goals).await.unwrap();
        let first = goals.get_all("u1").await.unwrap();
        let upserts = h.remote.upsert_calls();

        let counts = h.sync.sync_domain("u1", Domain::Goals).await.unwrap();
        assert_eq!(counts.pushed, 0);
        assert_eq!(h.remote.upsert_calls(), upserts);
        assert_eq!(goals.get_all("u1").await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_push_failure_keeps_rows_pending_and_skips_pull() {
        let h = harness();
        let kicks = KickStore::new(h.db.clone());
        kicks
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "evening", 6))
            .await
            .unwrap();
        h.sync.tracker().record_success(Domain::Kicks).await.unwrap();
        let before = h.sync.tracker().get(Domain::Kicks).await.unwrap();

        h.remote.fail_table("kick_entries");
        let err = h.sync.sync_domain("u1", Domain::Kicks).await.unwrap_err();
        assert!(matches!(err, SyncError::Push { domain: Domain::Kicks, .. }));
        assert_eq!(h.remote.select_calls(), 0);

        assert_eq!(kicks.get_pending("u1").await.unwrap().len(), 1);
        let state = h.sync.tracker().get(Domain::Kicks).await.unwrap();
        assert!(state.last_error.unwrap().contains("push rejected"));
        assert_eq!(state.last_success_at, before.last_success_at);
    }

    #[tokio::test]
    async fn test_pull_overwrites_local_copy() {
        let h = harness();
        let goals = GoalStore::new(h.db.clone());
        let local = goals.upsert(GoalDraft::new("u1", "Old title")).await.unwrap();
        goals.mark_synced(vec![local.id.clone()]).await.unwrap();

        h.remote.insert_row(
            "goals",
            json!({
                "id": local.id,
                "user_id": "u1",
                "title": "Edited on the web",
                "category": "fitness",
                "target_date": null,
                "completed": true,
                "updated_at": "2025-01-11T00:00:00.000Z"
            }),
        );
        h.remote
            .insert_row("goals", json!({"id": "g-other", "user_id": "u2", "title": "Not mine"}));

        h.sync.sync_domain("u1", Domain::Goals).await.unwrap();

        let all = goals.get_all("u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Edited on the web");
        assert!(all[0].completed);
        assert_eq!(all[0].sync_status, SyncStatus::Synced);
        assert!(goals.get("g-other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pull_failure_leaves_local_rows() {
        let h = harness();
        let symptoms = SymptomStore::new(h.db.clone());
        let log = symptoms
            .upsert(SymptomLogDraft::new("u1", "nausea").with_severity(2))
            .await
            .unwrap();
        symptoms.mark_synced(vec![log.id]).await.unwrap();

        // Empty push, then the select fails.
        h.remote.fail_table("symptom_logs");
        let err = h.sync.sync_domain("u1", Domain::Symptoms).await.unwrap_err();
        assert!(matches!(err, SyncError::Pull { .. }));
        assert_eq!(symptoms.get_recent("u1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_symptom_pull_is_capped_to_most_recent() {
        let h = harness();
        for i in 0..205 {
            h.remote.insert_row(
                "symptom_logs",
                json!({
                    "id": format!("s{i:03}"),
                    "user_id": "u1",
                    "symptom": "backache",
                    "logged_at": format!("2025-01-01T00:{:02}:{:02}.000Z", i / 60, i % 60)
                }),
            );
        }

        let counts = h.sync.sync_domain("u1", Domain::Symptoms).await.unwrap();
        assert_eq!(counts.pulled, 200);
        let recent = SymptomStore::new(h.db.clone()).get_recent("u1", 1).await.unwrap();
        assert_eq!(recent[0].id, "s204");
    }

    #[tokio::test]
    async fn test_offline_skip_touches_nothing() {
        let h = harness();
        KickStore::new(h.db.clone())
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 1))
            .await
            .unwrap();
        h.net.set_online(false);

        let report = h
            .sync
            .sync_all(
                "u1",
                SyncOptions {
                    include_content: true,
                    skip_if_offline: true,
                },
            )
            .await
            .unwrap();

        assert!(report.skipped_offline);
        assert!(report.outcomes.is_empty());
        assert_eq!(h.remote.upsert_calls() + h.remote.select_calls(), 0);
        for (_, entry) in h.sync.tracker().all().await.unwrap() {
            assert_eq!(entry, crate::model::SyncStateEntry::default());
        }
    }

    #[tokio::test]
    async fn test_domain_failures_are_isolated() {
        let h = harness();
        KickStore::new(h.db.clone())
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 2))
            .await
            .unwrap();
        GoalStore::new(h.db.clone())
            .upsert(GoalDraft::new("u1", "Pack hospital bag"))
            .await
            .unwrap();
        h.remote.fail_table("goals");

        let err = h.sync.sync_all("u1", SyncOptions::default()).await.unwrap_err();
        let SyncError::Partial { failed, report } = err else {
            panic!("expected partial failure");
        };
        assert_eq!(failed, vec![Domain::Goals]);
        assert!(report.outcome(Domain::Kicks).is_some_and(|o| !o.is_failed()));
        assert!(report.outcome(Domain::Profile).is_some());
        assert!(report.outcome(Domain::Content).is_none());

        let tracker = h.sync.tracker();
        assert!(tracker.get(Domain::Kicks).await.unwrap().last_error.is_none());
        assert!(tracker.get(Domain::Goals).await.unwrap().last_error.is_some());
        assert!(KickStore::new(h.db.clone()).get_pending("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_profile_is_pulled_not_pushed() {
        let h = harness();
        h.remote.insert_row(
            "profiles",
            json!({"id": "u1", "display_name": "Ada", "due_date": "2025-06-01", "pregnancy_week": 21}),
        );

        h.sync.sync_domain("u1", Domain::Profile).await.unwrap();

        let profile = ProfileStore::new(h.db.clone()).get("u1").await.unwrap().unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
        assert_eq!(profile.sync_status, SyncStatus::Synced);
        assert_eq!(h.remote.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_content_refresh_and_failure_recorded_separately() {
        let h = harness();
        h.remote.insert_row(
            "articles",
            json!({"id": "a1", "title": "Eating well", "category": "Nutrition", "tags": ["food"]}),
        );
        h.remote
            .insert_row("tips", json!({"id": "t1", "title": "Hydrate", "week": 12}));

        let sync = SyncOrchestrator::new(h.db.clone(), h.remote.clone(), Arc::new(h.net.clone()))
            .with_content_ttl(Duration::from_secs(60));
        let report = sync
            .sync_all(
                "u1",
                SyncOptions {
                    include_content: true,
                    skip_if_offline: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            report.outcome(Domain::Content),
            Some(&crate::sync::DomainOutcome::Synced { pushed: 0, pulled: 2 })
        );

        let cache = ContentCache::new(h.db.clone());
        assert_eq!(cache.get_cached_articles(ContentFilter::default()).await.unwrap().len(), 1);

        // A failed refresh keeps the stale cache readable.
        h.clock.advance(Duration::from_secs(61));
        h.remote.fail_table("tips");
        let err = sync
            .sync_all(
                "u1",
                SyncOptions {
                    include_content: true,
                    skip_if_offline: false,
                },
            )
            .await
            .unwrap_err();
        let SyncError::Partial { failed, .. } = err else {
            panic!("expected partial failure");
        };
        assert_eq!(failed, vec![Domain::Content]);
        assert!(sync.tracker().get(Domain::Kicks).await.unwrap().last_error.is_none());
        assert!(sync.tracker().get(Domain::Content).await.unwrap().last_error.is_some());

        let stale = cache
            .get_cached_articles(ContentFilter::default().include_expired(true))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert!(cache.get_cached_articles(ContentFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_pull_without_remote_stamp_is_stable() {
        let h = harness();
        h.remote.insert_row(
            "kick_entries",
            json!({"id": "k1", "user_id": "u1", "date": "2025-01-10", "time_of_day": "night", "count": 4}),
        );
        let kicks = KickStore::new(h.db.clone());

        h.sync.sync_domain("u1", Domain::Kicks).await.unwrap();
        let first = kicks.get(KickFilter::owner("u1")).await.unwrap();

        h.clock.advance(Duration::from_secs(60));
        h.sync.sync_domain("u1", Domain::Kicks).await.unwrap();
        let second = kicks.get(KickFilter::owner("u1")).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_pull_keeps_fields_the_remote_row_omits() {
        let h = harness();
        let goals = GoalStore::new(h.db.clone());
        let mut draft = GoalDraft::new("u1", "Walk");
        draft.category = Some("fitness".into());
        let local = goals.upsert(draft).await.unwrap();
        goals.mark_synced(vec![local.id.clone()]).await.unwrap();

        h.remote.insert_row(
            "goals",
            json!({"id": local.id, "user_id": "u1", "title": "Walk daily", "completed": false}),
        );
        h.sync.sync_domain("u1", Domain::Goals).await.unwrap();

        let goal = goals.get(&local.id).await.unwrap().unwrap();
        assert_eq!(goal.title, "Walk daily");
        assert_eq!(goal.category.as_deref(), Some("fitness"));
        assert_eq!(goal.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_overlapping_full_syncs_converge() {
        let h = harness();
        let kicks = KickStore::new(h.db.clone());
        for (time_of_day, count) in [("morning", 3), ("afternoon", 5), ("evening", 8)] {
            kicks
                .upsert(KickEntryDraft::new("u1", "2025-01-10", time_of_day, count))
                .await
                .unwrap();
        }

        let (a, b) = tokio::join!(
            h.sync.sync_all("u1", SyncOptions::default()),
            h.sync.sync_all("u1", SyncOptions::default()),
        );
        a.unwrap();
        b.unwrap();

        let local = kicks.get(KickFilter::owner("u1")).await.unwrap();
        assert_eq!(local.len(), 3);
        assert!(local.iter().all(|k| k.sync_status == SyncStatus::Synced));
        assert!(kicks.get_pending("u1").await.unwrap().is_empty());

        let remote_rows = h.remote.rows("kick_entries");
        assert_eq!(remote_rows.len(), 3);
        let mut ids: Vec<&str> = remote_rows.iter().filter_map(|r| r["id"].as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_removed_goal_returns_on_next_pull() {
        let h = harness();
        let goals = GoalStore::new(h.db.clone());
        let goal = goals.upsert(GoalDraft::new("u1", "Birth plan")).await.unwrap();
        h.sync.sync_domain("u1", Domain::Goals).await.unwrap();

        goals.remove(&goal.id).await.unwrap();
        assert!(goals.get(&goal.id).await.unwrap().is_none());

        h.sync.sync_domain("u1", Domain::Goals).await.unwrap();
        assert!(goals.get(&goal.id).await.unwrap().is_some());
    }
}
