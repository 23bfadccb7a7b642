//! Registry synchronizer.
//!
//! Holds the page-level view of every item's vote state. Mounting seeds it
//! from the local cache so the first render needs no network; one refresh
//! against the server then replaces it wholesale.

use lovevote_core::{AnonymousId, ItemId, VoteRegistry, VoteTally};

use crate::api::VoteApi;
use crate::cache::VoteCache;

/// What a call to [`VoteRegistrySync::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No identity yet; nothing fetched.
    AwaitingIdentity,
    /// This synchronizer already fetched once.
    AlreadyFetched,
    /// Server state replaced the local view.
    Updated,
    /// The fetch failed; the cached view was kept.
    KeptStale,
}

#[derive(Debug)]
pub struct VoteRegistrySync<A> {
    api: A,
    cache: VoteCache,
    votes: VoteRegistry,
    loading: bool,
    fetched: bool,
}

impl<A: VoteApi> VoteRegistrySync<A> {
    /// Seed the view synchronously from the cache.
    pub fn mount(api: A, cache: VoteCache) -> Self {
        let votes = cache.read();
        tracing::debug!(items = votes.len(), "Vote registry seeded from cache");
        Self {
            api,
            cache,
            votes,
            loading: true,
            fetched: false,
        }
    }

    /// Fetch the global snapshot for `voter`, at most once per synchronizer.
    ///
    /// Without an identity nothing happens and the view stays loading, so
    /// the call can simply be repeated once an identity exists. Errors are
    /// logged, never returned.
    pub async fn refresh(&mut self, voter: Option<&AnonymousId>) -> RefreshOutcome {
        let Some(voter) = voter else {
            return RefreshOutcome::AwaitingIdentity;
        };
        if self.fetched {
            return RefreshOutcome::AlreadyFetched;
        }

        // Marked only once the request resolves, so a dropped refresh can be
        // retried. `&mut self` already rules out two concurrent refreshes.
        let response = self.api.fetch_registry(voter).await;
        self.fetched = true;

        let outcome = match response {
            Ok(registry) => {
                self.cache.write(&registry);
                tracing::debug!(items = registry.len(), "Vote registry refreshed");
                self.votes = registry;
                RefreshOutcome::Updated
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch vote registry; keeping cached state");
                RefreshOutcome::KeptStale
            }
        };

        self.loading = false;
        outcome
    }

    /// True until the first fetch attempt has finished.
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn votes(&self) -> &VoteRegistry {
        &self.votes
    }

    #[must_use]
    pub fn tally(&self, item_id: &str) -> Option<VoteTally> {
        self.votes.get(item_id).copied()
    }

    /// Patch one item after a local toggle settled, persisting it too.
    pub fn record(&mut self, item_id: &ItemId, tally: VoteTally) {
        self.votes.insert(item_id.clone(), tally);
        self.cache.merge(item_id, tally);
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }
}
