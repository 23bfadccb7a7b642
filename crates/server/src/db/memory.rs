//! Process-local vote store.
//!
//! Keeps the same row-presence model as the `votes` table, grouped by item
//! and guarded by a single lock, so every operation (including toggle) is
//! atomic and a tally touches only its own item's voters.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use lovevote_core::{AnonymousId, ItemId, VoteRegistry, VoteTally};

/// Voters per item. Items without voters are never kept.
type Rows = BTreeMap<ItemId, BTreeSet<AnonymousId>>;

/// In-memory vote rows keyed by `(item_id, user_id)`.
#[derive(Clone, Debug, Default)]
pub struct MemoryVoteStore {
    rows: Arc<RwLock<Rows>>,
}

impl MemoryVoteStore {
    /// Global snapshot of every voted item.
    #[must_use]
    pub fn snapshot(&self, voter: Option<&AnonymousId>) -> VoteRegistry {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        rows.iter()
            .map(|(item_id, voters)| (item_id.clone(), tally_from(voters, voter)))
            .collect()
    }

    /// Tally of a single item.
    #[must_use]
    pub fn tally(&self, item_id: &ItemId, voter: Option<&AnonymousId>) -> VoteTally {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        tally_of(&rows, item_id, voter)
    }

    /// Tallies of several items, including items without votes.
    #[must_use]
    pub fn tallies(&self, item_ids: &[ItemId], voter: Option<&AnonymousId>) -> VoteRegistry {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        item_ids
            .iter()
            .map(|item_id| (item_id.clone(), tally_of(&rows, item_id, voter)))
            .collect()
    }

    /// Flip the voter's vote, returning whether the item is now loved.
    pub fn toggle(&self, item_id: &ItemId, voter: &AnonymousId) -> bool {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let voters = rows.entry(item_id.clone()).or_default();
        if voters.remove(voter) {
            if voters.is_empty() {
                rows.remove(item_id);
            }
            false
        } else {
            voters.insert(voter.clone());
            true
        }
    }

    /// Number of stored vote rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(BTreeSet::len)
            .sum()
    }

    /// Whether no votes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

fn tally_of(rows: &Rows, item_id: &ItemId, voter: Option<&AnonymousId>) -> VoteTally {
    rows.get(item_id)
        .map_or(VoteTally::new(0, false), |voters| tally_from(voters, voter))
}

fn tally_from(voters: &BTreeSet<AnonymousId>, voter: Option<&AnonymousId>) -> VoteTally {
    let count = u64::try_from(voters.len()).unwrap_or(u64::MAX);
    let loved = voter.is_some_and(|voter| voters.contains(voter));
    VoteTally::new(count, loved)
}
