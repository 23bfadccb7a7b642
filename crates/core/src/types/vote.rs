//! Vote tallies, registries and wire payloads.
//!
//! A vote is the presence of a `(item_id, user_id)` row. Nothing here is
//! stored: tallies are derived on every read and registries are snapshots.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use super::id::ItemId;

/// Derived vote state of one item as seen by one (possibly anonymous) viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteTally {
    /// Number of voters who currently love the item.
    pub count: u64,
    /// Whether the viewer is one of them.
    pub loved: bool,
}

impl VoteTally {
    /// Create a tally.
    #[must_use]
    pub const fn new(count: u64, loved: bool) -> Self {
        Self { count, loved }
    }

    /// The tally predicted after the viewer flips their own vote.
    ///
    /// `loved` is inverted and `count` moves by one in the same direction.
    /// The count saturates at zero, which can only happen when the tally was
    /// already inconsistent (a loved item with a zero count).
    #[must_use]
    pub const fn toggled(self) -> Self {
        let loved = !self.loved;
        let count = if loved {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
        Self { count, loved }
    }
}

/// Post-toggle state returned by the vote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    /// Whether the voter loves the item after the toggle.
    pub loved: bool,
}

/// JSON body of every non-2xx JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short, client-safe description.
    pub error: String,
    /// Optional extra detail (e.g. which constraint a parameter violated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    /// Create an error body without details.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Attach details to the error body.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Mapping from item to tally, serialized as a JSON object keyed by item id.
///
/// Used both for the global snapshot returned by the endpoint and for the
/// client-side cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteRegistry(BTreeMap<ItemId, VoteTally>);

impl VoteRegistry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build the global snapshot from per-item counts and the items one
    /// voter has loved.
    ///
    /// Every counted item starts with `loved: false`. Every item in
    /// `loved_items` is then marked loved; an item missing from `counts`
    /// (its rows were deleted between the two reads) is inserted with a zero
    /// count rather than dropped.
    pub fn from_snapshot(
        counts: impl IntoIterator<Item = (ItemId, u64)>,
        loved_items: impl IntoIterator<Item = ItemId>,
    ) -> Self {
        let mut map: BTreeMap<ItemId, VoteTally> = counts
            .into_iter()
            .map(|(item, count)| (item, VoteTally::new(count, false)))
            .collect();

        for item in loved_items {
            map.entry(item).or_default().loved = true;
        }

        Self(map)
    }

    /// Look up the tally for an item.
    #[must_use]
    pub fn get(&self, item_id: &str) -> Option<&VoteTally> {
        self.0.get(item_id)
    }

    /// Insert or replace the tally for an item, returning the previous one.
    pub fn insert(&mut self, item_id: ItemId, tally: VoteTally) -> Option<VoteTally> {
        self.0.insert(item_id, tally)
    }

    /// Number of items in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over items and tallies in item order.
    pub fn iter(&self) -> btree_map::Iter<'_, ItemId, VoteTally> {
        self.0.iter()
    }
}

impl FromIterator<(ItemId, VoteTally)> for VoteRegistry {
    fn from_iter<I: IntoIterator<Item = (ItemId, VoteTally)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for VoteRegistry {
    type Item = (ItemId, VoteTally);
    type IntoIter = btree_map::IntoIter<ItemId, VoteTally>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a VoteRegistry {
    type Item = (&'a ItemId, &'a VoteTally);
    type IntoIter = btree_map::Iter<'a, ItemId, VoteTally>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(s: &str) -> ItemId {
        ItemId::parse(s).unwrap()
    }

    #[test]
    fn test_toggled_loves_and_unloves() {
        let start = VoteTally::new(4, false);
        let loved = start.toggled();
        assert_eq!(loved, VoteTally::new(5, true));
        assert_eq!(loved.toggled(), start);
    }

    #[test]
    fn test_toggled_saturates_at_zero() {
        let inconsistent = VoteTally::new(0, true);
        assert_eq!(inconsistent.toggled(), VoteTally::new(0, false));
    }

    #[test]
    fn test_snapshot_without_voter() {
        let registry = VoteRegistry::from_snapshot([(item("a"), 2), (item("b"), 1)], []);
        assert_eq!(registry.get("a"), Some(&VoteTally::new(2, false)));
        assert_eq!(registry.get("b"), Some(&VoteTally::new(1, false)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_snapshot_marks_voter_items() {
        let registry = VoteRegistry::from_snapshot([(item("a"), 2), (item("b"), 1)], [item("b")]);
        assert_eq!(registry.get("a"), Some(&VoteTally::new(2, false)));
        assert_eq!(registry.get("b"), Some(&VoteTally::new(1, true)));
    }

    /// A voter's item that vanished from the count query between the two
    /// reads still shows up as loved with a zero count.
    #[test]
    fn test_snapshot_keeps_zero_count_loved_entry() {
        let registry = VoteRegistry::from_snapshot([(item("a"), 1)], [item("gone")]);
        assert_eq!(registry.get("gone"), Some(&VoteTally::new(0, true)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_json_shape() {
        let registry = VoteRegistry::from_snapshot([(item("abc"), 1)], [item("abc")]);
        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json, serde_json::json!({"abc": {"count": 1, "loved": true}}));

        let empty = serde_json::to_string(&VoteRegistry::new()).unwrap();
        assert_eq!(empty, "{}");
    }

    #[test]
    fn test_error_body_omits_missing_details() {
        let body = serde_json::to_string(&ErrorBody::new("Missing itemId")).unwrap();
        assert_eq!(body, r#"{"error":"Missing itemId"}"#);

        let body = ErrorBody::new("Invalid itemId").with_details("too long");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["details"], "too long");
    }
}
