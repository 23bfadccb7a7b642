//! Per-item vote control.
//!
//! [`VoteControl`] is a synchronous two-state machine:
//!
//! ```text
//!            begin_toggle (flip loved, count ± 1)
//!   Idle ─────────────────────────────────────────▶ Pending { previous }
//!    ▲                                                   │
//!    └──── settle: agree │ correct loved │ roll back ────┘
//! ```
//!
//! While `Pending`, further toggles are ignored rather than queued, and late
//! server reads are not applied. [`VoteController`] drives the machine
//! against a [`VoteApi`] and can be shared between tasks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lovevote_core::{AnonymousId, ItemId, ToggleOutcome, VoteTally};

use crate::api::VoteApi;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPhase {
    Idle,
    /// A toggle request is in flight; `previous` is the state to restore if
    /// it fails.
    Pending { previous: VoteTally },
}

/// Where the displayed tally came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallySource {
    /// Initial value supplied by the host, not yet confirmed.
    Placeholder,
    /// Pushed down from the page registry.
    Preloaded,
    /// Read from the server by this control.
    Fetched,
}

/// A toggle that has been applied optimistically and awaits the server.
#[derive(Debug)]
#[must_use = "a started toggle must be settled"]
pub struct PendingToggle {
    item_id: ItemId,
    voter: AnonymousId,
    previous: VoteTally,
}

impl PendingToggle {
    #[must_use]
    pub const fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    #[must_use]
    pub const fn voter(&self) -> &AnonymousId {
        &self.voter
    }

    /// State before the optimistic flip.
    #[must_use]
    pub const fn previous(&self) -> VoteTally {
        self.previous
    }
}

/// A per-item read the control wants to perform.
#[derive(Debug)]
pub struct FetchRequest {
    pub item_id: ItemId,
    pub voter: AnonymousId,
}

/// How a toggle ended.
#[derive(Debug)]
pub enum ToggleResult {
    /// No identity, a toggle already in flight, or the control was disposed.
    Ignored,
    /// The server agreed with the optimistic state.
    Confirmed(VoteTally),
    /// The server disagreed on `loved`; the count was left as is.
    Corrected(VoteTally),
    /// The request failed; the pre-toggle state was restored.
    RolledBack { tally: VoteTally, error: ClientError },
    /// The control was disposed before the response arrived.
    Discarded,
}

impl ToggleResult {
    /// The settled tally, when the server accepted the toggle.
    #[must_use]
    pub const fn committed(&self) -> Option<VoteTally> {
        match self {
            Self::Confirmed(tally) | Self::Corrected(tally) => Some(*tally),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoteControl {
    item_id: ItemId,
    tally: VoteTally,
    phase: ControlPhase,
    source: TallySource,
    allow_fetch: bool,
    fetch_started: bool,
    disposed: bool,
}

impl VoteControl {
    /// Control showing `{count: 0, loved: false}` until seeded.
    #[must_use]
    pub const fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            tally: VoteTally::new(0, false),
            phase: ControlPhase::Idle,
            source: TallySource::Placeholder,
            allow_fetch: true,
            fetch_started: false,
            disposed: false,
        }
    }

    /// Placeholder count shown before any seed arrives.
    #[must_use]
    pub const fn with_initial_count(mut self, count: u64) -> Self {
        self.tally.count = count;
        self
    }

    /// Seed from the page registry. A preloaded control never fetches.
    #[must_use]
    pub const fn with_preloaded(mut self, preloaded: Option<VoteTally>) -> Self {
        if let Some(tally) = preloaded {
            self.tally = tally;
            self.source = TallySource::Preloaded;
        }
        self
    }

    /// Whether this control may read its own tally from the server.
    #[must_use]
    pub const fn with_allow_fetch(mut self, allow_fetch: bool) -> Self {
        self.allow_fetch = allow_fetch;
        self
    }

    #[must_use]
    pub const fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    #[must_use]
    pub const fn tally(&self) -> VoteTally {
        self.tally
    }

    #[must_use]
    pub const fn phase(&self) -> ControlPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.phase, ControlPhase::Pending { .. })
    }

    #[must_use]
    pub const fn source(&self) -> TallySource {
        self.source
    }

    /// Whether the tally came from the server (directly or via the registry).
    #[must_use]
    pub const fn is_seeded(&self) -> bool {
        !matches!(self.source, TallySource::Placeholder)
    }

    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Apply the optimistic flip and enter `Pending`.
    ///
    /// Returns `None`, leaving the state untouched, when there is no voter
    /// identity, a toggle is already pending, or the control is disposed.
    pub fn begin_toggle(&mut self, voter: Option<&AnonymousId>) -> Option<PendingToggle> {
        let voter = voter?;
        if self.disposed || self.is_pending() {
            return None;
        }

        let previous = self.tally;
        self.tally = previous.toggled();
        self.phase = ControlPhase::Pending { previous };

        Some(PendingToggle {
            item_id: self.item_id.clone(),
            voter: voter.clone(),
            previous,
        })
    }

    /// Reconcile the optimistic state with the server's answer.
    pub fn settle(
        &mut self,
        pending: PendingToggle,
        response: Result<ToggleOutcome, ClientError>,
    ) -> ToggleResult {
        if self.disposed {
            return ToggleResult::Discarded;
        }
        self.phase = ControlPhase::Idle;

        match response {
            Ok(ToggleOutcome { loved }) if loved == self.tally.loved => {
                ToggleResult::Confirmed(self.tally)
            }
            Ok(ToggleOutcome { loved }) => {
                self.tally.loved = loved;
                ToggleResult::Corrected(self.tally)
            }
            Err(error) => {
                self.tally = pending.previous;
                ToggleResult::RolledBack {
                    tally: self.tally,
                    error,
                }
            }
        }
    }

    /// Abandon a toggle whose response will never arrive.
    ///
    /// Restores the pre-toggle state and returns to `Idle`, exactly as a
    /// failed request would. A disposed control is left untouched.
    pub fn cancel(&mut self, pending: PendingToggle) {
        if self.disposed || !self.is_pending() {
            return;
        }
        self.tally = pending.previous;
        self.phase = ControlPhase::Idle;
    }

    /// Take a newer value from the page registry.
    ///
    /// Ignored while a toggle is pending or after disposal.
    pub fn apply_preloaded(&mut self, tally: VoteTally) -> bool {
        if self.disposed || self.is_pending() {
            return false;
        }
        self.tally = tally;
        self.source = TallySource::Preloaded;
        true
    }

    /// Claim the single per-item read, if this control should perform one.
    pub fn begin_fetch(&mut self, voter: Option<&AnonymousId>) -> Option<FetchRequest> {
        let voter = voter?;
        if self.disposed
            || !self.allow_fetch
            || self.fetch_started
            || self.source == TallySource::Preloaded
        {
            return None;
        }
        self.fetch_started = true;

        Some(FetchRequest {
            item_id: self.item_id.clone(),
            voter: voter.clone(),
        })
    }

    /// Apply the per-item read. Ignored if a toggle started meanwhile.
    pub fn apply_fetched(&mut self, tally: VoteTally) -> bool {
        if self.disposed || self.is_pending() {
            return false;
        }
        self.tally = tally;
        self.source = TallySource::Fetched;
        true
    }

    /// Release a claimed read that never completed, so it can be retried.
    pub fn cancel_fetch(&mut self, _request: FetchRequest) {
        self.fetch_started = false;
    }

    /// Stop accepting responses.
    pub const fn dispose(&mut self) {
        self.disposed = true;
    }
}

fn lock(control: &Mutex<VoteControl>) -> MutexGuard<'_, VoteControl> {
    control.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Toggle in flight; rolls the control back if dropped unsettled.
struct ToggleGuard<'a> {
    control: &'a Mutex<VoteControl>,
    pending: Option<PendingToggle>,
}

impl ToggleGuard<'_> {
    fn settle(mut self, response: Result<ToggleOutcome, ClientError>) -> ToggleResult {
        match self.pending.take() {
            Some(pending) => lock(self.control).settle(pending, response),
            None => ToggleResult::Discarded,
        }
    }
}

impl Drop for ToggleGuard<'_> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(item_id = %pending.item_id, "Toggle abandoned; rolled back");
            lock(self.control).cancel(pending);
        }
    }
}

/// Read in flight; releases the claim if dropped unfinished.
struct FetchGuard<'a> {
    control: &'a Mutex<VoteControl>,
    request: Option<FetchRequest>,
}

impl FetchGuard<'_> {
    fn finish(mut self) {
        self.request = None;
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            lock(self.control).cancel_fetch(request);
        }
    }
}

/// A [`VoteControl`] wired to a [`VoteApi`].
///
/// Clones share the same control, so at most one toggle request per item is
/// ever in flight no matter how many tasks press the button. Dropping a
/// `toggle` or `hydrate` future before it completes undoes its effect on
/// the control.
#[derive(Debug)]
pub struct VoteController<A> {
    api: Arc<A>,
    control: Arc<Mutex<VoteControl>>,
}

impl<A> Clone for VoteController<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            control: Arc::clone(&self.control),
        }
    }
}

impl<A: VoteApi> VoteController<A> {
    pub fn new(api: Arc<A>, control: VoteControl) -> Self {
        Self {
            api,
            control: Arc::new(Mutex::new(control)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VoteControl> {
        lock(&self.control)
    }

    /// Copy of the current machine state.
    #[must_use]
    pub fn snapshot(&self) -> VoteControl {
        self.lock().clone()
    }

    #[must_use]
    pub fn tally(&self) -> VoteTally {
        self.lock().tally()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().is_pending()
    }

    pub fn apply_preloaded(&self, tally: VoteTally) -> bool {
        self.lock().apply_preloaded(tally)
    }

    /// Perform the per-item read once, if the control wants one.
    ///
    /// Returns whether a fetched value was applied. Failures leave the
    /// placeholder in place and are only logged.
    pub async fn hydrate(&self, voter: Option<&AnonymousId>) -> bool {
        let request = {
            let mut control = self.lock();
            control.begin_fetch(voter)
        };
        let Some(request) = request else {
            return false;
        };

        let (item_id, voter) = (request.item_id.clone(), request.voter.clone());
        let guard = FetchGuard {
            control: &self.control,
            request: Some(request),
        };

        let response = self.api.fetch_tally(&item_id, &voter).await;
        guard.finish();

        match response {
            Ok(tally) => self.lock().apply_fetched(tally),
            Err(e) => {
                tracing::warn!(item_id = %item_id, error = %e, "Failed to fetch vote state");
                false
            }
        }
    }

    /// Toggle the voter's love with an optimistic update.
    pub async fn toggle(&self, voter: Option<&AnonymousId>) -> ToggleResult {
        let pending = {
            let mut control = self.lock();
            control.begin_toggle(voter)
        };
        let Some(pending) = pending else {
            tracing::debug!("Toggle ignored");
            return ToggleResult::Ignored;
        };

        let (item_id, voter) = (pending.item_id().clone(), pending.voter().clone());
        let guard = ToggleGuard {
            control: &self.control,
            pending: Some(pending),
        };

        let response = self.api.toggle(&item_id, &voter).await;
        let result = guard.settle(response);

        match &result {
            ToggleResult::Corrected(tally) => {
                tracing::info!(item_id = %item_id, loved = tally.loved, "Vote state corrected by server");
            }
            ToggleResult::RolledBack { error, .. } => {
                tracing::warn!(item_id = %item_id, error = %error, "Vote toggle failed; rolled back");
            }
            _ => {}
        }
        result
    }

    /// Stop applying responses to this control.
    pub fn dispose(&self) {
        self.lock().dispose();
    }
}
