//! In-process [`VoteApi`] double for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use lovevote_core::{AnonymousId, ItemId, ToggleOutcome, VoteRegistry, VoteTally};
use tokio::sync::Notify;

use crate::api::VoteApi;
use crate::error::ClientError;

#[derive(Debug, Default)]
pub struct FakeApi {
    registry: Mutex<VoteRegistry>,
    registry_fails: AtomicBool,
    registry_calls: AtomicUsize,
    tally: Mutex<VoteTally>,
    tally_calls: AtomicUsize,
    /// Server answer to a toggle; `None` answers 500.
    toggle_answer: Mutex<Option<bool>>,
    toggle_calls: AtomicUsize,
    gated: bool,
    gate: Notify,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            toggle_answer: Mutex::new(Some(true)),
            ..Self::default()
        }
    }

    /// Every request blocks until [`FakeApi::release`].
    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::new()
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn set_registry(&self, registry: VoteRegistry) {
        *self.registry.lock().unwrap_or_else(PoisonError::into_inner) = registry;
    }

    pub fn fail_registry(&self) {
        self.registry_fails.store(true, Ordering::SeqCst);
    }

    pub fn set_tally(&self, tally: VoteTally) {
        *self.tally.lock().unwrap_or_else(PoisonError::into_inner) = tally;
    }

    pub fn answer_toggle(&self, answer: Option<bool>) {
        *self.toggle_answer.lock().unwrap_or_else(PoisonError::into_inner) = answer;
    }

    pub fn registry_calls(&self) -> usize {
        self.registry_calls.load(Ordering::SeqCst)
    }

    pub fn tally_calls(&self) -> usize {
        self.tally_calls.load(Ordering::SeqCst)
    }

    pub fn toggle_calls(&self) -> usize {
        self.toggle_calls.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        if self.gated {
            self.gate.notified().await;
        }
    }
}

fn server_error() -> ClientError {
    ClientError::Status {
        status: 500,
        error: "Database error".to_string(),
        details: None,
    }
}

impl VoteApi for FakeApi {
    async fn fetch_registry(&self, _voter: &AnonymousId) -> Result<VoteRegistry, ClientError> {
        self.registry_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if self.registry_fails.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn fetch_tally(
        &self,
        _item_id: &ItemId,
        _voter: &AnonymousId,
    ) -> Result<VoteTally, ClientError> {
        self.tally_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        Ok(*self.tally.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn toggle(
        &self,
        _item_id: &ItemId,
        _voter: &AnonymousId,
    ) -> Result<ToggleOutcome, ClientError> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        let answer = *self
            .toggle_answer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        answer
            .map(|loved| ToggleOutcome { loved })
            .ok_or_else(server_error)
    }
}
