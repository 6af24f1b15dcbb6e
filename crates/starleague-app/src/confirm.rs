// Human approval of pending actions, bounded by a timeout.

use std::time::Duration;

use async_trait::async_trait;
use starleague_core::validation::{Actor, Violation};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// What the approver is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmRequest {
    pub actor: Actor,
    /// Short description of the action, e.g. "draft P7 for team 3".
    pub action: String,
    pub warnings: Vec<Violation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Approved,
    Declined,
    TimedOut,
}

/// The collaborator that asks a human to approve or cancel an action.
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Resolve to `true` to approve. May wait indefinitely; callers bound it
    /// with [`await_confirmation`].
    async fn confirm(&self, request: &ConfirmRequest) -> bool;
}

/// Ask `confirmer` about `request`, cancelling once `timeout` elapses.
pub async fn await_confirmation(
    confirmer: &dyn Confirmer,
    request: &ConfirmRequest,
    timeout: Duration,
) -> Confirmation {
    match tokio::time::timeout(timeout, confirmer.confirm(request)).await {
        Ok(true) => Confirmation::Approved,
        Ok(false) => {
            debug!("confirmation declined: {}", request.action);
            Confirmation::Declined
        }
        Err(_) => {
            warn!("confirmation timed out after {:?}: {}", timeout, request.action);
            Confirmation::TimedOut
        }
    }
}

/// Answers every request the same way. Used by scripted runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _request: &ConfirmRequest) -> bool {
        self.0
    }
}

/// A request handed to whatever front end owns the conversation, with a
/// one-shot channel for the answer.
#[derive(Debug)]
pub struct PendingConfirmation {
    pub request: ConfirmRequest,
    pub reply: oneshot::Sender<bool>,
}

/// Forwards requests over an mpsc channel. A dropped reply or closed channel
/// counts as a decline.
#[derive(Debug, Clone)]
pub struct ChannelConfirmer {
    tx: mpsc::Sender<PendingConfirmation>,
}

impl ChannelConfirmer {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PendingConfirmation>) {
        let (tx, rx) = mpsc::channel(buffer);
        (ChannelConfirmer { tx }, rx)
    }
}

#[async_trait]
impl Confirmer for ChannelConfirmer {
    async fn confirm(&self, request: &ConfirmRequest) -> bool {
        let (reply, answer) = oneshot::channel();
        let pending = PendingConfirmation {
            request: request.clone(),
            reply,
        };
        if self.tx.send(pending).await.is_err() {
            warn!("confirmation channel closed; treating as declined");
            return false;
        }
        answer.await.unwrap_or(false)
    }
}
