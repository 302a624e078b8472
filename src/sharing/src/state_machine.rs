//! Finite state machines for share objects and share items.
//!
//! Computing the next status ([`StateMachine::run_transition`]) never touches
//! the database. Persisting it is a separate `update_state*` call, so a
//! transition can be validated before anything is written.

use std::fmt::Display;
use std::marker::PhantomData;

use chrono::Utc;
use common::ShareObjectRepository;
use common::model::{
    ShareItem, ShareItemAction, ShareItemStatus, ShareObject, ShareObjectAction, ShareObjectStatus,
};
use sqlx::SqliteConnection;

use crate::error::{SharingError, SharingResult};

/// One edge group of a transition table: every status in `sources` moves to `target`.
#[derive(Debug)]
pub struct Transition<S: 'static> {
    pub target: S,
    pub sources: &'static [S],
}

/// A (status, action) -> status table.
pub trait TransitionTable {
    type Status: Copy + Eq + Display + 'static;
    type Action: Copy + Eq + Display;

    fn transitions(action: Self::Action) -> &'static [Transition<Self::Status>];
}

/// Evaluates a [`TransitionTable`] starting from a tracked status.
#[derive(Debug)]
pub struct StateMachine<T: TransitionTable> {
    status: T::Status,
    _table: PhantomData<T>,
}

impl<T: TransitionTable> StateMachine<T> {
    pub fn new(status: T::Status) -> Self {
        Self {
            status,
            _table: PhantomData,
        }
    }

    pub fn status(&self) -> T::Status {
        self.status
    }

    /// Next status for `action`, or `InvalidTransition` if the table has no such edge.
    pub fn run_transition(&self, action: T::Action) -> SharingResult<T::Status> {
        next_status::<T>(self.status, action)
    }
}

/// Pure lookup in the transition table.
pub fn next_status<T: TransitionTable>(
    from: T::Status,
    action: T::Action,
) -> SharingResult<T::Status> {
    T::transitions(action)
        .iter()
        .find(|transition| transition.sources.contains(&from))
        .map(|transition| transition.target)
        .ok_or_else(|| SharingError::InvalidTransition {
            from: from.to_string(),
            action: action.to_string(),
        })
}

#[derive(Debug)]
pub struct ShareObjectTransitions;

impl TransitionTable for ShareObjectTransitions {
    type Status = ShareObjectStatus;
    type Action = ShareObjectAction;

    fn transitions(action: ShareObjectAction) -> &'static [Transition<ShareObjectStatus>] {
        use ShareObjectStatus::*;

        match action {
            ShareObjectAction::Submit => &[Transition {
                target: Submitted,
                sources: &[Draft, Rejected],
            }],
            ShareObjectAction::Approve => &[Transition {
                target: Approved,
                sources: &[Submitted],
            }],
            ShareObjectAction::Reject => &[Transition {
                target: Rejected,
                sources: &[Submitted],
            }],
            ShareObjectAction::RevokeItems => &[Transition {
                target: Revoked,
                sources: &[Draft, Submitted, Rejected, Processed],
            }],
            ShareObjectAction::Start => &[
                Transition {
                    target: ShareInProgress,
                    sources: &[Approved],
                },
                Transition {
                    target: RevokeInProgress,
                    sources: &[Revoked],
                },
            ],
            ShareObjectAction::Finish => &[Transition {
                target: Processed,
                sources: &[ShareInProgress, RevokeInProgress],
            }],
            ShareObjectAction::FinishPending => &[Transition {
                target: Draft,
                sources: &[RevokeInProgress],
            }],
            ShareObjectAction::Delete => &[Transition {
                target: Deleted,
                sources: &[Rejected, Draft, Submitted, Processed],
            }],
            ShareObjectAction::AddItem => &[Transition {
                target: Draft,
                sources: &[Submitted, Rejected, Processed],
            }],
        }
    }
}

#[derive(Debug)]
pub struct ShareItemTransitions;

impl TransitionTable for ShareItemTransitions {
    type Status = ShareItemStatus;
    type Action = ShareItemAction;

    fn transitions(action: ShareItemAction) -> &'static [Transition<ShareItemStatus>] {
        use ShareItemStatus::*;

        match action {
            ShareItemAction::Submit => &[Transition {
                target: PendingApproval,
                sources: &[PendingApproval, ShareRejected, ShareFailed],
            }],
            ShareItemAction::Approve => &[Transition {
                target: ShareApproved,
                sources: &[PendingApproval],
            }],
            ShareItemAction::Reject => &[Transition {
                target: ShareRejected,
                sources: &[PendingApproval],
            }],
            ShareItemAction::Start => &[
                Transition {
                    target: ShareInProgress,
                    sources: &[ShareApproved],
                },
                Transition {
                    target: RevokeInProgress,
                    sources: &[RevokeApproved],
                },
            ],
            ShareItemAction::Success => &[
                Transition {
                    target: ShareSucceeded,
                    sources: &[ShareInProgress],
                },
                Transition {
                    target: RevokeSucceeded,
                    sources: &[RevokeInProgress],
                },
            ],
            ShareItemAction::Failure => &[
                Transition {
                    target: ShareFailed,
                    sources: &[ShareInProgress],
                },
                Transition {
                    target: RevokeFailed,
                    sources: &[RevokeInProgress],
                },
            ],
            ShareItemAction::RevokeItems => &[Transition {
                target: RevokeApproved,
                sources: &[ShareSucceeded, RevokeFailed],
            }],
            ShareItemAction::RemoveItem | ShareItemAction::Delete => &[Transition {
                target: Deleted,
                sources: &[PendingApproval, ShareRejected, ShareFailed, RevokeSucceeded],
            }],
        }
    }
}

pub type ShareObjectSM = StateMachine<ShareObjectTransitions>;
pub type ShareItemSM = StateMachine<ShareItemTransitions>;

impl StateMachine<ShareObjectTransitions> {
    /// Persist `new_status` on the share and adopt it as the tracked status.
    pub async fn update_state(
        &mut self,
        conn: &mut SqliteConnection,
        share: &mut ShareObject,
        new_status: ShareObjectStatus,
    ) -> SharingResult<()> {
        let now = Utc::now();
        ShareObjectRepository::update_share_status(conn, &share.share_uri, new_status, now).await?;
        log::debug!(
            "Share {} moved from {} to {new_status}",
            share.share_uri,
            share.status
        );
        share.status = new_status;
        share.updated = now;
        self.status = new_status;
        Ok(())
    }
}

impl StateMachine<ShareItemTransitions> {
    /// Move every item of the share that is in the tracked status to `new_status`.
    pub async fn update_state(
        &mut self,
        conn: &mut SqliteConnection,
        share_uri: &str,
        new_status: ShareItemStatus,
    ) -> SharingResult<u64> {
        let moved =
            ShareObjectRepository::update_share_items_status(conn, share_uri, self.status, new_status)
                .await?;
        log::debug!(
            "Moved {moved} items of share {share_uri} from {} to {new_status}",
            self.status
        );
        self.status = new_status;
        Ok(moved)
    }

    /// Persist `new_status` on a single item and adopt it as the tracked status.
    pub async fn update_state_single_item(
        &mut self,
        conn: &mut SqliteConnection,
        item: &mut ShareItem,
        new_status: ShareItemStatus,
    ) -> SharingResult<()> {
        let now = Utc::now();
        ShareObjectRepository::update_share_item_status(conn, &item.share_item_uri, new_status, now)
            .await?;
        item.status = new_status;
        item.updated = now;
        self.status = new_status;
        Ok(())
    }
}
