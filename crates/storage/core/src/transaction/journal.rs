//! Per-scope rollback bookkeeping behind [`Transaction`](super::Transaction).

use std::collections::HashSet;
use std::rc::Rc;

use super::{Participant, TransactionResult};

/// Identity of a registered participant (its shared allocation address).
pub(super) type ParticipantId = usize;

pub(super) fn participant_id<P>(participant: &Rc<P>) -> ParticipantId {
    Rc::as_ptr(participant) as *const () as usize
}

/// Type-erased captured state of one participant.
trait Captured {
    fn restore(self: Box<Self>);

    fn finalize(self: Box<Self>);
}

struct CapturedState<P: Participant> {
    participant: Rc<P>,
    snapshot: P::Snapshot,
}

impl<P: Participant> Captured for CapturedState<P> {
    fn restore(self: Box<Self>) {
        let Self {
            participant,
            snapshot,
        } = *self;
        participant.restore(snapshot);
    }

    fn finalize(self: Box<Self>) {
        self.participant.on_final_commit();
    }
}

/// Snapshots taken within one open scope, in registration order.
#[derive(Default)]
struct Scope {
    registered: HashSet<ParticipantId>,
    entries: Vec<(ParticipantId, Box<dyn Captured>)>,
}

/// Stack of open scopes for one outermost transaction.
#[derive(Default)]
pub(super) struct Journal {
    scopes: Vec<Scope>,
    outer_close_callbacks: Vec<Box<dyn FnOnce(TransactionResult)>>,
}

impl Journal {
    pub(super) fn open_scope(&mut self) -> usize {
        self.scopes.push(Scope::default());
        self.scopes.len() - 1
    }

    pub(super) fn innermost_depth(&self) -> Option<usize> {
        self.scopes.len().checked_sub(1)
    }

    /// Captures `participant` in the innermost scope unless already captured there.
    ///
    /// Returns whether a new snapshot was taken.
    pub(super) fn capture<P: Participant + 'static>(&mut self, participant: &Rc<P>) -> bool {
        let id = participant_id(participant);
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        if !scope.registered.insert(id) {
            return false;
        }
        let captured = CapturedState {
            participant: Rc::clone(participant),
            snapshot: participant.capture(),
        };
        scope.entries.push((id, Box::new(captured)));
        true
    }

    pub(super) fn add_outer_close_callback(
        &mut self,
        callback: Box<dyn FnOnce(TransactionResult)>,
    ) {
        self.outer_close_callbacks.push(callback);
    }

    /// Closes the innermost scope, which must sit at `depth`.
    pub(super) fn close_scope(&mut self, depth: usize, result: TransactionResult) {
        assert_eq!(
            self.innermost_depth(),
            Some(depth),
            "transaction closed out of nesting order"
        );
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        if self.scopes.is_empty() {
            // Listeners may open a fresh outermost scope from here on
            super::mark_outer_closed();
        }
        let participants = scope.entries.len();

        match result {
            TransactionResult::Aborted => {
                for (_, captured) in scope.entries.into_iter().rev() {
                    captured.restore();
                }
            }
            TransactionResult::Committed => match self.scopes.last_mut() {
                Some(parent) => {
                    for (id, captured) in scope.entries {
                        // The parent's older snapshot wins; ours is discarded
                        if parent.registered.insert(id) {
                            parent.entries.push((id, captured));
                        }
                    }
                }
                None => {
                    for (_, captured) in scope.entries {
                        captured.finalize();
                    }
                }
            },
        }

        tracing::trace!(depth, ?result, participants, "closed transaction scope");

        if depth == 0 {
            for callback in self.outer_close_callbacks.drain(..) {
                callback(result);
            }
        }
    }
}
