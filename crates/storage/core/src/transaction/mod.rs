//! Nested rollback scopes for composite storage operations.
//!
//! A [`Transaction`] is not a concurrency primitive: it is a snapshot/rollback
//! boundary executed entirely within one logical step. Anything mutated under
//! a scope registers as a [`Participant`] before its first mutation in that
//! scope, handing the scope an immutable snapshot of its prior state.
//!
//! # Closing rules
//!
//! - **Abort** restores every participant captured in the closing scope.
//! - **Commit** of a nested scope hands each snapshot to the parent, unless
//!   the parent already holds an older one for the same participant.
//! - **Commit** of the outermost scope drops all snapshots and calls
//!   [`Participant::on_final_commit`] once per participant.
//!
//! Misuse is ruled out by the borrow checker: a nested scope mutably borrows
//! its parent, `commit`/`abort` consume the handle, and dropping a scope that
//! was never closed aborts it. At most one outermost scope may be open per
//! thread; opening a second one panics.

mod journal;

use std::cell::Cell;
use std::rc::Rc;

use journal::Journal;

thread_local! {
    static OUTER_OPEN: Cell<bool> = const { Cell::new(false) };
}

/// Called by the journal once the outermost scope is gone, before its
/// final-commit and close callbacks run.
fn mark_outer_closed() {
    OUTER_OPEN.with(|open| open.set(false));
}

/// How a scope was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionResult {
    Committed,
    Aborted,
}

impl TransactionResult {
    pub fn was_committed(self) -> bool {
        matches!(self, Self::Committed)
    }

    pub fn was_aborted(self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Entity whose state can be captured and restored by a transaction scope.
///
/// Implementors use interior mutability; the scope holds them through `Rc`.
pub trait Participant {
    type Snapshot: 'static;

    fn capture(&self) -> Self::Snapshot;

    fn restore(&self, snapshot: Self::Snapshot);

    /// Called once after the outermost scope commits a change to this participant.
    fn on_final_commit(&self) {}
}

enum JournalRef<'a> {
    Owned(Box<Journal>),
    Borrowed(&'a mut Journal),
}

impl JournalRef<'_> {
    fn get(&mut self) -> &mut Journal {
        match self {
            Self::Owned(journal) => journal,
            Self::Borrowed(journal) => journal,
        }
    }
}

/// An open transaction scope.
///
/// ```ignore
/// let mut outer = Transaction::open();
/// {
///     let mut inner = outer.nested();
///     slot.extract_tx(selector, 5, Some(&mut inner));
///     inner.commit();
/// }
/// outer.abort(); // slot is back to its state before `outer` opened
/// ```
pub struct Transaction<'a> {
    journal: JournalRef<'a>,
    depth: usize,
    closed: bool,
}

impl Transaction<'static> {
    /// Opens an outermost scope.
    ///
    /// # Panics
    ///
    /// Panics if an outermost scope is already open on this thread. Work that
    /// may run under an open scope takes it as a parent instead; see
    /// [`open_within`](Transaction::open_within).
    pub fn open() -> Self {
        let already_open = OUTER_OPEN.with(|open| open.replace(true));
        assert!(
            !already_open,
            "an outermost transaction is already open on this thread"
        );
        let mut journal = Box::<Journal>::default();
        let depth = journal.open_scope();
        Self {
            journal: JournalRef::Owned(journal),
            depth,
            closed: false,
        }
    }

    /// True while an outermost scope is open on this thread.
    pub fn is_open() -> bool {
        OUTER_OPEN.with(Cell::get)
    }
}

impl<'a> Transaction<'a> {
    /// Opens a scope nested in `parent`, or an outermost scope without one.
    pub fn open_within(parent: Option<&'a mut Transaction<'_>>) -> Self {
        match parent {
            Some(parent) => parent.nested(),
            None => Transaction::open(),
        }
    }

    /// Opens a scope nested inside this one.
    ///
    /// This scope cannot be used again until the nested one is closed.
    pub fn nested(&mut self) -> Transaction<'_> {
        let journal = self.journal.get();
        let depth = journal.open_scope();
        Transaction {
            journal: JournalRef::Borrowed(journal),
            depth,
            closed: false,
        }
    }

    /// Nesting depth; the outermost scope is `0`.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Registers `participant` with this scope, capturing its current state.
    ///
    /// Registering again within the same scope is a no-op, so callers may
    /// invoke this before every mutation.
    pub fn participate<P: Participant + 'static>(&mut self, participant: &Rc<P>) {
        self.journal.get().capture(participant);
    }

    /// Schedules `callback` to run once the outermost scope closes.
    pub fn add_outer_close_callback(&mut self, callback: impl FnOnce(TransactionResult) + 'static) {
        self.journal.get().add_outer_close_callback(Box::new(callback));
    }

    pub fn commit(mut self) {
        self.close(TransactionResult::Committed);
    }

    pub fn abort(mut self) {
        self.close(TransactionResult::Aborted);
    }

    fn close(&mut self, result: TransactionResult) {
        self.closed = true;
        let depth = self.depth;
        self.journal.get().close_scope(depth, result);
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.close(TransactionResult::Aborted);
        }
    }
}

impl core::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transaction")
            .field("depth", &self.depth)
            .field("closed", &self.closed)
            .finish()
    }
}
