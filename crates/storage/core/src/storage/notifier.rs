//! Change propagation from slots to the storage that owns them.

use std::cell::{Cell, RefCell};

use crate::transaction::Participant;

type Listener = Box<dyn FnMut()>;

/// Owner-side end of the slot back-reference.
///
/// Slots hold it weakly. Outside a transaction a slot change notifies
/// immediately; inside one the notifier joins the transaction and notifies
/// once, when the outermost scope commits.
#[derive(Default)]
pub(crate) struct ChangeNotifier {
    listener: RefCell<Option<Listener>>,
    /// Bumped on every `set_listener`, including clears.
    generation: Cell<u64>,
}

impl ChangeNotifier {
    pub(crate) fn set_listener(&self, listener: Option<Listener>) {
        *self.listener.borrow_mut() = listener;
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    pub(crate) fn has_listener(&self) -> bool {
        self.listener.borrow().is_some()
    }

    pub(crate) fn notify(&self) {
        // Taken out while running so the listener may touch the storage again
        let taken = self.listener.borrow_mut().take();
        if let Some(mut listener) = taken {
            let generation = self.generation.get();
            listener();
            // Reinstall only if the listener did not replace or clear itself
            if self.generation.get() == generation {
                *self.listener.borrow_mut() = Some(listener);
            }
        }
    }
}

impl Participant for ChangeNotifier {
    type Snapshot = ();

    fn capture(&self) {}

    fn restore(&self, _snapshot: ()) {}

    fn on_final_commit(&self) {
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::transaction::Transaction;

    #[test]
    fn notifies_once_per_outermost_commit() {
        let calls = Rc::new(Cell::new(0));
        let notifier = Rc::new(ChangeNotifier::default());
        let counter = Rc::clone(&calls);
        notifier.set_listener(Some(Box::new(move || counter.set(counter.get() + 1))));

        let mut tx = Transaction::open();
        tx.participate(&notifier);
        tx.participate(&notifier);
        assert_eq!(calls.get(), 0);
        tx.commit();
        assert_eq!(calls.get(), 1);

        let mut tx = Transaction::open();
        tx.participate(&notifier);
        tx.abort();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn listener_replaced_during_notification_is_kept() {
        let notifier = Rc::new(ChangeNotifier::default());
        let inner = Rc::clone(&notifier);
        notifier.set_listener(Some(Box::new(move || inner.set_listener(Some(Box::new(|| {}))))));
        notifier.notify();
        assert!(notifier.has_listener());
    }

    #[test]
    fn listener_cleared_during_notification_stays_cleared() {
        let calls = Rc::new(Cell::new(0));
        let notifier = Rc::new(ChangeNotifier::default());
        let inner = Rc::clone(&notifier);
        let counter = Rc::clone(&calls);
        notifier.set_listener(Some(Box::new(move || {
            counter.set(counter.get() + 1);
            inner.set_listener(None);
        })));

        notifier.notify();
        notifier.notify();
        assert_eq!(calls.get(), 1);
        assert!(!notifier.has_listener());
    }
}
