//! Observable single-value cells with synchronous change notification.
//!
//! A [`State<T>`] holds one value and an ordered list of subscriber
//! [`Callback`]s. Every [`State::set`] replaces the value and calls each
//! subscriber once, in subscription order, before returning. Subscribing
//! delivers the current value immediately.
//!
//! Subscribers are removed by identity: clones of one [`Callback`] are the
//! same subscriber, two separately constructed callbacks never are, even if
//! they wrap the same function.
//!
//! # Re-entrancy
//!
//! `set` takes a snapshot of the subscriber list when it starts and releases
//! the cell before calling anyone, so subscribers may freely `get`, `set`,
//! `subscribe` or detach on the same cell:
//!
//! - subscribers added during a round are first called by the next `set`;
//! - subscribers removed during a round still receive the current round;
//! - a nested `set` finishes its own round before the outer one resumes, and
//!   the rest of the outer round receives the value the cell holds by then.
//!
//! A panicking subscriber aborts the round and the panic reaches the caller
//! of `set`. Nothing is caught.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::trace;

/// Subscriber callback with reference identity.
pub struct Callback<T> {
    func: Rc<dyn Fn(&T)>,
}

impl<T> Callback<T> {
    pub fn new(func: impl Fn(&T) + 'static) -> Self {
        Self {
            func: Rc::new(func),
        }
    }

    /// True when both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }

    pub fn call(&self, value: &T) {
        (self.func)(value)
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self {
            func: Rc::clone(&self.func),
        }
    }
}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("ptr", &Rc::as_ptr(&self.func).cast::<()>())
            .finish()
    }
}

type Subscribers<T> = SmallVec<[Callback<T>; 4]>;

struct StateInner<T> {
    value: T,
    subscribers: Subscribers<T>,
}

/// Shared observable value.
///
/// Cloning a `State` yields another handle to the same cell.
pub struct State<T> {
    inner: Rc<RefCell<StateInner<T>>>,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("State")
            .field("value", &inner.value)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + Default + 'static> Default for State<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> State<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StateInner {
                value,
                subscribers: SmallVec::new(),
            })),
        }
    }

    /// Clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value. `f` must not call back into this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value and notify every subscriber registered at the time of
    /// the call. No equality check is made: setting the same value notifies
    /// again.
    pub fn set(&self, value: T) {
        let subscribers = {
            let mut inner = self.inner.borrow_mut();
            inner.value = value;
            inner.subscribers.clone()
        };
        trace!(subscribers = subscribers.len(), "state set");
        for callback in &subscribers {
            // a subscriber may have set the cell again; always hand out the live value
            let current = self.get();
            callback.call(&current);
        }
    }

    /// Register `callback` and call it right away with the current value.
    ///
    /// The same callback may be registered more than once; each registration
    /// gets its own entry and its own catch-up call. The returned handle
    /// removes every entry of `callback` when [`Detach::detach`] is called.
    pub fn subscribe(&self, callback: &Callback<T>) -> Detach<T> {
        let value = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.push(callback.clone());
            inner.value.clone()
        };
        callback.call(&value);
        self.detacher(callback)
    }

    /// Build a handle that removes `callback` when invoked.
    ///
    /// This does not remove anything on its own.
    #[must_use = "the callback stays subscribed until `detach` is called"]
    pub fn unsubscribe(&self, callback: &Callback<T>) -> Detach<T> {
        self.detacher(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    pub fn downgrade(&self) -> WeakState<T> {
        WeakState {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// True when both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn detacher(&self, callback: &Callback<T>) -> Detach<T> {
        Detach {
            state: Rc::downgrade(&self.inner),
            callback: callback.clone(),
        }
    }
}

/// Deferred removal of one callback from one cell.
///
/// Dropping the handle does nothing; only [`Detach::detach`] removes the
/// subscription. Calling it again, or after the cell is gone, is a no-op.
pub struct Detach<T> {
    state: Weak<RefCell<StateInner<T>>>,
    callback: Callback<T>,
}

impl<T> Detach<T> {
    /// Remove every entry of the callback from the cell's subscriber list.
    pub fn detach(&self) {
        if let Some(inner) = self.state.upgrade() {
            inner
                .borrow_mut()
                .subscribers
                .retain(|entry| !entry.ptr_eq(&self.callback));
        }
    }
}

impl<T> fmt::Debug for Detach<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detach")
            .field("callback", &self.callback)
            .field("live", &(self.state.strong_count() > 0))
            .finish()
    }
}

/// Non-owning reference to a [`State`].
pub struct WeakState<T> {
    inner: Weak<RefCell<StateInner<T>>>,
}

impl<T> Clone for WeakState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for WeakState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakState")
            .field("live", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T> WeakState<T> {
    pub fn upgrade(&self) -> Option<State<T>> {
        self.inner.upgrade().map(|inner| State { inner })
    }

    /// True when this reference points at `state`'s cell.
    pub fn points_to(&self, state: &State<T>) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&state.inner))
    }
}
