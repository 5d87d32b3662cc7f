//! One callback listening to many [`State`] cells.

use tracing::debug;

use crate::state::{Callback, State, WeakState};

/// Attaches a single callback to a changing set of cells.
///
/// The cells are tracked by weak reference; a `Listeners` never keeps a cell
/// alive. Cells that have been dropped are skipped.
#[derive(Debug)]
pub struct Listeners<T> {
    callback: Callback<T>,
    sources: Vec<WeakState<T>>,
}

impl<T: Clone + 'static> Listeners<T> {
    /// Subscribe `callback` to every cell in `states`, in order. Each cell
    /// delivers its current value straight away.
    pub fn new<'a, I>(callback: Callback<T>, states: I) -> Self
    where
        I: IntoIterator<Item = &'a State<T>>,
        T: 'a,
    {
        let mut listeners = Self {
            callback,
            sources: Vec::new(),
        };
        for state in states {
            listeners.add(state);
        }
        listeners
    }

    /// Track `state` and subscribe the callback to it.
    pub fn add(&mut self, state: &State<T>) {
        self.sources.push(state.downgrade());
        state.subscribe(&self.callback);
    }

    /// Stop tracking every occurrence of `state` and detach the callback
    /// from it.
    pub fn remove(&mut self, state: &State<T>) {
        let before = self.sources.len();
        self.sources.retain(|source| !source.points_to(state));
        debug!(removed = before - self.sources.len(), "listener source removed");
        state.unsubscribe(&self.callback).detach();
    }

    /// Detach the callback from every tracked cell.
    ///
    /// The tracked list is kept, so `len` and `contains` still report the
    /// cells afterwards.
    pub fn unsubscribe(&self) {
        for source in &self.sources {
            if let Some(state) = source.upgrade() {
                state.unsubscribe(&self.callback).detach();
            }
        }
    }

    pub fn callback(&self) -> &Callback<T> {
        &self.callback
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn contains(&self, state: &State<T>) -> bool {
        self.sources.iter().any(|source| source.points_to(state))
    }
}
