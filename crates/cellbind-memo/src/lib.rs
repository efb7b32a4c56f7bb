#![forbid(unsafe_code)]

//! A single-value memoizer: the dirty/clean caching protocol with the
//! dependency tracking stripped away.
//!
//! [`Memo<T>`] wraps a zero-argument compute closure and a cached result.
//! [`value()`](Memo::value) recomputes only while stale;
//! [`invalidate()`](Memo::invalidate) marks the cache stale; and
//! [`revalidate()`](Memo::revalidate) clears (or deliberately preserves)
//! the stale flag without recomputing, freezing the cached value against a
//! pending invalidation.
//!
//! # Invariants
//!
//! 1. The compute closure runs at most once per stale→fresh transition.
//! 2. A memoizer built without a compute closure yields `None` and still
//!    clears the stale flag on read.
//!
//! ```
//! use cellbind_memo::Memo;
//!
//! let memo = Memo::new(|| 6 * 7);
//! assert_eq!(memo.value(), Some(42));
//! assert!(!memo.is_stale());
//! memo.invalidate();
//! assert_eq!(memo.value(), Some(42));
//! ```

use std::cell::{Cell, RefCell};

type ComputeFn<T> = Box<dyn Fn() -> T>;

/// A lazily-evaluated, explicitly-invalidated cached value.
pub struct Memo<T> {
    compute: Option<ComputeFn<T>>,
    cached: RefCell<Option<T>>,
    stale: Cell<bool>,
}

impl<T: Clone> Memo<T> {
    /// Wrap a compute closure. The memoizer starts stale, so the first
    /// read computes.
    #[must_use]
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        Self {
            compute: Some(Box::new(compute)),
            cached: RefCell::new(None),
            stale: Cell::new(true),
        }
    }

    /// A memoizer with no compute closure: reads yield `None` and still
    /// clear the stale flag.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            compute: None,
            cached: RefCell::new(None),
            stale: Cell::new(true),
        }
    }

    /// The current value, recomputing first if stale.
    pub fn value(&self) -> Option<T> {
        if self.stale.get() {
            if let Some(compute) = &self.compute {
                *self.cached.borrow_mut() = Some(compute());
            }
            self.stale.set(false);
        }
        self.cached.borrow().clone()
    }

    /// Mark the cached value stale; the next read recomputes.
    pub fn invalidate(&self) {
        self.stale.set(true);
    }

    /// Clear the stale flag without recomputing, so the cached value
    /// stands. `revalidate(true)` instead preserves a pending
    /// invalidation.
    pub fn revalidate(&self, keep_stale: bool) {
        self.stale.set(self.stale.get() && keep_stale);
    }

    /// Whether the next read will recompute.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("cached", &self.cached.borrow())
            .field("stale", &self.stale.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn counting(calls: &Rc<Cell<u32>>) -> Memo<u32> {
        let calls = Rc::clone(calls);
        Memo::new(move || {
            calls.set(calls.get() + 1);
            calls.get()
        })
    }

    #[test]
    fn value_computes_once_until_invalidated() {
        let calls = Rc::new(Cell::new(0));
        let memo = counting(&calls);

        assert_eq!(memo.value(), Some(1));
        assert_eq!(memo.value(), Some(1));
        assert_eq!(calls.get(), 1);

        memo.invalidate();
        assert_eq!(memo.value(), Some(2));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn revalidate_skips_the_pending_recompute() {
        let calls = Rc::new(Cell::new(0));
        let memo = counting(&calls);
        assert_eq!(memo.value(), Some(1));

        memo.invalidate();
        memo.revalidate(false);
        assert_eq!(memo.value(), Some(1));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn revalidate_keep_stale_preserves_the_invalidation() {
        let calls = Rc::new(Cell::new(0));
        let memo = counting(&calls);
        assert_eq!(memo.value(), Some(1));

        memo.invalidate();
        memo.revalidate(true);
        assert!(memo.is_stale());
        assert_eq!(memo.value(), Some(2));
    }

    #[test]
    fn empty_memo_yields_none_and_clears_stale() {
        let memo: Memo<u32> = Memo::empty();
        assert!(memo.is_stale());
        assert_eq!(memo.value(), None);
        assert!(!memo.is_stale());
    }

    #[test]
    fn starts_stale() {
        let memo = Memo::new(|| 1);
        assert!(memo.is_stale());
    }

    #[test]
    fn debug_format_shows_cache_state() {
        let memo = Memo::new(|| 5);
        let _ = memo.value();
        let dbg = format!("{memo:?}");
        assert!(dbg.contains("Memo"));
        assert!(dbg.contains("5"));
    }
}
