//! Single-assignment memoization cell
//!
//! Snapshot projections derive everything on demand from a world that keeps
//! mutating underneath them. A `Memo` stores the first derived value and hands
//! the same value back for the rest of its owner's lifetime, so two readers in
//! the same tick always agree.
//!
//! Not thread-safe: evaluation is single-threaded.

use std::cell::OnceCell;
use std::fmt;

pub struct Memo<T> {
    slot: OnceCell<T>,
}

impl<T> Memo<T> {
    pub const fn new() -> Self {
        Self { slot: OnceCell::new() }
    }

    /// Return the cached value, computing it with `compute` on first access.
    ///
    /// `compute` runs at most once per cell.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> &T {
        self.slot.get_or_init(compute)
    }

    /// Cached value if it has already been computed
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    pub fn is_computed(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.get() {
            Some(value) => f.debug_tuple("Memo").field(value).finish(),
            None => f.write_str("Memo(<pending>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_computes_once() {
        let calls = Cell::new(0);
        let memo = Memo::new();

        let first = *memo.get_or_compute(|| {
            calls.set(calls.get() + 1);
            42
        });
        let second = *memo.get_or_compute(|| {
            calls.set(calls.get() + 1);
            7
        });

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_same_reference_returned() {
        let memo: Memo<Vec<u32>> = Memo::new();
        let a = memo.get_or_compute(|| vec![1, 2, 3]) as *const Vec<u32>;
        let b = memo.get_or_compute(Vec::new) as *const Vec<u32>;
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_pending_until_accessed() {
        let memo: Memo<u8> = Memo::default();
        assert!(!memo.is_computed());
        assert!(memo.get().is_none());
        memo.get_or_compute(|| 1);
        assert!(memo.is_computed());
    }
}
