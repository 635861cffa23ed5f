use crate::dependencies::types::{BoxError, FactoryFn};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Lazily computed, exactly-once singleton value.
///
/// Racing first callers block until the single in-flight factory call
/// finishes and then observe its result. A failed or panicking factory
/// leaves the memo empty; the next caller retries.
pub struct SingletonMemo<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
    factory: Box<FactoryFn<T>>,
}

impl<T: ?Sized> SingletonMemo<T> {
    pub(crate) fn new(factory: Box<FactoryFn<T>>) -> Self {
        Self {
            cell: OnceCell::new(),
            factory,
        }
    }

    pub fn get(&self) -> Result<Arc<T>, BoxError> {
        self.cell.get_or_try_init(|| (self.factory)()).map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_memo_runs_factory_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let memo = SingletonMemo::new(Box::new(move || -> Result<Arc<String>, BoxError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(String::from("Tatooine")))
        }));

        assert!(!memo.is_initialized());
        let first = memo.get().unwrap();
        let second = memo.get().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(memo.is_initialized());
    }

    #[test]
    fn test_memo_retries_after_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let memo = SingletonMemo::new(Box::new(move || -> Result<Arc<u32>, BoxError> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("first call fails".into())
            } else {
                Ok(Arc::new(7))
            }
        }));

        assert!(memo.get().is_err());
        assert!(!memo.is_initialized());
        assert_eq!(*memo.get().unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
