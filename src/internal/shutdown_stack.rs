//! Shutdown callbacks run when an application lifespan closes.

use std::future::Future;
use std::pin::Pin;

/// Future type for async shutdown callbacks.
pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callbacks executed in LIFO order across both kinds.
#[derive(Default)]
pub(crate) struct ShutdownStack {
    callbacks: Vec<Callback>,
}

enum Callback {
    Sync(Box<dyn FnOnce() + Send>),
    Async(Box<dyn FnOnce() -> BoxFutureUnit + Send>),
}

impl ShutdownStack {
    pub(crate) fn push_sync(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.callbacks.push(Callback::Sync(f));
    }

    pub(crate) fn push_async<Fut, F>(&mut self, f: F)
    where
        Fut: Future<Output = ()> + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
    {
        self.callbacks
            .push(Callback::Async(Box::new(move || Box::pin(f()))));
    }

    /// Run every callback, newest first.
    pub(crate) async fn unwind(&mut self) {
        while let Some(cb) = self.callbacks.pop() {
            match cb {
                Callback::Sync(f) => f(),
                Callback::Async(f) => f().await,
            }
        }
    }

    /// Run the synchronous callbacks only, newest first, dropping async ones.
    ///
    /// Used from `Drop`, where nothing can be awaited.
    pub(crate) fn unwind_sync(&mut self) -> usize {
        let mut skipped = 0;
        while let Some(cb) = self.callbacks.pop() {
            match cb {
                Callback::Sync(f) => f(),
                Callback::Async(_) => skipped += 1,
            }
        }
        skipped
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_unwind_is_lifo_across_kinds() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ShutdownStack::default();

        let o = order.clone();
        stack.push_sync(Box::new(move || o.lock().unwrap().push("sync-1")));
        let o = order.clone();
        stack.push_async(move || async move { o.lock().unwrap().push("async-2") });
        let o = order.clone();
        stack.push_sync(Box::new(move || o.lock().unwrap().push("sync-3")));

        assert_eq!(stack.len(), 3);
        stack.unwind().await;
        assert!(stack.is_empty());
        assert_eq!(*order.lock().unwrap(), vec!["sync-3", "async-2", "sync-1"]);
    }

    #[test]
    fn test_unwind_sync_skips_async() {
        let hits = Arc::new(Mutex::new(0));
        let mut stack = ShutdownStack::default();

        let h = hits.clone();
        stack.push_sync(Box::new(move || *h.lock().unwrap() += 1));
        stack.push_async(|| async {});

        assert_eq!(stack.unwind_sync(), 1);
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
