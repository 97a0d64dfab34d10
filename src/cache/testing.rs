//! Helpers for driving the cache deterministically in tests

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::FutureExt;
use tokio::sync::oneshot;

use super::entry::{FetchResult, QueryError};
use super::request::FetchFn;

/// A fetch function whose calls stay pending until the test resolves them
#[derive(Default)]
pub(crate) struct ScriptedFetch {
    calls: Cell<usize>,
    senders: RefCell<Vec<Option<oneshot::Sender<FetchResult>>>>,
}

impl ScriptedFetch {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn fetch_fn(self: &Rc<Self>) -> FetchFn {
        let script = Rc::clone(self);
        Rc::new(move || {
            script.calls.set(script.calls.get() + 1);
            let (tx, rx) = oneshot::channel();
            script.senders.borrow_mut().push(Some(tx));
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(QueryError::Transport("script dropped".into())))
            }
            .boxed_local()
        })
    }

    /// Number of times the fetch function has been invoked
    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Complete the `call`-th invocation (zero based)
    pub(crate) fn resolve(&self, call: usize, result: FetchResult) {
        let sender = self
            .senders
            .borrow_mut()
            .get_mut(call)
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("no pending call #{call}"));
        let _ = sender.send(result);
    }
}

/// Let spawned local tasks run until they block again
pub(crate) async fn flush() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
