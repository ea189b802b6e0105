use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use futures::{Stream, StreamExt, stream::BoxStream};
use tokio::{runtime::Handle, task::JoinHandle};

type Slot<T> = Arc<Mutex<Option<BoxStream<'static, T>>>>;

/// A running pump task feeding the tracker, tagged with the generation it
/// was armed under.
///
/// The source stream sits in a slot shared with the task. Dropping the
/// subscription empties the slot, so the source is released before the drop
/// returns, then aborts the task.
pub(crate) struct Subscription {
    generation: u64,
    handle: JoinHandle<()>,
    release: Box<dyn FnMut() + Send>,
}

impl Subscription {
    pub(crate) fn spawn<T, F, Fut>(runtime: &Handle, generation: u64, stream: BoxStream<'static, T>, pump: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce(BoxStream<'static, T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let slot: Slot<T> = Arc::new(Mutex::new(Some(stream)));
        let handle = runtime.spawn(pump(Detachable { slot: slot.clone() }.boxed()));

        Self {
            generation,
            handle,
            release: Box::new(move || {
                let stream = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                drop(stream);
            }),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        (self.release)();
        self.handle.abort();
    }
}

/// The task's view of the slot. Ends once the slot is emptied.
struct Detachable<T> {
    slot: Slot<T>,
}

impl<T> Stream for Detachable<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(stream) => stream.poll_next_unpin(cx),
            None => Poll::Ready(None),
        }
    }
}
