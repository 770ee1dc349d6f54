//! Owning-thread dispatch for Prism.
//!
//! Collections in Prism are bound to one logical thread of control. State
//! that changes from another thread (for example an item's selected flag
//! toggled by a background task) must be marshaled onto the owning thread
//! before it touches shared collection state. This module provides that
//! primitive.
//!
//! # How It Works
//!
//! 1. The owning thread obtains its [`Dispatcher`] via
//!    [`Dispatcher::current`], which installs a task queue for the thread
//!    in a global registry.
//!
//! 2. Any thread may call [`Dispatcher::run_on_owning_thread`]: on the
//!    owning thread the closure runs inline, otherwise it is enqueued.
//!
//! 3. The owning thread drains its queue with
//!    [`Dispatcher::process_pending`].
//!
//! Queued signal connections (see [`crate::Signal`]) ride the same queue.
//!
//! # Example
//!
//! ```
//! use prism_core::Dispatcher;
//!
//! let dispatcher = Dispatcher::current();
//!
//! dispatcher.run_on_owning_thread(|| {
//!     // Runs inline: we are on the owning thread.
//! });
//!
//! // Drain anything queued by other threads.
//! let executed = dispatcher.process_pending().unwrap();
//! # let _ = executed;
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use parking_lot::Mutex;

use crate::error::DispatchError;

/// A deferred unit of work bound for a dispatcher's owning thread.
pub(crate) type DispatchTask = Box<dyn FnOnce() + Send>;

/// Global registry of per-thread task queue senders.
static SENDERS: OnceLock<Mutex<HashMap<ThreadId, Sender<DispatchTask>>>> = OnceLock::new();

fn senders() -> &'static Mutex<HashMap<ThreadId, Sender<DispatchTask>>> {
    SENDERS.get_or_init(|| Mutex::new(HashMap::new()))
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<Dispatcher>>> = const { RefCell::new(None) };
}

/// Send a task to the dispatcher owning `thread`.
///
/// Returns the task back when the thread has no live dispatcher, so the
/// caller can decide on a fallback (signals invoke the slot inline).
pub(crate) fn send_to(thread: ThreadId, task: DispatchTask) -> Result<(), DispatchTask> {
    let mut map = senders().lock();
    match map.get(&thread) {
        Some(sender) => match sender.send(task) {
            Ok(()) => Ok(()),
            Err(err) => {
                // Receiver gone: the owning thread exited. Drop the stale entry.
                map.remove(&thread);
                Err(err.into_inner())
            }
        },
        None => Err(task),
    }
}

/// Marshals work onto the thread that owns a collection.
///
/// One dispatcher exists per thread; [`Dispatcher::current`] creates it on
/// first use and returns the shared handle thereafter. The dispatcher is a
/// queue, not an event loop: the owning thread decides when to drain it via
/// [`process_pending`](Self::process_pending).
pub struct Dispatcher {
    owner: ThreadId,
    receiver: Receiver<DispatchTask>,
    sender: Sender<DispatchTask>,
}

impl Dispatcher {
    /// Returns the current thread's dispatcher, installing one on first use.
    pub fn current() -> Arc<Dispatcher> {
        CURRENT.with(|cell| {
            let mut slot = cell.borrow_mut();
            if let Some(dispatcher) = slot.as_ref() {
                return dispatcher.clone();
            }
            let (sender, receiver) = unbounded();
            let owner = std::thread::current().id();
            senders().lock().insert(owner, sender.clone());
            let dispatcher = Arc::new(Dispatcher {
                owner,
                receiver,
                sender,
            });
            *slot = Some(dispatcher.clone());
            dispatcher
        })
    }

    /// Returns `true` when called on the thread that owns this dispatcher.
    pub fn is_owning_thread(&self) -> bool {
        std::thread::current().id() == self.owner
    }

    /// Run `action` on the owning thread.
    ///
    /// Called on the owning thread, the action runs inline before this
    /// method returns. Called anywhere else, it is enqueued and runs the
    /// next time the owning thread drains its queue.
    pub fn run_on_owning_thread<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_owning_thread() {
            action();
        } else {
            self.post(action);
        }
    }

    /// Enqueue `action` for the owning thread unconditionally.
    pub fn post<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Sending to ourselves cannot fail: we hold the receiver.
        let _ = self.sender.send(Box::new(action));
    }

    /// Drain and execute all queued tasks.
    ///
    /// Returns the number of tasks executed. Must be called from the owning
    /// thread.
    pub fn process_pending(&self) -> Result<usize, DispatchError> {
        if !self.is_owning_thread() {
            return Err(DispatchError::WrongThread);
        }
        let mut executed = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(task) => {
                    task();
                    executed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        tracing::trace!(
            target: "prism_core::dispatch",
            executed,
            "drained pending dispatch tasks"
        );
        Ok(executed)
    }

    /// Number of tasks currently waiting in the queue.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        senders().lock().remove(&self.owner);
    }
}
