//! Quiescence-based delays.
//!
//! [`Debouncer`] owns a single timer slot: scheduling new work cancels
//! whatever was waiting. [`Debounced`] builds a value on top of it that only
//! settles once its input has been stable for the configured delay.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A cancellable, single-slot delayed task.
///
/// Dropping the debouncer cancels the pending timer, so callbacks never run
/// against a disposed owner.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Run `task` once the default delay has elapsed without another call.
    pub fn call<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.call_after(self.delay, task);
    }

    /// Like [`Debouncer::call`] with an explicit delay. A zero delay still goes
    /// through the slot, so a later call can supersede it before it runs.
    pub fn call_after<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.pending = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
        }));
    }

    /// Cancel the waiting task. Returns true if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A value that follows its input only after the input stops changing.
#[derive(Debug)]
pub struct Debounced<T> {
    latest: T,
    settled: Arc<watch::Sender<T>>,
    debouncer: Debouncer,
}

impl<T> Debounced<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (settled, _) = watch::channel(initial.clone());
        Self {
            latest: initial,
            settled: Arc::new(settled),
            debouncer: Debouncer::new(delay),
        }
    }

    /// Feed a new input value. Any emission still waiting is discarded.
    pub fn set(&mut self, value: T) {
        self.latest = value.clone();
        self.debouncer.cancel();
        if *self.settled.borrow() == value {
            return;
        }
        let settled = Arc::clone(&self.settled);
        self.debouncer.call(async move {
            settled.send_replace(value);
        });
    }

    /// Settle immediately on the latest input.
    pub fn flush(&mut self) {
        self.debouncer.cancel();
        self.settled.send_replace(self.latest.clone());
    }

    /// The debounced value.
    pub fn get(&self) -> T {
        self.settled.borrow().clone()
    }

    /// The most recent input, settled or not.
    pub fn latest(&self) -> &T {
        &self.latest
    }

    pub fn is_settling(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.settled.subscribe()
    }
}
