use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation token shared by every pipeline thread.
///
/// Nothing is ever sent on the inner channel. Triggering drops the only
/// sender, so every clone of the receiver becomes ready at once and any
/// `select!` waiting on [`Shutdown::receiver`] wakes up.
#[derive(Debug, Clone)]
pub struct Shutdown {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    receiver: Receiver<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create an untriggered token
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(tx))),
            receiver: rx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal every holder of this token to stop
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        self.trigger.lock().take();
    }

    /// Check whether shutdown has been signaled
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once triggered
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::select;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_trigger_wakes_waiters() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.clone();

        let handle = thread::spawn(move || {
            select! {
                recv(waiter.receiver()) -> _ => true,
                default(Duration::from_secs(5)) => false,
            }
        });

        thread::sleep(Duration::from_millis(20));
        shutdown.trigger();
        assert!(handle.join().unwrap());
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_trigger_is_idempotent() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.receiver().recv().is_err());
    }
}
