//! Background batch production with a bounded queue.

use kgrank_core::CorruptionMode;
use std::sync::mpsc;
use std::thread;

use crate::error::{Error, Result};

/// A worker thread filling a bounded queue from a producer closure.
///
/// The worker stops on the first producer error (after forwarding it) or
/// when the consumer side is dropped. Dropping the prefetcher joins the
/// thread, so no worker outlives its stream.
pub(crate) struct Prefetcher<T> {
    receiver: Option<mpsc::Receiver<Result<T>>>,
    handle: Option<thread::JoinHandle<()>>,
    worker: usize,
    mode: CorruptionMode,
}

impl<T: Send + 'static> Prefetcher<T> {
    pub(crate) fn spawn<F>(
        worker: usize,
        mode: CorruptionMode,
        capacity: usize,
        mut producer: F,
    ) -> Result<Self>
    where
        F: FnMut() -> Result<T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let handle = thread::Builder::new()
            .name(format!("kgrank-{mode}-{worker}"))
            .spawn(move || loop {
                let result = producer();
                let failed = result.is_err();
                if sender.send(result).is_err() || failed {
                    tracing::trace!(worker, %mode, "prefetch worker exiting");
                    return;
                }
            })?;
        tracing::debug!(worker, %mode, capacity, "spawned prefetch worker");
        Ok(Self {
            receiver: Some(receiver),
            handle: Some(handle),
            worker,
            mode,
        })
    }

    /// Block until the worker delivers its next item.
    pub(crate) fn recv(&self) -> Result<T> {
        let stopped = || Error::WorkerStopped {
            worker: self.worker,
            mode: self.mode,
        };
        let receiver = self.receiver.as_ref().ok_or_else(stopped)?;
        receiver.recv().map_err(|_| stopped())?
    }
}

impl<T> Drop for Prefetcher<T> {
    fn drop(&mut self) {
        // Disconnect first so a worker blocked on a full queue wakes up.
        self.receiver.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(worker = self.worker, mode = %self.mode, "prefetch worker panicked");
            }
        }
    }
}
