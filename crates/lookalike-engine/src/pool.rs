//! Fixed-size worker pools with an explicit shutdown protocol.
//!
//! A pool moves through `Running -> Draining -> Joined`:
//!
//! - `Running`: [`WorkerPool::submit`] enqueues work.
//! - `Draining`: the input queue is closed; workers finish what is queued.
//! - `Joined`: every worker has exited and dropped its output sender.
//!
//! The output queue disconnects once the last worker exits, which is what
//! tells the aggregator that this pool is done.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};
use lookalike_core::EngineError;

/// Lifecycle of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Running,
    Draining,
    Joined,
}

/// Threads pulling items from one shared queue and pushing results to another.
pub struct WorkerPool<T> {
    name: &'static str,
    input: Option<Sender<T>>,
    handles: Vec<JoinHandle<()>>,
    state: PoolState,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `workers` threads (at least one). Each applies `job` to an item
    /// and forwards `Some` results to `output`; `None` drops the item.
    pub fn spawn<O, F>(
        name: &'static str,
        workers: usize,
        output: Sender<O>,
        job: F,
    ) -> Result<Self, EngineError>
    where
        O: Send + 'static,
        F: Fn(T) -> Option<O> + Send + Sync + 'static,
    {
        let (input, queue) = unbounded::<T>();
        let job = Arc::new(job);
        let workers = workers.max(1);
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let queue = queue.clone();
            let output = output.clone();
            let job = Arc::clone(&job);

            let handle = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || {
                    while let Ok(item) = queue.recv() {
                        if let Some(result) = job(item)
                            && output.send(result).is_err()
                        {
                            // Nobody is listening any more.
                            break;
                        }
                    }
                })
                .map_err(|source| EngineError::Spawn { pool: name, source })?;
            handles.push(handle);
        }

        tracing::debug!(pool = name, workers, "worker pool started");

        Ok(Self {
            name,
            input: Some(input),
            handles,
            state: PoolState::Running,
        })
    }

    /// Enqueue one item. Fails once the pool has been closed.
    pub fn submit(&self, item: T) -> Result<(), EngineError> {
        let closed = EngineError::PoolClosed { pool: self.name };
        match &self.input {
            Some(input) => input.send(item).map_err(|_| closed),
            None => Err(closed),
        }
    }

    /// Close the input queue. Queued items are still processed.
    pub fn close(&mut self) {
        if self.state == PoolState::Running {
            self.input = None;
            self.state = PoolState::Draining;
            tracing::debug!(pool = self.name, "worker pool draining");
        }
    }

    /// Close if needed and wait for every worker to exit.
    pub fn join(&mut self) -> Result<(), EngineError> {
        self.close();
        let mut panicked = false;
        for handle in self.handles.drain(..) {
            panicked |= handle.join().is_err();
        }
        self.state = PoolState::Joined;
        tracing::debug!(pool = self.name, "worker pool joined");

        if panicked {
            Err(EngineError::WorkerPanicked { pool: self.name })
        } else {
            Ok(())
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Live worker threads (zero once joined).
    pub fn workers(&self) -> usize {
        self.handles.len()
    }
}
