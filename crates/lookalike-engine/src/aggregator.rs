//! Single writer merging both hashing pipelines into shared result maps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, never, select};
use lookalike_core::{DuplicateGroups, EngineError, HashedFile, ImageRecord};

use crate::progress::ProgressReporter;

/// Everything the aggregator collected, handed over once it has finished.
#[derive(Debug, Default)]
pub struct Aggregated {
    /// Content hash to paths, in completion order.
    pub groups: DuplicateGroups,
    /// Every successfully fingerprinted image, in completion order.
    pub images: Vec<ImageRecord>,
}

/// Handle to the running aggregator thread.
pub struct Aggregator {
    groups: Arc<Mutex<DuplicateGroups>>,
    images: Arc<Mutex<Vec<ImageRecord>>>,
    complete: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Aggregator {
    /// Start draining `hashed` and `images` until both disconnect.
    pub(crate) fn spawn(
        hashed: Receiver<HashedFile>,
        images: Receiver<ImageRecord>,
        reporter: ProgressReporter,
    ) -> Result<Self, EngineError> {
        let groups = Arc::new(Mutex::new(DuplicateGroups::new()));
        let image_list = Arc::new(Mutex::new(Vec::new()));
        let complete = Arc::new(AtomicBool::new(false));

        let handle = {
            let groups = Arc::clone(&groups);
            let image_list = Arc::clone(&image_list);
            let complete = Arc::clone(&complete);
            thread::Builder::new()
                .name("aggregator".to_string())
                .spawn(move || {
                    drain(&hashed, &images, &groups, &image_list, &reporter);
                    complete.store(true, Ordering::Release);
                    reporter.publish();
                })
                .map_err(|source| EngineError::Spawn {
                    pool: "aggregator",
                    source,
                })?
        };

        Ok(Self {
            groups,
            images: image_list,
            complete,
            handle,
        })
    }

    /// Whether both input queues have closed and been drained.
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Wait for completion and take ownership of the results.
    pub fn finish(self) -> Result<Aggregated, EngineError> {
        self.handle
            .join()
            .map_err(|_| EngineError::WorkerPanicked { pool: "aggregator" })?;

        Ok(Aggregated {
            groups: take(self.groups),
            images: take(self.images),
        })
    }
}

fn drain(
    hashed: &Receiver<HashedFile>,
    images: &Receiver<ImageRecord>,
    groups: &Mutex<DuplicateGroups>,
    image_list: &Mutex<Vec<ImageRecord>>,
    reporter: &ProgressReporter,
) {
    let closed_hashed = never();
    let closed_images = never();
    let mut hashed_open = true;
    let mut images_open = true;
    let mut merged = 0u64;

    while hashed_open || images_open {
        let hashed_rx = if hashed_open { hashed } else { &closed_hashed };
        let images_rx = if images_open { images } else { &closed_images };

        select! {
            recv(hashed_rx) -> msg => match msg {
                Ok(file) => {
                    groups
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(file.hash, file.size, file.path);
                    merged += 1;
                    reporter.tick(merged);
                }
                Err(_) => {
                    tracing::debug!("content hash queue closed");
                    hashed_open = false;
                }
            },
            recv(images_rx) -> msg => match msg {
                Ok(image) => {
                    image_list
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(image);
                    merged += 1;
                    reporter.tick(merged);
                }
                Err(_) => {
                    tracing::debug!("image hash queue closed");
                    images_open = false;
                }
            },
        }
    }

    tracing::debug!(merged, "aggregation complete");
}

/// Unwrap a shared map once its last other owner is gone.
fn take<T: Default>(shared: Arc<Mutex<T>>) -> T {
    match Arc::try_unwrap(shared) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
        Err(shared) => std::mem::take(&mut *shared.lock().unwrap_or_else(PoisonError::into_inner)),
    }
}
