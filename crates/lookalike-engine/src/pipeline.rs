//! Wiring of the size pre-filter, both hashing pools and the aggregator.

use std::sync::Arc;

use crossbeam_channel::unbounded;
use serde::Serialize;
use tokio::sync::broadcast;

use lookalike_core::{
    DuplicateGroups, EngineConfig, EngineError, FileRecord, HashedFile, ImageCluster, ImageRecord,
    WalkEntry,
};

use crate::aggregator::{Aggregated, Aggregator};
use crate::cluster::cluster_images;
use crate::grouper::DuplicateReport;
use crate::hasher::{Blake3Hasher, ContentHasher};
use crate::image_hash::{GradientHasher, PerceptualHasher};
use crate::pool::WorkerPool;
use crate::progress::{EngineProgress, ProgressCounters, ProgressReporter};
use crate::size_index::SizeIndex;

/// Result of one engine run.
#[derive(Debug, Clone, Serialize)]
pub struct EngineReport {
    /// Byte-identical files.
    pub duplicates: DuplicateReport,
    /// Visually similar images.
    pub clusters: Vec<ImageCluster>,
    /// Images that produced a perceptual hash.
    pub images_analyzed: usize,
    /// Counters at the end of the run.
    pub progress: EngineProgress,
    /// The full aggregated map, singletons included, for snapshots.
    #[serde(skip)]
    pub groups: DuplicateGroups,
}

impl EngineReport {
    /// Build a report from finished aggregation state.
    pub fn build(
        groups: DuplicateGroups,
        images: Vec<ImageRecord>,
        threshold: u32,
        progress: EngineProgress,
    ) -> Self {
        let images_analyzed = images.len();
        Self {
            duplicates: DuplicateReport::from_groups(&groups),
            clusters: cluster_images(images, threshold),
            images_analyzed,
            progress,
            groups,
        }
    }

    /// Report over groups loaded from a snapshot. No images are involved.
    pub fn from_groups(groups: DuplicateGroups) -> Self {
        Self::build(groups, Vec::new(), 0, EngineProgress::default())
    }

    /// Whether anything worth acting on was found.
    pub fn has_findings(&self) -> bool {
        self.duplicates.has_duplicates() || !self.clusters.is_empty()
    }
}

/// Duplicate and near-duplicate detection engine.
pub struct Engine {
    config: EngineConfig,
    content_hasher: Arc<dyn ContentHasher>,
    perceptual_hasher: Arc<dyn PerceptualHasher>,
    counters: Arc<ProgressCounters>,
    progress_tx: broadcast::Sender<EngineProgress>,
}

impl Engine {
    /// Create an engine with BLAKE3 content hashing and gradient image hashing.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let perceptual = GradientHasher::new(config.image_hash_width, config.image_hash_height);
        Self::with_hashers(config, Arc::new(Blake3Hasher::new()), Arc::new(perceptual))
    }

    /// Create an engine with custom hashers.
    pub fn with_hashers(
        config: EngineConfig,
        content_hasher: Arc<dyn ContentHasher>,
        perceptual_hasher: Arc<dyn PerceptualHasher>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let (progress_tx, _) = broadcast::channel(100);
        Ok(Self {
            config,
            content_hasher,
            perceptual_hasher,
            counters: Arc::new(ProgressCounters::new()),
            progress_tx,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to periodic progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineProgress> {
        self.progress_tx.subscribe()
    }

    /// Shared counters, for callers that prefer polling.
    ///
    /// The same counters serve every run; each run zeroes them first.
    pub fn counters(&self) -> Arc<ProgressCounters> {
        Arc::clone(&self.counters)
    }

    /// Current counter values.
    pub fn progress(&self) -> EngineProgress {
        self.counters.snapshot()
    }

    /// Consume a walk and run both pipelines to completion.
    ///
    /// Directory entries are ignored. Per-file failures are logged and
    /// counted; only pool startup or a worker panic fails the run.
    /// Counters are zeroed on entry, so runs on one engine must not overlap.
    pub fn run<I>(&self, entries: I) -> Result<EngineReport, EngineError>
    where
        I: IntoIterator<Item = WalkEntry>,
    {
        self.counters.reset();
        let reporter = ProgressReporter::new(
            Arc::clone(&self.counters),
            self.progress_tx.clone(),
            self.config.progress_interval,
        );

        let (hashed_tx, hashed_rx) = unbounded();
        let (image_tx, image_rx) = unbounded();
        let aggregator = Aggregator::spawn(hashed_rx, image_rx, reporter)?;

        let mut hash_pool = WorkerPool::spawn(
            "hash",
            self.config.effective_hash_workers(),
            hashed_tx,
            self.content_job(),
        )?;

        let mut image_pool = if self.config.detect_images {
            Some(WorkerPool::spawn(
                "image",
                self.config.effective_image_workers(),
                image_tx,
                self.image_job(),
            )?)
        } else {
            // Disconnects the image queue so the aggregator does not wait on it.
            drop(image_tx);
            None
        };

        let mut index = SizeIndex::new();
        for entry in entries {
            if entry.is_dir {
                continue;
            }
            self.counters.record_observed();
            let record = FileRecord::new(entry.path, entry.size);

            if let Some(pool) = &image_pool
                && self.config.is_image_candidate(&record.path)
            {
                pool.submit(record.clone())?;
            }

            for dispatched in index.observe(record) {
                self.counters.record_dispatched();
                hash_pool.submit(dispatched)?;
            }
        }

        tracing::debug!(
            sizes = index.len(),
            held_back = index.pending_count(),
            "walk consumed"
        );

        hash_pool.close();
        if let Some(pool) = image_pool.as_mut() {
            pool.close();
        }
        hash_pool.join()?;
        if let Some(pool) = image_pool.as_mut() {
            pool.join()?;
        }

        let Aggregated { groups, images } = aggregator.finish()?;
        let progress = self.counters.snapshot();

        tracing::info!(
            files = progress.files_observed,
            hashed = progress.files_hashed,
            images = images.len(),
            errors = progress.errors,
            "engine run complete"
        );

        Ok(EngineReport::build(
            groups,
            images,
            self.config.similarity_threshold,
            progress,
        ))
    }

    fn content_job(&self) -> impl Fn(FileRecord) -> Option<HashedFile> + Send + Sync + 'static {
        let hasher = Arc::clone(&self.content_hasher);
        let counters = Arc::clone(&self.counters);
        move |record: FileRecord| match hasher.hash_file(&record.path) {
            Ok(digest) => {
                counters.record_hashed(digest.bytes_read);
                Some(record.into_hashed(digest.hash))
            }
            Err(err) => {
                counters.record_error();
                tracing::warn!(path = %err.path().display(), "{err}");
                None
            }
        }
    }

    fn image_job(&self) -> impl Fn(FileRecord) -> Option<ImageRecord> + Send + Sync + 'static {
        let hasher = Arc::clone(&self.perceptual_hasher);
        let counters = Arc::clone(&self.counters);
        move |record: FileRecord| match hasher.hash_image(&record.path) {
            Ok(hash) => {
                counters.record_image();
                Some(record.into_image(hash))
            }
            Err(err) if err.is_expected() => {
                tracing::trace!(path = %err.path().display(), "not a decodable image");
                None
            }
            Err(err) => {
                counters.record_error();
                tracing::warn!(path = %err.path().display(), "{err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::FileDigest;
    use lookalike_core::{ContentHash, HashError};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Content hasher backed by a fixed table, recording every call.
    struct TableHasher {
        table: HashMap<PathBuf, &'static str>,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl ContentHasher for TableHasher {
        fn hash_file(&self, path: &Path) -> Result<FileDigest, HashError> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            match self.table.get(path) {
                Some(hash) => Ok(FileDigest {
                    hash: ContentHash::new(*hash),
                    bytes_read: hash.len() as u64,
                }),
                None => Err(HashError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                )),
            }
        }
    }

    struct NoImages;

    impl PerceptualHasher for NoImages {
        fn hash_image(&self, path: &Path) -> Result<u64, HashError> {
            Err(HashError::Decode {
                path: path.to_path_buf(),
                message: "not an image".into(),
            })
        }
    }

    /// Fails every image with an I/O error rather than a decode error.
    struct UnreadableImages;

    impl PerceptualHasher for UnreadableImages {
        fn hash_image(&self, path: &Path) -> Result<u64, HashError> {
            Err(HashError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
            ))
        }
    }

    fn engine_with_images(
        table: &[(&str, &'static str)],
        images: Arc<dyn PerceptualHasher>,
    ) -> (Engine, Arc<TableHasher>) {
        let hasher = Arc::new(TableHasher {
            table: table.iter().map(|(p, h)| (PathBuf::from(p), *h)).collect(),
            calls: Mutex::new(Vec::new()),
        });
        let config = EngineConfig::builder().hash_workers(2usize).build().unwrap();
        let engine = Engine::with_hashers(config, hasher.clone(), images).unwrap();
        (engine, hasher)
    }

    fn engine(table: &[(&str, &'static str)]) -> (Engine, Arc<TableHasher>) {
        engine_with_images(table, Arc::new(NoImages))
    }

    #[test]
    fn test_unique_size_never_hashed() {
        let (engine, hasher) = engine(&[("/A", "H1"), ("/B", "H1"), ("/C", "H2"), ("/D", "H3")]);
        let report = engine
            .run(vec![
                WalkEntry::file("/A", 100),
                WalkEntry::file("/B", 100),
                WalkEntry::file("/C", 100),
                WalkEntry::file("/D", 50),
            ])
            .unwrap();

        let calls = hasher.calls.lock().unwrap();
        assert!(!calls.contains(&PathBuf::from("/D")));
        assert_eq!(calls.len(), 3);

        assert_eq!(report.duplicates.groups.len(), 1);
        let group = &report.duplicates.groups[0];
        assert_eq!(group.hash.as_str(), "H1");
        let mut paths = group.paths.clone();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("/A"), PathBuf::from("/B")]);
        assert!(report.clusters.is_empty());
    }

    #[test]
    fn test_directories_ignored() {
        let (engine, hasher) = engine(&[]);
        let report = engine
            .run(vec![WalkEntry::dir("/x"), WalkEntry::dir("/y")])
            .unwrap();
        assert!(hasher.calls.lock().unwrap().is_empty());
        assert!(!report.has_findings());
        assert_eq!(report.progress.files_observed, 0);
    }

    #[test]
    fn test_hash_failure_does_not_abort() {
        let (engine, _) = engine(&[("/a", "H"), ("/b", "H")]);
        let report = engine
            .run(vec![
                WalkEntry::file("/a", 5),
                WalkEntry::file("/b", 5),
                WalkEntry::file("/missing", 5),
            ])
            .unwrap();

        assert_eq!(report.duplicates.groups.len(), 1);
        assert_eq!(report.progress.errors, 1);
        assert_eq!(report.progress.files_dispatched, 3);
        assert_eq!(report.progress.files_hashed, 2);
    }

    #[test]
    fn test_bytes_hashed_counts_bytes_read() {
        // The walk claims 1000 bytes per file; the hasher reads 5 and 6.
        let (engine, _) = engine(&[("/a", "HHHHH"), ("/b", "HHHHHH")]);
        let report = engine
            .run(vec![WalkEntry::file("/a", 1000), WalkEntry::file("/b", 1000)])
            .unwrap();
        assert_eq!(report.progress.files_hashed, 2);
        assert_eq!(report.progress.bytes_hashed, 11);
    }

    #[test]
    fn test_second_run_starts_from_zero() {
        let (engine, _) = engine(&[("/a", "H"), ("/b", "H")]);
        let entries = vec![WalkEntry::file("/a", 1), WalkEntry::file("/b", 1)];

        let first = engine.run(entries.clone()).unwrap();
        let second = engine.run(entries).unwrap();

        assert_eq!(first.progress.files_observed, 2);
        assert_eq!(second.progress.files_observed, 2);
        assert_eq!(second.progress.files_hashed, 2);
        assert_eq!(second.progress.bytes_hashed, 2);
        assert_eq!(engine.progress().files_observed, 2);
    }

    #[test]
    fn test_unreadable_image_counted_as_error() {
        let (engine, hasher) = engine_with_images(&[], Arc::new(UnreadableImages));
        let report = engine
            .run(vec![WalkEntry::file("/photo.jpg", 10), WalkEntry::file("/notes.txt", 20)])
            .unwrap();

        assert!(hasher.calls.lock().unwrap().is_empty());
        assert_eq!(report.images_analyzed, 0);
        assert!(report.clusters.is_empty());
        assert_eq!(report.progress.images_hashed, 0);
        assert_eq!(report.progress.errors, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            image_hash_width: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(config),
            Err(EngineError::InvalidConfig { .. })
        ));
    }
}
