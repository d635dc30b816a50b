use image::{GrayImage, Luma};
use lookalike_engine::{
    Blake3Hasher, ContentHash, ContentHasher, Engine, EngineConfig, FileDigest, HashError,
    PerceptualHasher, WalkEntry,
};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Wraps the real hasher and records every file it opens.
struct RecordingHasher {
    inner: Blake3Hasher,
    calls: Mutex<Vec<PathBuf>>,
}

impl ContentHasher for RecordingHasher {
    fn hash_file(&self, path: &Path) -> Result<FileDigest, HashError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        self.inner.hash_file(path)
    }
}

/// Hashes from a lookup table, with a little jitter to shuffle completion order.
struct JitterHasher {
    table: HashMap<PathBuf, String>,
    bytes_per_file: u64,
}

impl ContentHasher for JitterHasher {
    fn hash_file(&self, path: &Path) -> Result<FileDigest, HashError> {
        let micros = rand::rng().random_range(0..50);
        std::thread::sleep(Duration::from_micros(micros));
        Ok(FileDigest {
            hash: ContentHash::new(self.table[path].clone()),
            bytes_read: self.bytes_per_file,
        })
    }
}

struct NotAnImage;

impl PerceptualHasher for NotAnImage {
    fn hash_image(&self, path: &Path) -> Result<u64, HashError> {
        Err(HashError::Decode {
            path: path.to_path_buf(),
            message: "skipped".into(),
        })
    }
}

fn walk_files(root: &Path) -> Vec<WalkEntry> {
    let mut entries: Vec<_> = fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap())
        .map(|e| WalkEntry::file(e.path(), e.metadata().unwrap().len()))
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}

fn group_sets(groups: &[lookalike_engine::DuplicateGroup]) -> BTreeSet<BTreeSet<PathBuf>> {
    groups
        .iter()
        .map(|g| g.paths.iter().cloned().collect())
        .collect()
}

#[test]
fn test_real_files_grouped_by_content() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("a.txt"), "same content here").unwrap();
    fs::write(root.join("b.txt"), "same content here").unwrap();
    fs::write(root.join("c.txt"), "other content her").unwrap();
    fs::write(root.join("d.txt"), "short").unwrap();

    let hasher = Arc::new(RecordingHasher {
        inner: Blake3Hasher::new(),
        calls: Mutex::new(Vec::new()),
    });
    let config = EngineConfig::builder().detect_images(false).build().unwrap();
    let engine = Engine::with_hashers(config, hasher.clone(), Arc::new(NotAnImage)).unwrap();

    let report = engine.run(walk_files(root)).unwrap();

    let expected: BTreeSet<BTreeSet<PathBuf>> =
        [[root.join("a.txt"), root.join("b.txt")].into_iter().collect()]
            .into_iter()
            .collect();
    assert_eq!(group_sets(&report.duplicates.groups), expected);
    assert_eq!(report.duplicates.total_wasted_space, 17);

    let calls = hasher.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(!calls.contains(&root.join("d.txt")));

    // The snapshot map still carries the non-duplicate hash
    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.groups.file_count(), 3);
}

#[test]
fn test_similar_images_clustered() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    let rising = GrayImage::from_fn(64, 64, |x, _| Luma([(x * 4) as u8]));
    let mut touched = rising.clone();
    touched.put_pixel(10, 10, Luma([0]));
    let falling = GrayImage::from_fn(64, 64, |x, _| Luma([252 - (x * 4) as u8]));

    rising.save(root.join("rising.png")).unwrap();
    touched.save(root.join("touched.png")).unwrap();
    falling.save(root.join("falling.png")).unwrap();
    fs::write(root.join("broken.png"), "not really a png").unwrap();

    let config = EngineConfig::builder().image_workers(2usize).build().unwrap();
    let engine = Engine::new(config).unwrap();
    let report = engine.run(walk_files(root)).unwrap();

    assert_eq!(report.images_analyzed, 3);
    assert_eq!(report.clusters.len(), 1);

    let members: BTreeSet<PathBuf> = report.clusters[0].paths().into_iter().collect();
    let expected: BTreeSet<PathBuf> = [root.join("rising.png"), root.join("touched.png")]
        .into_iter()
        .collect();
    assert_eq!(members, expected);
    assert!(report.clusters[0].members.iter().all(|m| m.distance <= 5));

    // Undecodable images are skipped without counting as errors
    assert_eq!(report.progress.errors, 0);
}

#[test]
fn test_image_pipeline_disabled() {
    let temp = TempDir::new().unwrap();
    let image = GrayImage::from_fn(16, 16, |x, y| Luma([(x * y) as u8]));
    image.save(temp.path().join("one.png")).unwrap();
    image.save(temp.path().join("two.png")).unwrap();

    let config = EngineConfig::builder().detect_images(false).build().unwrap();
    let report = Engine::new(config).unwrap().run(walk_files(temp.path())).unwrap();

    assert_eq!(report.images_analyzed, 0);
    assert!(report.clusters.is_empty());
    // Still byte-identical files
    assert_eq!(report.duplicates.group_count, 1);
}

#[test]
fn test_concurrent_run_matches_sequential_oracle() {
    let mut rng = rand::rng();

    for round in 0..5 {
        let mut entries = Vec::new();
        let mut table = HashMap::new();
        for i in 0..400 {
            let size: u64 = rng.random_range(1..40);
            let variant: u8 = rng.random_range(0..3);
            let path = PathBuf::from(format!("/round{round}/file{i}"));
            table.insert(path.clone(), format!("{size}-{variant}"));
            entries.push(WalkEntry::file(path, size));
        }
        entries.shuffle(&mut rng);

        // Sequential oracle: group by hash, drop singletons
        let mut oracle: HashMap<&str, BTreeSet<PathBuf>> = HashMap::new();
        for entry in &entries {
            oracle
                .entry(table[&entry.path].as_str())
                .or_default()
                .insert(entry.path.clone());
        }
        let expected: BTreeSet<BTreeSet<PathBuf>> =
            oracle.into_values().filter(|paths| paths.len() > 1).collect();

        let config = EngineConfig::builder()
            .hash_workers(8usize)
            .detect_images(false)
            .progress_interval(16u64)
            .build()
            .unwrap();
        let hasher = Arc::new(JitterHasher {
            table: table.clone(),
            bytes_per_file: 1,
        });
        let engine = Engine::with_hashers(config, hasher, Arc::new(NotAnImage)).unwrap();
        let report = engine.run(entries.clone()).unwrap();

        assert_eq!(group_sets(&report.duplicates.groups), expected, "round {round}");
        assert_eq!(report.progress.files_observed, 400);
    }
}

#[test]
fn test_progress_broadcast_reaches_subscriber() {
    let config = EngineConfig::builder()
        .hash_workers(2usize)
        .detect_images(false)
        .progress_interval(1u64)
        .build()
        .unwrap();
    let table: HashMap<PathBuf, String> = (0..10)
        .map(|i| (PathBuf::from(format!("/p{i}")), "same".to_string()))
        .collect();
    let hasher = JitterHasher {
        table,
        bytes_per_file: 8,
    };
    let engine = Engine::with_hashers(config, Arc::new(hasher), Arc::new(NotAnImage)).unwrap();
    let mut updates = engine.subscribe();

    let entries: Vec<_> = (0..10).map(|i| WalkEntry::file(format!("/p{i}"), 8)).collect();
    let report = engine.run(entries).unwrap();
    assert_eq!(report.duplicates.groups[0].count(), 10);

    let mut last = None;
    while let Ok(progress) = updates.try_recv() {
        last = Some(progress);
    }
    let last = last.expect("at least one progress update");
    assert_eq!(last.files_hashed, 10);
    assert_eq!(last.bytes_hashed, 80);
}

#[test]
fn test_run_without_subscriber_completes() {
    let temp = TempDir::new().unwrap();
    for i in 0..50 {
        fs::write(temp.path().join(format!("{i}.bin")), [i as u8 % 5; 32]).unwrap();
    }
    let config = EngineConfig::builder().progress_interval(1u64).build().unwrap();
    let report = Engine::new(config).unwrap().run(walk_files(temp.path())).unwrap();
    assert_eq!(report.duplicates.group_count, 5);
    assert_eq!(report.duplicates.files_with_duplicates, 50);
}
