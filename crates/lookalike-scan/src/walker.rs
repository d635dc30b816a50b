//! JWalk-based multi-root walker.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{DirEntryIter, Parallelism, WalkDir};

use lookalike_core::{ScanConfig, ScanError, ScanWarning, WalkEntry, WarningKind};

/// Walks the configured roots and yields files and directories lazily.
pub struct FileWalker {
    config: ScanConfig,
    ignore: GlobSet,
    warnings: Arc<Mutex<Vec<ScanWarning>>>,
}

impl FileWalker {
    /// Create a walker, compiling the ignore patterns.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let ignore = build_ignore_set(&config.ignore_patterns)?;
        Ok(Self {
            config,
            ignore,
            warnings: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// The configuration this walker was built with.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Check every root, then start a lazy walk over all of them.
    pub fn walk(&self) -> Result<Walk, ScanError> {
        for root in &self.config.roots {
            let metadata = std::fs::metadata(root).map_err(|e| ScanError::io(root, e))?;
            if !metadata.is_dir() {
                return Err(ScanError::NotADirectory { path: root.clone() });
            }
        }

        Ok(Walk {
            roots: self.config.roots.clone().into_iter(),
            current: None,
            config: self.config.clone(),
            ignore: self.ignore.clone(),
            warnings: Arc::clone(&self.warnings),
        })
    }

    /// Warnings collected by walks started from this walker.
    pub fn warnings(&self) -> Vec<ScanWarning> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Lazy iterator over every entry below the walker's roots.
pub struct Walk {
    roots: std::vec::IntoIter<PathBuf>,
    current: Option<DirEntryIter<((), ())>>,
    config: ScanConfig,
    ignore: GlobSet,
    warnings: Arc<Mutex<Vec<ScanWarning>>>,
}

impl Walk {
    fn open_root(&self, root: &Path) -> DirEntryIter<((), ())> {
        let parallelism = match self.config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let ignore = self.ignore.clone();
        WalkDir::new(root)
            .parallelism(parallelism)
            .skip_hidden(!self.config.include_hidden)
            .follow_links(self.config.follow_symlinks)
            .sort(true)
            .process_read_dir(move |_depth, _path, _state, children| {
                if ignore.is_empty() {
                    return;
                }
                children.retain(|child| match child {
                    Ok(entry) => !(ignore.is_match(entry.file_name()) || ignore.is_match(entry.path())),
                    Err(_) => true,
                });
            })
            .into_iter()
    }

    fn record_warning(&self, warning: ScanWarning) {
        tracing::warn!(path = %warning.path.display(), "{}", warning.message);
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning);
    }
}

impl Iterator for Walk {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        loop {
            if self.current.is_none() {
                let root = self.roots.next()?;
                tracing::debug!(root = %root.display(), "walking root");
                self.current = Some(self.open_root(&root));
            }

            let next = self.current.as_mut().and_then(Iterator::next);
            let entry = match next {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let kind = match err.io_error().map(std::io::Error::kind) {
                        Some(std::io::ErrorKind::PermissionDenied) => WarningKind::PermissionDenied,
                        _ => WarningKind::ReadError,
                    };
                    self.record_warning(ScanWarning::new(path, err.to_string(), kind));
                    continue;
                }
                None => {
                    self.current = None;
                    continue;
                }
            };

            let file_type = entry.file_type();
            let path = entry.path();

            if file_type.is_dir() {
                return Some(WalkEntry::dir(path));
            }
            if !file_type.is_file() {
                // Sockets, devices and unfollowed symlinks.
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    self.record_warning(ScanWarning::new(
                        &path,
                        err.to_string(),
                        WarningKind::MetadataError,
                    ));
                    continue;
                }
            };

            if size < self.config.min_size {
                continue;
            }

            return Some(WalkEntry::file(path, size));
        }
    }
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidConfig {
            message: format!("invalid ignore pattern {pattern:?}: {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::InvalidConfig {
        message: e.to_string(),
    })
}
