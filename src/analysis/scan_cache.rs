//! One shared scanner per project root

use crate::analysis::project_scanner::ProjectScanner;
use crate::paths::canonical_key;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Hands out the same [`ProjectScanner`] for every request on the same canonical root
pub struct ScanCache {
    max_files: usize,
    scanners: Mutex<HashMap<PathBuf, Arc<ProjectScanner>>>,
}

impl ScanCache {
    pub fn new(max_files: usize) -> Self {
        Self {
            max_files,
            scanners: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, root: &Path) -> Arc<ProjectScanner> {
        let key = canonical_key(root);
        let mut scanners = match self.scanners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(scanners.entry(key.clone()).or_insert_with(|| {
            tracing::debug!("Creating scanner for {}", key.display());
            Arc::new(ProjectScanner::new(&key, self.max_files))
        }))
    }

    pub fn len(&self) -> usize {
        self.scanners.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut scanners) = self.scanners.lock() {
            scanners.clear();
        }
    }
}

impl Default for ScanCache {
    fn default() -> Self {
        Self::new(crate::config::default_max_files())
    }
}
