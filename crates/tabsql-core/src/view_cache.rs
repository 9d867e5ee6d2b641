use std::path::Path;

use indexmap::IndexMap;

use crate::error::Result;
use crate::view::View;

/// Canonicalizes a path the way the cache keys views: absolute, upper-cased.
/// This is a pure string transform — the filesystem canonicalization (e.g.
/// resolving `..`/symlinks) is the caller's job via the I/O collaborator.
pub fn canonical_key(path: &Path) -> String {
    path.to_string_lossy().to_uppercase()
}

/// Process-wide map of loaded persistent views. Guarantees at-most-one
/// in-memory copy per file, so that later statements in the same script
/// observe earlier mutations (read-your-writes, §5).
#[derive(Debug, Default)]
pub struct ViewCache {
    entries: IndexMap<String, View>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&canonical_key(path))
    }

    pub fn get(&self, path: &Path) -> Option<&View> {
        self.entries.get(&canonical_key(path))
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut View> {
        self.entries.get_mut(&canonical_key(path))
    }

    /// Returns the cached view for `path`, loading it with `loader` on first
    /// reference. `loader` is invoked at most once per distinct path.
    pub fn get_or_load(
        &mut self,
        path: &Path,
        loader: impl FnOnce() -> Result<View>,
    ) -> Result<&mut View> {
        let key = canonical_key(path);
        if !self.entries.contains_key(&key) {
            let view = loader()?;
            self.entries.insert(key.clone(), view);
        }
        Ok(self.entries.get_mut(&key).expect("just inserted"))
    }

    pub fn insert(&mut self, path: &Path, view: View) {
        self.entries.insert(canonical_key(path), view);
    }

    pub fn remove(&mut self, path: &Path) -> Option<View> {
        self.entries.remove(&canonical_key(path))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn dirty_views(&self) -> impl Iterator<Item = &View> {
        self.entries.values().filter(|v| v.dirty)
    }

    pub fn dirty_views_mut(&mut self) -> impl Iterator<Item = &mut View> {
        self.entries.values_mut().filter(|v| v.dirty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use crate::view::FileInfo;
    use std::path::PathBuf;

    #[test]
    fn loader_runs_at_most_once() {
        let mut cache = ViewCache::new();
        let path = PathBuf::from("/tmp/a.csv");
        let mut loads = 0;
        cache
            .get_or_load(&path, || {
                loads += 1;
                Ok(View::new("a", FileInfo::temporary(), Header::default(), vec![]))
            })
            .unwrap();
        cache
            .get_or_load(&path, || {
                loads += 1;
                Ok(View::new("a", FileInfo::temporary(), Header::default(), vec![]))
            })
            .unwrap();
        assert_eq!(loads, 1);
    }

    #[test]
    fn key_is_case_insensitive_and_absolute() {
        let a = PathBuf::from("/tmp/A.csv");
        let b = PathBuf::from("/tmp/a.csv");
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }
}
