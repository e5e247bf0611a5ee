//! JSON manifest candidate source.

use super::CandidateSource;
use crate::core::candidate::Candidate;
use crate::error::SourceError;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

/// Reads candidates from a JSON array on disk
///
/// The file is re-read on every batch, so entries appended while the
/// scheduler runs are picked up. An entry keeps being offered until the
/// scheduler acknowledges it; entries offered fewer times go first, so a
/// few stuck entries cannot starve the rest of the manifest.
pub struct ManifestSource {
    path: PathBuf,
    settled: HashSet<String>,
    attempts: HashMap<String, u32>,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settled: HashSet::new(),
            attempts: HashMap::new(),
        }
    }

    /// Read every entry in the manifest
    pub fn read_all(&self) -> Result<Vec<Candidate>, SourceError> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            SourceError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        serde_json::from_str(&contents).map_err(|e| SourceError::ManifestInvalid {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn attempts(&self, external_id: &str) -> u32 {
        self.attempts.get(external_id).copied().unwrap_or(0)
    }
}

impl CandidateSource for ManifestSource {
    fn fetch_batch(&mut self, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let mut seen = HashSet::new();
        let mut pending: Vec<Candidate> = self
            .read_all()?
            .into_iter()
            .filter(|c| !self.settled.contains(&c.external_id))
            .filter(|c| seen.insert(c.external_id.clone()))
            .collect();

        // Stable, so manifest order holds among equals
        pending.sort_by_key(|c| self.attempts(&c.external_id));
        pending.truncate(limit);

        for candidate in &pending {
            *self
                .attempts
                .entry(candidate.external_id.clone())
                .or_insert(0) += 1;
        }
        Ok(pending)
    }

    fn acknowledge(&mut self, external_id: &str) {
        self.attempts.remove(external_id);
        self.settled.insert(external_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, ids: &[&str]) -> PathBuf {
        let entries: Vec<_> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "externalId": id,
                    "title": format!("post {id}"),
                    "sourceUrl": format!("{id}.jpg"),
                    "score": 50
                })
            })
            .collect();
        let path = dir.path().join("manifest.json");
        fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();
        path
    }

    fn ids(batch: &[Candidate]) -> Vec<&str> {
        batch.iter().map(|c| c.external_id.as_str()).collect()
    }

    fn acknowledge_all(source: &mut ManifestSource, batch: &[Candidate]) {
        for candidate in batch {
            source.acknowledge(&candidate.external_id);
        }
    }

    #[test]
    fn acknowledged_entries_are_never_repeated() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, &["a", "b", "c"]);
        let mut source = ManifestSource::new(path);

        let first = source.fetch_batch(2).unwrap();
        acknowledge_all(&mut source, &first);
        let second = source.fetch_batch(2).unwrap();
        acknowledge_all(&mut source, &second);
        let third = source.fetch_batch(2).unwrap();

        assert_eq!(ids(&first), vec!["a", "b"]);
        assert_eq!(ids(&second), vec!["c"]);
        assert!(third.is_empty());
    }

    #[test]
    fn unacknowledged_entries_come_back_after_fresh_ones() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, &["a", "b", "c"]);
        let mut source = ManifestSource::new(path);

        let first = source.fetch_batch(2).unwrap();
        source.acknowledge("b");
        let second = source.fetch_batch(2).unwrap();
        let third = source.fetch_batch(2).unwrap();

        assert_eq!(ids(&first), vec!["a", "b"]);
        assert_eq!(ids(&second), vec!["c", "a"]);
        assert_eq!(ids(&third), vec!["c", "a"]);
    }

    #[test]
    fn repeated_ids_in_the_manifest_are_offered_once() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, &["a", "a", "b"]);
        let mut source = ManifestSource::new(path);

        assert_eq!(ids(&source.fetch_batch(10).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn appended_entries_are_picked_up() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, &["a"]);
        let mut source = ManifestSource::new(&path);

        assert_eq!(source.fetch_batch(10).unwrap().len(), 1);
        source.acknowledge("a");

        write_manifest(&dir, &["a", "b"]);
        let batch = source.fetch_batch(10).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].external_id, "b");
    }

    #[test]
    fn missing_manifest_is_unavailable() {
        let mut source = ManifestSource::new("/nonexistent/manifest.json");
        assert!(matches!(
            source.fetch_batch(1),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn malformed_manifest_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();

        let mut source = ManifestSource::new(path);
        assert!(matches!(
            source.fetch_batch(1),
            Err(SourceError::ManifestInvalid { .. })
        ));
    }
}
