//! Task fingerprints for up-to-date checks
//!
//! A fingerprint hashes everything a task reads (input files, walked
//! recursively, and input properties) together with the listing of what it
//! wrote. A task whose stored fingerprint equals the current one is up to date.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Hash of a task's inputs and outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Hex encoded SHA-256
    pub hash: String,
    /// Number of input files hashed
    pub input_files: usize,
    /// Number of output files listed
    pub output_files: usize,
}

impl Fingerprint {
    /// Compute the fingerprint of a task
    pub fn compute(
        inputs: &[PathBuf],
        properties: &BTreeMap<String, String>,
        outputs: &[PathBuf],
    ) -> BuildResult<Self> {
        let mut hasher = Sha256::new();

        let mut input_files = 0;
        for input in sorted(inputs) {
            hasher.update(b"input\0");
            hasher.update(input.to_string_lossy().as_bytes());
            for file in files_below(&input)? {
                hasher.update(file.to_string_lossy().as_bytes());
                hasher.update(compute_hash(&file)?.as_bytes());
                input_files += 1;
            }
        }

        for (key, value) in properties {
            hasher.update(b"property\0");
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
        }

        let mut output_files = 0;
        for output in sorted(outputs) {
            hasher.update(b"output\0");
            for file in files_below(&output)? {
                let relative = file.strip_prefix(&output).unwrap_or(&file);
                let len = fs::metadata(&file)
                    .map_err(|e| BuildError::io(&file, e))?
                    .len();
                hasher.update(relative.to_string_lossy().as_bytes());
                hasher.update(len.to_le_bytes());
                output_files += 1;
            }
        }

        Ok(Self {
            hash: format!("{:x}", hasher.finalize()),
            input_files,
            output_files,
        })
    }
}

/// SHA-256 of a file's content, hex encoded
pub fn compute_hash(path: &Path) -> BuildResult<String> {
    let content = fs::read(path).map_err(|e| BuildError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprints persisted as one JSON file per task
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    dir: PathBuf,
}

impl FingerprintStore {
    /// Store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stored fingerprint of a task; unreadable entries count as absent
    pub fn load(&self, task: &str) -> Option<Fingerprint> {
        let content = fs::read_to_string(self.path(task)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Persist a task's fingerprint
    pub fn save(&self, task: &str, fingerprint: &Fingerprint) -> BuildResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| BuildError::io(&self.dir, e))?;
        let path = self.path(task);
        let json = serde_json::to_string_pretty(fingerprint)
            .map_err(|e| BuildError::io(&path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        fs::write(&path, json).map_err(|e| BuildError::io(&path, e))
    }

    /// Forget a task's fingerprint
    pub fn remove(&self, task: &str) -> BuildResult<()> {
        let path = self.path(task);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::io(path, e)),
        }
    }

    fn path(&self, task: &str) -> PathBuf {
        self.dir.join(format!("{}.json", task))
    }
}

fn sorted(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = paths.to_vec();
    paths.sort();
    paths.dedup();
    paths
}

/// Regular files at or below `path`, sorted; nothing for a missing path
fn files_below(path: &Path) -> BuildResult<Vec<PathBuf>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::io(path, e.into()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn props(version: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("scala.version".to_string(), version.to_string())])
    }

    #[test]
    fn test_stable_for_unchanged_inputs() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("App.scala");
        fs::write(&src, "object App").unwrap();

        let a = Fingerprint::compute(&[src.clone()], &props("2.12.8"), &[]).unwrap();
        let b = Fingerprint::compute(&[src], &props("2.12.8"), &[]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.input_files, 1);
    }

    #[test]
    fn test_changes_with_content_property_and_output() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("App.scala");
        let out = temp.path().join("out");
        fs::write(&src, "object App").unwrap();

        let base = Fingerprint::compute(&[src.clone()], &props("2.12.8"), &[out.clone()]).unwrap();

        let other_version =
            Fingerprint::compute(&[src.clone()], &props("2.13.8"), &[out.clone()]).unwrap();
        assert_ne!(base.hash, other_version.hash);

        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("App.class"), "bytes").unwrap();
        let with_output =
            Fingerprint::compute(&[src.clone()], &props("2.12.8"), &[out.clone()]).unwrap();
        assert_ne!(base.hash, with_output.hash);
        assert_eq!(with_output.output_files, 1);

        fs::write(&src, "object App2").unwrap();
        let edited = Fingerprint::compute(&[src], &props("2.12.8"), &[out]).unwrap();
        assert_ne!(with_output.hash, edited.hash);
    }

    #[test]
    fn test_directory_inputs_are_walked() {
        let temp = TempDir::new().unwrap();
        let classes = temp.path().join("classes");
        fs::create_dir_all(classes.join("pkg")).unwrap();
        fs::write(classes.join("pkg/A.class"), "a").unwrap();

        let before = Fingerprint::compute(&[classes.clone()], &BTreeMap::new(), &[]).unwrap();
        fs::write(classes.join("pkg/B.class"), "b").unwrap();
        let after = Fingerprint::compute(&[classes], &BTreeMap::new(), &[]).unwrap();

        assert_ne!(before.hash, after.hash);
        assert_eq!(after.input_files, 2);
    }

    #[test]
    fn test_store_round_trip_and_remove() {
        let temp = TempDir::new().unwrap();
        let store = FingerprintStore::new(temp.path().join("fingerprints"));
        let fingerprint = Fingerprint {
            hash: "abc".to_string(),
            input_files: 1,
            output_files: 2,
        };

        assert!(store.load("compileScala").is_none());
        store.save("compileScala", &fingerprint).unwrap();
        assert_eq!(store.load("compileScala"), Some(fingerprint));

        store.remove("compileScala").unwrap();
        assert!(store.load("compileScala").is_none());
        store.remove("compileScala").unwrap();
    }

    #[test]
    fn test_corrupt_entry_is_absent() {
        let temp = TempDir::new().unwrap();
        let store = FingerprintStore::new(temp.path());
        fs::write(temp.path().join("compileScala.json"), "{not json").unwrap();
        assert!(store.load("compileScala").is_none());
    }
}
