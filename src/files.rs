//! Object file registration.
//!
//! Attaching a file is a two-step commit: the bytes go into the blob store
//! under the file's base name, and only once that succeeds is a `files`
//! entry added to the view state at the viewport current at commit time.

use crate::blobs::BlobStore;
use crate::error::{Result, ViewerError};
use crate::state::{Update, ViewStateStore};
use crate::types::{FileCoord, ViewStatePatch};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// The only file type the picker accepts.
pub const OBJECT_EXTENSION: &str = "obj";

/// `accept` attribute value for the file picker.
pub const ACCEPTED_FILE_TYPES: &str = ".obj";

/// A file chosen in the picker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PickedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Result of attaching one file.
#[derive(Clone, Debug, PartialEq)]
pub enum Registration {
    Registered { name: String, coord: FileCoord },
    /// An object with this name already exists; nothing was written.
    Duplicate { name: String },
}

/// Result of a consistency sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// `files` entries whose blob was missing; these were removed.
    pub missing_blobs: Vec<String>,
    /// Blobs with no `files` entry; left in place.
    pub orphaned_blobs: Vec<String>,
}

/// Object name for a picked file: the base name without its extension.
pub fn object_name(file_name: &str) -> Result<String> {
    let path = Path::new(file_name);

    let accepted = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OBJECT_EXTENSION));
    if !accepted {
        return Err(ViewerError::UnsupportedFile(file_name.to_string()));
    }

    match path.file_stem().and_then(|stem| stem.to_str()) {
        Some(stem) if !stem.trim().is_empty() => Ok(stem.to_string()),
        _ => Err(ViewerError::InvalidFileName(file_name.to_string())),
    }
}

/// Registers object files against the view state and the blob store.
pub struct FileRegistry {
    state: Arc<ViewStateStore>,
    blobs: Arc<dyn BlobStore>,
}

impl FileRegistry {
    pub fn new(state: Arc<ViewStateStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { state, blobs }
    }

    /// Attach one file.
    ///
    /// A name already registered or already stored is skipped without writing
    /// anything. If storing the bytes fails, the view state is not touched.
    pub fn register(&self, file_name: &str, bytes: &[u8]) -> Result<Registration> {
        let name = object_name(file_name)?;

        if self.state.current().files.contains_key(&name) || self.blobs.exists(&name)? {
            tracing::debug!(%name, "object already registered, skipping");
            return Ok(Registration::Duplicate { name });
        }

        self.blobs.put(&name, bytes)?;

        // Read the viewport when committing, not when the file was picked.
        let key = name.clone();
        let next = self.state.update(Update::computed(move |current| {
            ViewStatePatch::add_file(key, FileCoord::from(current.coords))
        }))?;

        let coord = next.files.get(&name).copied().ok_or_else(|| {
            ViewerError::InvalidPatch(format!("{name} missing after registration"))
        })?;

        tracing::info!(
            %name,
            bytes = bytes.len(),
            longitude = coord.longitude,
            latitude = coord.latitude,
            "object registered"
        );
        Ok(Registration::Registered { name, coord })
    }

    /// Attach every file from one picker interaction.
    ///
    /// Failures are logged and reported per file; they do not stop the batch.
    pub fn register_batch(&self, files: Vec<PickedFile>) -> Vec<(String, Result<Registration>)> {
        files
            .into_iter()
            .map(|file| {
                let outcome = self.register(&file.file_name, &file.bytes);
                if let Err(e) = &outcome {
                    tracing::warn!(file = %file.file_name, error = %e, "failed to register object");
                }
                (file.file_name, outcome)
            })
            .collect()
    }

    /// Raw bytes of a stored object.
    pub fn object_bytes(&self, name: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(name)?
            .ok_or_else(|| ViewerError::BlobNotFound(name.to_string()))
    }

    /// Remove an object.
    ///
    /// The blob is deleted first; the `files` entry is only dropped once that
    /// succeeds, so a failed delete leaves both sides in place. Returns whether
    /// anything was removed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let deleted = self.blobs.delete(name)?;

        let registered = self.state.current().files.contains_key(name);
        if registered {
            self.state.update(ViewStatePatch::remove_file(name))?;
        }

        tracing::info!(%name, deleted, registered, "object removed");
        Ok(deleted || registered)
    }

    /// Drop `files` entries whose blob is gone and report unreferenced blobs.
    pub fn sweep(&self) -> Result<SweepReport> {
        let state = self.state.current();

        let mut missing_blobs = Vec::new();
        for name in state.files.keys() {
            if !self.blobs.exists(name)? {
                missing_blobs.push(name.clone());
            }
        }

        if !missing_blobs.is_empty() {
            let tombstones: BTreeMap<String, Option<FileCoord>> = missing_blobs
                .iter()
                .map(|name| (name.clone(), None))
                .collect();
            self.state.update(ViewStatePatch {
                files: Some(tombstones),
                ..Default::default()
            })?;
            tracing::warn!(count = missing_blobs.len(), "removed entries with missing blobs");
        }

        let orphaned_blobs: Vec<String> = self
            .blobs
            .names()?
            .into_iter()
            .filter(|name| !state.files.contains_key(name))
            .collect();

        Ok(SweepReport {
            missing_blobs,
            orphaned_blobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobs::MemoryBlobStore;
    use crate::storage::{DurableStorage, MemoryStorage};
    use crate::types::{Coords, ViewStatePatch};

    fn registry() -> (FileRegistry, Arc<ViewStateStore>, Arc<MemoryBlobStore>) {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        let state = Arc::new(ViewStateStore::new(storage, "state"));
        state.initialize();
        let blobs = Arc::new(MemoryBlobStore::new());
        let registry = FileRegistry::new(Arc::clone(&state), Arc::clone(&blobs) as Arc<dyn BlobStore>);
        (registry, state, blobs)
    }

    #[test]
    fn test_object_name() {
        assert_eq!(object_name("tower.obj").unwrap(), "tower");
        assert_eq!(object_name("Tower.OBJ").unwrap(), "Tower");
        assert_eq!(object_name("model.v2.obj").unwrap(), "model.v2");
        assert!(matches!(
            object_name("tower.stl"),
            Err(ViewerError::UnsupportedFile(_))
        ));
        assert!(matches!(
            object_name("tower"),
            Err(ViewerError::UnsupportedFile(_))
        ));
    }

    #[test]
    fn test_register_stores_blob_and_entry() {
        let (registry, state, blobs) = registry();
        state
            .update(ViewStatePatch::coords(Coords {
                longitude: 5.0,
                latitude: 6.0,
                zoom: 12.0,
            }))
            .unwrap();

        let outcome = registry.register("tower.obj", b"v 0 0 0").unwrap();

        let coord = FileCoord {
            longitude: 5.0,
            latitude: 6.0,
        };
        assert_eq!(
            outcome,
            Registration::Registered {
                name: "tower".into(),
                coord
            }
        );
        assert_eq!(state.current().files.get("tower"), Some(&coord));
        assert_eq!(registry.object_bytes("tower").unwrap(), b"v 0 0 0");
        assert_eq!(blobs.put_count(), 1);
    }

    #[test]
    fn test_duplicate_writes_nothing() {
        let (registry, state, blobs) = registry();
        registry.register("tower.obj", b"first").unwrap();
        let before = state.current();

        let outcome = registry.register("tower.obj", b"second").unwrap();

        assert_eq!(outcome, Registration::Duplicate { name: "tower".into() });
        assert_eq!(blobs.put_count(), 1);
        assert_eq!(registry.object_bytes("tower").unwrap(), b"first");
        assert!(Arc::ptr_eq(&before, &state.current()));
    }

    #[test]
    fn test_batch_reports_each_file() {
        let (registry, state, _) = registry();

        let outcomes = registry.register_batch(vec![
            PickedFile::new("a.obj", b"a".to_vec()),
            PickedFile::new("notes.txt", b"n".to_vec()),
            PickedFile::new("b.obj", b"b".to_vec()),
        ]);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].1.is_ok());
        assert!(matches!(outcomes[1].1, Err(ViewerError::UnsupportedFile(_))));
        assert!(outcomes[2].1.is_ok());
        assert_eq!(state.current().files.len(), 2);
    }

    #[test]
    fn test_remove_drops_blob_and_entry() {
        let (registry, state, blobs) = registry();
        registry.register("tower.obj", b"v").unwrap();

        assert!(registry.remove("tower").unwrap());
        assert!(state.current().files.is_empty());
        assert!(!blobs.exists("tower").unwrap());
        assert!(!registry.remove("tower").unwrap());
        assert!(matches!(
            registry.object_bytes("tower"),
            Err(ViewerError::BlobNotFound(_))
        ));
    }

    #[test]
    fn test_sweep() {
        let (registry, state, blobs) = registry();
        registry.register("kept.obj", b"k").unwrap();
        registry.register("lost.obj", b"l").unwrap();
        blobs.delete("lost").unwrap();
        blobs.put("stray", b"s").unwrap();

        let report = registry.sweep().unwrap();

        assert_eq!(report.missing_blobs, vec!["lost".to_string()]);
        assert_eq!(report.orphaned_blobs, vec!["stray".to_string()]);
        let files = state.current().files.clone();
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["kept"]);
    }
}
