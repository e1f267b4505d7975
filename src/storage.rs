//! # Storage Module
//!
//! Per-user JSON persistence for rooms, materials and estimate lines.
//! Each record kind lives in one file per user under `{root}/users/`,
//! holding a JSON array. Writes replace the whole file (last write wins)
//! through a temporary file in the same directory, so a reader never sees
//! a partially written array.
//!
//! Records that fail to parse are skipped on read. Before such a file is
//! rewritten it is renamed to `{file}.corrupt-{timestamp}` so the skipped
//! records survive for manual recovery.

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::StorageError;
use crate::estimate::EstimateLine;
use crate::material_model::Material;
use crate::room_model::Room;

type StorageResult<T> = Result<T, StorageError>;

/// Kinds of per-user record files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Rooms,
    Materials,
    Estimate,
}

impl RecordKind {
    fn file_suffix(&self) -> &'static str {
        match self {
            RecordKind::Rooms => "rooms",
            RecordKind::Materials => "materials",
            RecordKind::Estimate => "estimate",
        }
    }
}

/// Records with a creation stamp, used to check that a delete button still
/// points at the record it was built for
pub trait Stamped {
    fn stamp(&self) -> i64;
}

impl Stamped for Room {
    fn stamp(&self) -> i64 {
        self.created_at.timestamp_micros()
    }
}

impl Stamped for Material {
    fn stamp(&self) -> i64 {
        self.created_at.timestamp_micros()
    }
}

/// Contents of a record file and whether anything in it was unreadable
struct LoadedRecords<T> {
    records: Vec<T>,
    damaged: bool,
}

impl<T> LoadedRecords<T> {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            damaged: false,
        }
    }
}

/// File-backed store of per-user records
#[derive(Debug)]
pub struct UserStore {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl UserStore {
    /// Create a store rooted at `root`; directories are created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!(root = %root.display(), "Initialized user store");
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the given user's file for a record kind
    pub fn file_path(&self, user_id: i64, kind: RecordKind) -> PathBuf {
        self.root
            .join("users")
            .join(format!("{}_{}.json", user_id, kind.file_suffix()))
    }

    // Rooms

    pub fn save_room(&self, user_id: i64, room: Room) -> StorageResult<()> {
        info!(user_id, room = %room.name, "Saving room");
        self.append(user_id, RecordKind::Rooms, room)
    }

    pub fn get_user_rooms(&self, user_id: i64) -> StorageResult<Vec<Room>> {
        self.load(user_id, RecordKind::Rooms)
    }

    /// First room with exactly this name
    pub fn find_room(&self, user_id: i64, name: &str) -> StorageResult<Option<Room>> {
        Ok(self
            .get_user_rooms(user_id)?
            .into_iter()
            .find(|room| room.name == name))
    }

    /// Remove the room at `index` if its stamp is still `stamp`, returning it
    pub fn delete_room(&self, user_id: i64, index: usize, stamp: i64) -> StorageResult<Room> {
        info!(user_id, index, stamp, "Deleting room");
        self.remove_at(user_id, RecordKind::Rooms, index, stamp)
    }

    // Materials

    pub fn save_material(&self, user_id: i64, material: Material) -> StorageResult<()> {
        info!(user_id, material = %material.name, "Saving material");
        self.append(user_id, RecordKind::Materials, material)
    }

    pub fn get_user_materials(&self, user_id: i64) -> StorageResult<Vec<Material>> {
        self.load(user_id, RecordKind::Materials)
    }

    /// First material with exactly this name
    pub fn find_material(&self, user_id: i64, name: &str) -> StorageResult<Option<Material>> {
        Ok(self
            .get_user_materials(user_id)?
            .into_iter()
            .find(|material| material.name == name))
    }

    pub fn delete_material(&self, user_id: i64, index: usize, stamp: i64) -> StorageResult<Material> {
        info!(user_id, index, stamp, "Deleting material");
        self.remove_at(user_id, RecordKind::Materials, index, stamp)
    }

    /// Append materials not already present (same name, category and unit).
    /// Imported records get distinct, increasing timestamps. Returns how many
    /// were added.
    pub fn import_materials(&self, user_id: i64, materials: Vec<Material>) -> StorageResult<usize> {
        let _guard = self.lock();
        let mut existing: Vec<Material> = self.load_for_update(user_id, RecordKind::Materials)?;
        let before = existing.len();
        let imported_at = Utc::now();

        for mut material in materials {
            let duplicate = existing.iter().any(|m| {
                m.name == material.name && m.category == material.category && m.unit == material.unit
            });
            if !duplicate {
                let offset = (existing.len() - before) as i64;
                material.created_at = imported_at + Duration::microseconds(offset);
                existing.push(material);
            }
        }

        let added = existing.len() - before;
        if added > 0 {
            self.write(user_id, RecordKind::Materials, &existing)?;
        }
        info!(user_id, added, "Imported materials");
        Ok(added)
    }

    // Estimate

    pub fn add_estimate_line(&self, user_id: i64, line: EstimateLine) -> StorageResult<()> {
        info!(user_id, room = %line.room_name, material = %line.material_name, "Adding estimate line");
        self.append(user_id, RecordKind::Estimate, line)
    }

    pub fn get_estimate_lines(&self, user_id: i64) -> StorageResult<Vec<EstimateLine>> {
        self.load(user_id, RecordKind::Estimate)
    }

    /// Remove every estimate line; returns whether there was anything to clear
    pub fn clear_estimate(&self, user_id: i64) -> StorageResult<bool> {
        let _guard = self.lock();
        let path = self.file_path(user_id, RecordKind::Estimate);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(user_id, "Cleared estimate");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    // Generic record file handling

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means another writer panicked; the files are still whole
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn append<T>(&self, user_id: i64, kind: RecordKind, record: T) -> StorageResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let _guard = self.lock();
        let mut records: Vec<T> = self.load_for_update(user_id, kind)?;
        records.push(record);
        self.write(user_id, kind, &records)
    }

    fn remove_at<T>(&self, user_id: i64, kind: RecordKind, index: usize, stamp: i64) -> StorageResult<T>
    where
        T: Serialize + DeserializeOwned + Stamped,
    {
        let _guard = self.lock();
        let mut records: Vec<T> = self.load_for_update(user_id, kind)?;
        match records.get(index) {
            None => {
                return Err(StorageError::IndexOutOfRange {
                    index,
                    len: records.len(),
                })
            }
            Some(record) if record.stamp() != stamp => {
                return Err(StorageError::RecordChanged { index });
            }
            Some(_) => {}
        }
        let removed = records.remove(index);
        self.write(user_id, kind, &records)?;
        Ok(removed)
    }

    fn load<T: DeserializeOwned>(&self, user_id: i64, kind: RecordKind) -> StorageResult<Vec<T>> {
        Ok(self.read_records(&self.file_path(user_id, kind))?.records)
    }

    /// Load records that are about to be rewritten. A damaged file is moved
    /// aside first.
    fn load_for_update<T: DeserializeOwned>(&self, user_id: i64, kind: RecordKind) -> StorageResult<Vec<T>> {
        let path = self.file_path(user_id, kind);
        let loaded = self.read_records(&path)?;
        if loaded.damaged {
            let backup = corrupt_backup_path(&path);
            fs::rename(&path, &backup).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            warn!(
                user_id,
                path = %path.display(),
                backup = %backup.display(),
                kept = loaded.records.len(),
                "Moved damaged record file aside before rewriting"
            );
        }
        Ok(loaded.records)
    }

    fn read_records<T: DeserializeOwned>(&self, path: &Path) -> StorageResult<LoadedRecords<T>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No record file yet");
                return Ok(LoadedRecords::empty());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let raw: Vec<Value> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable record file, treating as empty");
                return Ok(LoadedRecords {
                    records: Vec::new(),
                    damaged: true,
                });
            }
        };

        let mut loaded = LoadedRecords::empty();
        for (index, value) in raw.into_iter().enumerate() {
            match serde_json::from_value(value) {
                Ok(record) => loaded.records.push(record),
                Err(e) => {
                    warn!(path = %path.display(), index, error = %e, "Skipping unreadable record");
                    loaded.damaged = true;
                }
            }
        }
        Ok(loaded)
    }

    fn write<T: Serialize>(&self, user_id: i64, kind: RecordKind, records: &[T]) -> StorageResult<()> {
        let path = self.file_path(user_id, kind);
        write_json_atomically(&path, records)?;
        debug!(path = %path.display(), records = records.len(), "Record file written");
        Ok(())
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        "{}.corrupt-{}",
        file_name,
        Utc::now().format("%Y%m%dT%H%M%S%.6f")
    ))
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it
pub fn write_json_atomically<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    serde_json::to_writer_pretty(temp_file.as_file_mut(), value).map_err(|source| {
        StorageError::Serialization {
            path: path.to_path_buf(),
            source,
        }
    })?;
    temp_file
        .as_file_mut()
        .flush()
        .map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    temp_file.persist(path).map_err(|source| StorageError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material_model::{MaterialCategory, MaterialUnit};
    use tempfile::TempDir;

    fn setup_store() -> (UserStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (UserStore::new(dir.path()), dir)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (store, _dir) = setup_store();
        assert!(store.get_user_rooms(1).unwrap().is_empty());
        assert!(store.get_user_materials(1).unwrap().is_empty());
        assert!(!store.clear_estimate(1).unwrap());
    }

    #[test]
    fn test_file_layout() {
        let (store, dir) = setup_store();
        store.save_room(42, Room::new("Kitchen", 3.0, 2.0, 2.5)).unwrap();
        assert!(dir.path().join("users").join("42_rooms.json").exists());
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let (store, _dir) = setup_store();
        let path = store.file_path(7, RecordKind::Rooms);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(store.get_user_rooms(7).unwrap().is_empty());
        // Reading never moves the file
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_backup_path_keeps_file_name() {
        let path = Path::new("/data/users/7_rooms.json");
        let backup = corrupt_backup_path(path);
        assert_eq!(backup.parent(), path.parent());
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("7_rooms.json.corrupt-"));
    }

    #[test]
    fn test_delete_out_of_range() {
        let (store, _dir) = setup_store();
        let material = Material::new("Paint", MaterialCategory::Walls, MaterialUnit::Liter, 450.0);
        let stamp = material.stamp();
        store.save_material(3, material).unwrap();
        assert!(matches!(
            store.delete_material(3, 1, stamp),
            Err(StorageError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_import_gives_distinct_stamps() {
        let (store, _dir) = setup_store();
        store
            .import_materials(4, crate::material_model::default_catalog())
            .unwrap();
        let stamps: Vec<i64> = store
            .get_user_materials(4)
            .unwrap()
            .iter()
            .map(Stamped::stamp)
            .collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
