//! # Storage Tests
//!
//! Integration tests for the per-user JSON store: round trips through the
//! file system, deletion by index, catalog import and legacy file formats.

use serde_json::json;
use std::fs;
use stroyhelper::errors::StorageError;
use stroyhelper::estimate::{calculate, EstimateLine};
use stroyhelper::material_model::{default_catalog, Material, MaterialCategory, MaterialUnit};
use stroyhelper::room_model::{Room, Surface};
use stroyhelper::storage::{RecordKind, Stamped, UserStore};
use tempfile::TempDir;

fn setup_store() -> (TempDir, UserStore) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = UserStore::new(dir.path());
    (dir, store)
}

#[test]
fn test_rooms_round_trip_in_insertion_order() {
    let (_dir, store) = setup_store();

    store.save_room(42, Room::new("Кухня", 4.0, 3.0, 2.5)).unwrap();
    store.save_room(42, Room::new("Спальня", 5.0, 4.0, 2.7)).unwrap();

    let rooms = store.get_user_rooms(42).unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].name, "Кухня");
    assert_eq!(rooms[0].floor_area, 12.0);
    assert_eq!(rooms[0].area, 47.0);
    assert_eq!(rooms[1].name, "Спальня");

    let found = store.find_room(42, "Спальня").unwrap().unwrap();
    assert_eq!(found.height, 2.7);
    assert!(store.find_room(42, "Гараж").unwrap().is_none());
}

#[test]
fn test_users_are_isolated() {
    let (_dir, store) = setup_store();

    store.save_room(1, Room::new("Кухня", 4.0, 3.0, 2.5)).unwrap();

    assert_eq!(store.get_user_rooms(1).unwrap().len(), 1);
    assert!(store.get_user_rooms(2).unwrap().is_empty());
}

#[test]
fn test_delete_room_by_index() {
    let (_dir, store) = setup_store();

    store.save_room(7, Room::new("A", 1.0, 1.0, 2.5)).unwrap();
    store.save_room(7, Room::new("B", 2.0, 2.0, 2.5)).unwrap();
    store.save_room(7, Room::new("C", 3.0, 3.0, 2.5)).unwrap();

    let stamp = store.get_user_rooms(7).unwrap()[1].stamp();
    let removed = store.delete_room(7, 1, stamp).unwrap();
    assert_eq!(removed.name, "B");

    let names: Vec<String> = store
        .get_user_rooms(7)
        .unwrap()
        .into_iter()
        .map(|room| room.name)
        .collect();
    assert_eq!(names, vec!["A", "C"]);

    match store.delete_room(7, 5, stamp) {
        Err(StorageError::IndexOutOfRange { index, len }) => {
            assert_eq!(index, 5);
            assert_eq!(len, 2);
        }
        other => panic!("Expected IndexOutOfRange, got {:?}", other),
    }
}

#[test]
fn test_materials_crud() {
    let (_dir, store) = setup_store();

    let paint = Material::new("Краска", MaterialCategory::Walls, MaterialUnit::Liter, 450.0);
    store.save_material(3, paint.clone()).unwrap();

    let materials = store.get_user_materials(3).unwrap();
    assert_eq!(materials, vec![paint.clone()]);
    assert!(store.find_material(3, "Краска").unwrap().is_some());

    let removed = store.delete_material(3, 0, paint.stamp()).unwrap();
    assert_eq!(removed.name, "Краска");
    assert!(store.get_user_materials(3).unwrap().is_empty());
}

#[test]
fn test_import_catalog_skips_duplicates() {
    let (_dir, store) = setup_store();

    let catalog_len = default_catalog().len();
    let added = store.import_materials(5, default_catalog()).unwrap();
    assert_eq!(added, catalog_len);

    // Importing again adds nothing
    let added = store.import_materials(5, default_catalog()).unwrap();
    assert_eq!(added, 0);
    assert_eq!(store.get_user_materials(5).unwrap().len(), catalog_len);
}

#[test]
fn test_estimate_lines_and_clear() {
    let (_dir, store) = setup_store();

    let room = Room::new("Кухня", 4.0, 3.0, 2.5);
    let laminate = Material::new("Ламинат", MaterialCategory::Floor, MaterialUnit::SquareMeter, 800.0);
    let calculation = calculate(&room, &laminate, Surface::Floor);
    store
        .add_estimate_line(9, EstimateLine::new(&room, &laminate, &calculation))
        .unwrap();

    let lines = store.get_estimate_lines(9).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].cost, 9600.0);

    assert!(store.clear_estimate(9).unwrap());
    assert!(store.get_estimate_lines(9).unwrap().is_empty());
    assert!(!store.clear_estimate(9).unwrap());
}

/// Files written by earlier versions lack `height` and `floor_area` and use
/// naive timestamps
#[test]
fn test_loads_legacy_room_file() {
    let (_dir, store) = setup_store();
    let path = store.file_path(11, RecordKind::Rooms);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"[{"name": "Зал", "length": 5.0, "width": 4.0, "area": 20.0,
             "created_at": "2024-03-01T12:30:00.123456"}]"#,
    )
    .unwrap();

    let rooms = store.get_user_rooms(11).unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].height, 2.5);
    assert_eq!(rooms[0].floor_area, 20.0);
    assert_eq!(rooms[0].area, 20.0);
}

#[test]
fn test_written_file_is_valid_json_array() {
    let (_dir, store) = setup_store();
    store.save_room(13, Room::new("Кухня", 4.0, 3.0, 2.5)).unwrap();

    let content = fs::read_to_string(store.file_path(13, RecordKind::Rooms)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(value.is_array());
    assert_eq!(value[0]["name"], "Кухня");
    assert!(value[0]["created_at"].is_string());
}

/// A delete button built before another deletion must not remove the
/// record that has since moved into its position
#[test]
fn test_stale_delete_is_refused() {
    let (_dir, store) = setup_store();

    for name in ["A", "B", "C"] {
        store.save_room(2, Room::new(name, 3.0, 3.0, 2.5)).unwrap();
    }
    let rooms = store.get_user_rooms(2).unwrap();
    let (stamp_a, stamp_b) = (rooms[0].stamp(), rooms[1].stamp());

    store.delete_room(2, 0, stamp_a).unwrap();
    assert!(matches!(
        store.delete_room(2, 1, stamp_b),
        Err(StorageError::RecordChanged { index: 1 })
    ));

    let names: Vec<String> = store
        .get_user_rooms(2)
        .unwrap()
        .into_iter()
        .map(|room| room.name)
        .collect();
    assert_eq!(names, vec!["B", "C"]);
}

fn corrupt_backups(dir: &TempDir, prefix: &str) -> Vec<String> {
    fs::read_dir(dir.path().join("users"))
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(&format!("{prefix}.corrupt-")))
        .collect()
}

#[test]
fn test_save_keeps_valid_records_of_damaged_file() {
    let (dir, store) = setup_store();
    let path = store.file_path(1, RecordKind::Rooms);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let content = json!([
        serde_json::to_value(Room::new("Кухня", 4.0, 3.0, 2.5)).unwrap(),
        serde_json::to_value(Room::new("Зал", 5.0, 4.0, 2.7)).unwrap(),
        {"name": "Битая", "length": "много"}
    ]);
    fs::write(&path, content.to_string()).unwrap();

    // Unreadable records are skipped for display
    assert_eq!(store.get_user_rooms(1).unwrap().len(), 2);

    store.save_room(1, Room::new("Новая", 2.0, 2.0, 2.5)).unwrap();

    let names: Vec<String> = store
        .get_user_rooms(1)
        .unwrap()
        .into_iter()
        .map(|room| room.name)
        .collect();
    assert_eq!(names, vec!["Кухня", "Зал", "Новая"]);

    // The original file, bad record included, is kept aside
    let backups = corrupt_backups(&dir, "1_rooms.json");
    assert_eq!(backups.len(), 1);
    let saved = fs::read_to_string(dir.path().join("users").join(&backups[0])).unwrap();
    assert!(saved.contains("Битая"));
}

#[test]
fn test_unparseable_file_moved_aside_before_write() {
    let (dir, store) = setup_store();
    let path = store.file_path(6, RecordKind::Materials);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{not json").unwrap();

    let added = store.import_materials(6, default_catalog()).unwrap();
    assert_eq!(added, default_catalog().len());

    let backups = corrupt_backups(&dir, "6_materials.json");
    assert_eq!(backups.len(), 1);
    let saved = fs::read_to_string(dir.path().join("users").join(&backups[0])).unwrap();
    assert_eq!(saved, "{not json");
}

#[test]
fn test_healthy_file_leaves_no_backup() {
    let (dir, store) = setup_store();
    store.save_room(8, Room::new("Кухня", 4.0, 3.0, 2.5)).unwrap();
    store.save_room(8, Room::new("Зал", 5.0, 4.0, 2.5)).unwrap();
    assert!(corrupt_backups(&dir, "8_rooms.json").is_empty());
}
