//! # Knowledge Base Tests
//!
//! Integration tests for loading, searching and saving knowledge documents
//! in a temporary directory tree.

use serde_json::json;
use std::fs;
use std::path::Path;
use stroyhelper::errors::KnowledgeError;
use stroyhelper::knowledge::KnowledgeBase;
use tempfile::TempDir;

fn write_item(base: &Path, category: &str, item_id: &str, content: &str) {
    let dir = base.join(category);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{item_id}.json")), content).unwrap();
}

/// Knowledge tree with two categories, an ignored directory and some bad files
fn setup_knowledge_base() -> (TempDir, KnowledgeBase) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let base = dir.path();

    write_item(
        base,
        "materials",
        "laminate",
        r#"{"title": "Ламинат", "description": "Напольное покрытие", "class": "33"}"#,
    );
    write_item(
        base,
        "materials",
        "paint",
        r#"{"title": "Краска", "description": "Для стен и потолков"}"#,
    );
    write_item(base, "materials", "empty", "   \n");
    write_item(base, "materials", "broken", "{not json");
    write_item(
        base,
        "techniques",
        "leveling",
        r#"{"title": "Выравнивание стен", "tools": ["правило", "уровень"]}"#,
    );
    fs::create_dir_all(base.join("__pycache__")).unwrap();
    fs::write(base.join("materials").join("notes.txt"), "ignored").unwrap();

    let kb = KnowledgeBase::new(base);
    (dir, kb)
}

#[test]
fn test_categories_sorted_and_filtered() {
    let (_dir, kb) = setup_knowledge_base();
    assert_eq!(kb.get_categories(), vec!["materials", "techniques"]);
}

#[test]
fn test_categories_of_missing_base_are_empty() {
    let kb = KnowledgeBase::new("/nonexistent/knowledge/base");
    assert!(kb.get_categories().is_empty());
}

#[test]
fn test_load_category_skips_bad_files() {
    let (_dir, kb) = setup_knowledge_base();

    let items = kb.load_category("materials").unwrap();
    let ids: Vec<&String> = items.keys().collect();
    assert_eq!(ids, vec!["laminate", "paint"]);
    assert_eq!(items["laminate"]["title"], "Ламинат");
}

#[test]
fn test_load_missing_category_is_an_error() {
    let (_dir, kb) = setup_knowledge_base();
    assert!(matches!(
        kb.load_category("plumbing"),
        Err(KnowledgeError::CategoryNotFound(_))
    ));
}

#[test]
fn test_get_item() {
    let (_dir, kb) = setup_knowledge_base();

    let item = kb.get_item("materials", "paint").unwrap().unwrap();
    assert_eq!(item["title"], "Краска");

    assert!(kb.get_item("materials", "missing").unwrap().is_none());
    assert!(kb.get_item("materials", "empty").unwrap().is_none());
    assert!(matches!(
        kb.get_item("materials", "broken"),
        Err(KnowledgeError::MalformedJson { .. })
    ));
}

#[test]
fn test_path_traversal_rejected() {
    let (_dir, kb) = setup_knowledge_base();

    assert!(matches!(
        kb.get_item("..", "passwd"),
        Err(KnowledgeError::InvalidName(_))
    ));
    assert!(matches!(
        kb.add_item("materials", "../escape", &json!({"title": "x"})),
        Err(KnowledgeError::InvalidName(_))
    ));
}

#[test]
fn test_simple_search_is_case_insensitive() {
    let (_dir, kb) = setup_knowledge_base();

    let hits = kb.search_knowledge("  ЛАМИНАТ ", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].category, "materials");
    assert_eq!(hits[0].item_id, "laminate");

    let tagged = hits[0].tagged_document();
    assert_eq!(tagged["_category"], "materials");
    assert_eq!(tagged["_id"], "laminate");
}

#[test]
fn test_simple_search_matches_nested_values() {
    let (_dir, kb) = setup_knowledge_base();

    let hits = kb.search_knowledge("уровень", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item_id, "leveling");
}

#[test]
fn test_search_category_filter() {
    let (_dir, kb) = setup_knowledge_base();

    let techniques = vec!["techniques".to_string()];
    assert!(kb.search_knowledge("стен", Some(&techniques)).len() == 1);

    // Unknown categories are skipped rather than failing the search
    let unknown = vec!["plumbing".to_string()];
    assert!(kb.search_knowledge("стен", Some(&unknown)).is_empty());
}

#[test]
fn test_empty_query_returns_nothing() {
    let (_dir, kb) = setup_knowledge_base();
    assert!(kb.search_knowledge("   ", None).is_empty());
}

#[test]
fn test_search_by_field_exact_match() {
    let (_dir, kb) = setup_knowledge_base();

    let hits = kb.search_by_field("class", "33", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item_id, "laminate");

    assert!(kb.search_by_field("class", "3", None).is_empty());
    assert_eq!(kb.search_by_field("title", "краска", None).len(), 1);
}

#[test]
fn test_regex_search() {
    let (_dir, kb) = setup_knowledge_base();

    let hits = kb.regex_search("крас(ка|ить)", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item_id, "paint");

    // An invalid pattern yields no results
    assert!(kb.regex_search("(unclosed", None).is_empty());
}

#[test]
fn test_add_item_creates_category() {
    let (dir, kb) = setup_knowledge_base();

    kb.add_item("tools", "level", &json!({"title": "Уровень"}))
        .unwrap();

    assert!(dir.path().join("tools").join("level.json").is_file());
    assert!(kb.get_categories().contains(&"tools".to_string()));
    let item = kb.get_item("tools", "level").unwrap().unwrap();
    assert_eq!(item["title"], "Уровень");
}

#[test]
fn test_add_empty_item_refused() {
    let (_dir, kb) = setup_knowledge_base();
    assert!(matches!(
        kb.add_item("tools", "nothing", &json!({})),
        Err(KnowledgeError::EmptyDocument(_))
    ));
}

#[test]
fn test_bundled_knowledge_base_loads() {
    let kb = KnowledgeBase::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("knowledge_base/data"));

    let categories = kb.get_categories();
    assert!(categories.contains(&"materials".to_string()));
    for category in &categories {
        assert!(!kb.load_category(category).unwrap().is_empty());
    }
    assert!(!kb.search_knowledge("ламинат", None).is_empty());
}

#[test]
fn test_search_across_key_and_value() {
    let (_dir, kb) = setup_knowledge_base();

    let hits = kb.search_knowledge(r#""class": "33""#, None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item_id, "laminate");

    assert_eq!(kb.regex_search(r#""class": "3\d""#, None).len(), 1);
    // Compact separators are not how documents are matched
    assert!(kb.search_knowledge(r#""class":"33""#, None).is_empty());
}
