//! Linear-scan search over knowledge base documents.

use regex::RegexBuilder;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use std::io;
use tracing::{error, info, warn};

use super::loader::KnowledgeLoader;
use crate::errors::KnowledgeError;

/// A document found by a search, with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub category: String,
    pub item_id: String,
    pub document: Value,
}

impl SearchHit {
    /// The document's `title` field, or the item id when absent
    pub fn title(&self) -> String {
        self.document
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.item_id.clone())
    }

    /// The document with `_category` and `_id` metadata fields added
    pub fn tagged_document(&self) -> Value {
        let mut document = self.document.clone();
        if let Value::Object(map) = &mut document {
            map.insert("_category".to_string(), Value::String(self.category.clone()));
            map.insert("_id".to_string(), Value::String(self.item_id.clone()));
        }
        document
    }
}

/// Lower-case the query and collapse runs of whitespace
pub fn preprocess_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stringify a JSON value the way it reads to a user
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Single-line JSON with a space after `:` and `,`, the layout documents
/// were authored and searched in. Object keys come out sorted.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Text a document is matched against by substring and regex search
pub fn document_text(document: &Value) -> Option<String> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, SpacedFormatter);
    document.serialize(&mut serializer).ok()?;
    String::from_utf8(buffer).ok()
}

#[derive(Debug, Clone)]
pub struct KnowledgeSearch {
    loader: KnowledgeLoader,
}

impl KnowledgeSearch {
    pub fn new(loader: KnowledgeLoader) -> Self {
        info!(base_path = %loader.base_path().display(), "Initialized knowledge search");
        Self { loader }
    }

    /// Documents whose serialized JSON contains the query, case-insensitively
    pub fn simple_search(&self, query: &str, categories: Option<&[String]>) -> Vec<SearchHit> {
        let query = preprocess_query(query);
        if query.is_empty() {
            return Vec::new();
        }

        self.scan(categories, |document| {
            document_text(document).is_some_and(|text| text.to_lowercase().contains(&query))
        })
    }

    /// Documents whose `field` equals `value`, compared case-insensitively
    pub fn search_by_field(&self, field: &str, value: &str, categories: Option<&[String]>) -> Vec<SearchHit> {
        let value = value.to_lowercase();
        self.scan(categories, |document| {
            document
                .get(field)
                .is_some_and(|field_value| value_text(field_value).to_lowercase() == value)
        })
    }

    /// Documents whose serialized JSON matches a case-insensitive regex.
    /// An invalid pattern yields no results.
    pub fn regex_search(&self, pattern: &str, categories: Option<&[String]>) -> Vec<SearchHit> {
        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => regex,
            Err(e) => {
                error!(pattern, error = %e, "Invalid knowledge search pattern");
                return Vec::new();
            }
        };

        self.scan(categories, |document| {
            document_text(document).is_some_and(|text| regex.is_match(&text))
        })
    }

    fn scan<F>(&self, categories: Option<&[String]>, matches: F) -> Vec<SearchHit>
    where
        F: Fn(&Value) -> bool,
    {
        let categories = match categories {
            Some(categories) if !categories.is_empty() => categories.to_vec(),
            _ => self.loader.get_categories(),
        };

        let mut results = Vec::new();
        for category in categories {
            let files = match self.loader.json_files(&category) {
                Ok(files) => files,
                Err(KnowledgeError::CategoryNotFound(_)) => {
                    warn!(category = %category, "Knowledge category not found");
                    continue;
                }
                Err(e) => {
                    error!(category = %category, error = %e, "Failed to scan knowledge category");
                    continue;
                }
            };

            for path in files {
                let Some(item_id) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                match KnowledgeLoader::read_document(&path) {
                    Ok(Some(document)) if matches(&document) => results.push(SearchHit {
                        category: category.clone(),
                        item_id: item_id.to_string(),
                        document,
                    }),
                    Ok(_) => {}
                    Err(e) => error!(path = %path.display(), error = %e, "Failed to search knowledge file"),
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preprocess_query() {
        assert_eq!(preprocess_query("  Ламинат   ПОД  плитку "), "ламинат под плитку");
        assert_eq!(preprocess_query("   "), "");
    }

    #[test]
    fn test_hit_title_and_tags() {
        let hit = SearchHit {
            category: "materials".to_string(),
            item_id: "laminate".to_string(),
            document: json!({"description": "Floor covering"}),
        };
        assert_eq!(hit.title(), "laminate");

        let tagged = hit.tagged_document();
        assert_eq!(tagged["_category"], "materials");
        assert_eq!(tagged["_id"], "laminate");
    }

    #[test]
    fn test_document_text_layout() {
        let document = json!({"title": "Краска", "tools": ["валик", "кисть"], "layers": 2});
        assert_eq!(
            document_text(&document).unwrap(),
            r#"{"layers": 2, "title": "Краска", "tools": ["валик", "кисть"]}"#
        );
        assert_eq!(document_text(&json!({})).unwrap(), "{}");
        assert_eq!(document_text(&json!([])).unwrap(), "[]");
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("Paint")), "Paint");
        assert_eq!(value_text(&json!(5)), "5");
        assert_eq!(value_text(&json!(true)), "true");
    }
}
