//! # Knowledge Base
//!
//! Static reference documents about materials, techniques and calculations,
//! stored as `{base}/{category}/{item_id}.json`. Documents are free-form
//! JSON; `title` and `description` get special treatment when rendered.
//!
//! - `loader`: category listing and per-item load/save
//! - `search`: substring, field and regex search by linear scan

pub mod loader;
pub mod search;

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use teloxide::utils::html;
use tracing::info;

use crate::errors::KnowledgeError;
use crate::localization::{t_args_lang, t_lang};

pub use loader::KnowledgeLoader;
pub use search::{KnowledgeSearch, SearchHit};

/// Facade over the loader and search
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    loader: KnowledgeLoader,
    search: KnowledgeSearch,
}

impl KnowledgeBase {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let loader = KnowledgeLoader::new(base_path);
        let search = KnowledgeSearch::new(loader.clone());
        info!("Initialized knowledge base");
        Self { loader, search }
    }

    pub fn get_categories(&self) -> Vec<String> {
        self.loader.get_categories()
    }

    pub fn load_category(&self, category: &str) -> Result<BTreeMap<String, Value>, KnowledgeError> {
        self.loader.load_category(category)
    }

    pub fn get_item(&self, category: &str, item_id: &str) -> Result<Option<Value>, KnowledgeError> {
        self.loader.load_item(category, item_id)
    }

    pub fn add_item(&self, category: &str, item_id: &str, data: &Value) -> Result<(), KnowledgeError> {
        self.loader.save_item(category, item_id, data)
    }

    pub fn search_knowledge(&self, query: &str, categories: Option<&[String]>) -> Vec<SearchHit> {
        info!(query, "Knowledge search");
        self.search.simple_search(query, categories)
    }

    pub fn search_by_field(&self, field: &str, value: &str, categories: Option<&[String]>) -> Vec<SearchHit> {
        self.search.search_by_field(field, value, categories)
    }

    pub fn regex_search(&self, pattern: &str, categories: Option<&[String]>) -> Vec<SearchHit> {
        self.search.regex_search(pattern, categories)
    }

    /// Render a document as Telegram HTML.
    ///
    /// Title first, then description, then every other field not starting
    /// with `_`; lists and maps become bullet lists. A category footer is
    /// appended when known.
    pub fn format_result(&self, document: &Value, category: Option<&str>, language_code: Option<&str>) -> String {
        let mut output = Vec::new();

        if let Some(title) = document.get("title") {
            output.push(html::bold(&html::escape(&display_value(title))));
        }

        if let Some(description) = document.get("description") {
            output.push(html::escape(&display_value(description)));
        }

        if let Value::Object(map) = document {
            for (key, value) in map {
                if key == "title" || key == "description" || key.starts_with('_') {
                    continue;
                }
                let label = html::bold(&format!("{}:", html::escape(key)));
                match value {
                    Value::Array(items) => {
                        let list = items
                            .iter()
                            .map(|item| format!("  • {}", html::escape(&display_value(item))))
                            .collect::<Vec<_>>()
                            .join("\n");
                        output.push(format!("{label}\n{list}"));
                    }
                    Value::Object(entries) => {
                        let list = entries
                            .iter()
                            .map(|(k, v)| format!("  • {}: {}", html::escape(k), html::escape(&display_value(v))))
                            .collect::<Vec<_>>()
                            .join("\n");
                        output.push(format!("{label}\n{list}"));
                    }
                    other => output.push(format!("{label} {}", html::escape(&display_value(other)))),
                }
            }
        }

        let category = category.or_else(|| document.get("_category").and_then(Value::as_str));
        if let Some(category) = category {
            output.push(format!(
                "\n{}",
                html::italic(&html::escape(&t_args_lang(
                    "kb-category-footer",
                    &[("category", category)],
                    language_code
                )))
            ));
        }

        output.join("\n\n")
    }

    /// Help text listing the categories and knowledge commands
    pub fn help_text(&self, language_code: Option<&str>) -> String {
        let mut lines = vec![
            html::bold(&html::escape(&t_lang("kb-help-title", language_code))),
            String::new(),
            html::escape(&t_lang("kb-help-description", language_code)),
            String::new(),
            html::bold(&html::escape(&t_lang("kb-help-categories", language_code))),
        ];

        for category in self.get_categories() {
            lines.push(format!("  • {}", html::escape(&category)));
        }

        lines.extend([
            String::new(),
            html::bold(&html::escape(&t_lang("kb-help-usage", language_code))),
            html::escape(&t_lang("kb-help-search", language_code)),
            html::escape(&t_lang("kb-help-category", language_code)),
            html::escape(&t_lang("kb-help-help", language_code)),
        ]);

        lines.join("\n")
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_result_layout() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path());
        let document = json!({
            "title": "Ламинат",
            "description": "Напольное покрытие",
            "classes": [31, 32],
            "sizes": {"length": "1380 мм"},
            "_internal": "hidden"
        });

        let text = kb.format_result(&document, Some("materials"), Some("ru"));
        assert!(text.starts_with("<b>Ламинат</b>\n\nНапольное покрытие"));
        assert!(text.contains("<b>classes:</b>\n  • 31\n  • 32"));
        assert!(text.contains("  • length: 1380 мм"));
        assert!(text.contains("materials"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn test_format_result_escapes_html() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path());
        let text = kb.format_result(&json!({"title": "<script>"}), None, None);
        assert_eq!(text, "<b>&lt;script&gt;</b>");
    }
}
