//! # Localization Tests
//!
//! This module contains tests for message retrieval, argument formatting,
//! language fallback and menu label recognition.

use std::collections::HashMap;
use stroyhelper::localization::{
    detect_language, matches_label, t_args_lang, t_lang, LocalizationManager, DEFAULT_LANGUAGE,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        // Create a new localization manager for each test
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("help-commands", "en", None);
        assert!(message.contains("Commands"));

        let message = manager.get_message_in_language("help-commands", "ru", None);
        assert!(message.contains("Команды"));
    }

    #[test]
    fn test_default_language_is_russian() {
        let manager = setup_localization();
        assert_eq!(DEFAULT_LANGUAGE, "ru");
        assert_eq!(manager.get_message("menu-main", None), "🏠 Главное меню");
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert!(message.starts_with("Missing translation:"));
    }

    #[test]
    fn test_get_message_unsupported_language() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("help-commands", "de", None);
        // Should fall back to Russian
        assert!(message.contains("Команды"));
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("name", "Кухня");

        let message = manager.get_message_in_language("room-enter-length", "ru", Some(&args));
        assert!(message.contains("Кухня"));
        // Isolation marks are disabled for plain-text messages
        assert!(!message.contains('\u{2068}'));
    }

    #[test]
    fn test_multiline_message_keeps_lines() {
        let text = t_args_lang(
            "material-info",
            &[
                ("name", "Краска"),
                ("category", "Стены"),
                ("unit", "л"),
                ("price", "450.00"),
                ("created", "01.03.2024 12:30"),
            ],
            Some("ru"),
        );
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("💰 Цена: 450.00 руб./л"));
    }

    #[test]
    fn test_t_lang_uses_telegram_language_code() {
        assert_eq!(t_lang("menu-help", Some("en-GB")), "❓ Help");
        assert_eq!(t_lang("menu-help", Some("ru")), "❓ Помощь");
        assert_eq!(t_lang("menu-help", None), "❓ Помощь");
    }

    #[test]
    fn test_matches_label_in_any_language() {
        assert!(matches_label("📦 Материалы", "menu-materials"));
        assert!(matches_label("📦 Materials", "menu-materials"));
        assert!(matches_label("  📦 Materials ", "menu-materials"));
        assert!(!matches_label("Материалы", "menu-materials"));
        assert!(!matches_label("📦 Материалы", "menu-help"));
    }

    #[test]
    fn test_detect_language_variants() {
        assert_eq!(detect_language(Some("en-US")), "en");
        assert_eq!(detect_language(Some("uk")), "ru");
        assert_eq!(detect_language(None), "ru");
    }

    #[test]
    fn test_all_translations() {
        let manager = setup_localization();
        let labels = manager.all_translations("unit-m2");
        assert_eq!(labels, vec!["м²".to_string(), "m²".to_string()]);
    }
}
