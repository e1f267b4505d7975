//! Knowledge base browsing, search and admin additions

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, error, info, warn};

use crate::errors::KnowledgeError;
use crate::localization::{t_args_lang, t_lang};

use super::commands::parse_kb_add_args;
use super::ui_builder::{kb_categories_keyboard, kb_item_keyboard, kb_items_keyboard, kb_search_results_keyboard};
use super::BotContext;

/// Search results offered as buttons
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Send the category list with a search button
pub async fn show_categories(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    let categories = ctx.knowledge.get_categories();
    debug!(user_id = %chat_id, count = categories.len(), "Showing knowledge categories");

    if categories.is_empty() {
        bot.send_message(chat_id, t_lang("kb-no-categories", language_code))
            .await?;
        return Ok(());
    }

    bot.send_message(chat_id, t_lang("kb-choose-category", language_code))
        .reply_markup(kb_categories_keyboard(&categories, language_code))
        .await?;
    Ok(())
}

/// Send the items of one category
pub async fn show_category(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &BotContext,
    category: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let items = match ctx.knowledge.load_category(category) {
        Ok(items) => items,
        Err(KnowledgeError::CategoryNotFound(_)) | Err(KnowledgeError::InvalidName(_)) => {
            bot.send_message(
                chat_id,
                t_args_lang("kb-category-not-found", &[("category", category)], language_code),
            )
            .await?;
            return Ok(());
        }
        Err(e) => {
            error!(user_id = %chat_id, category, error = %e, "Failed to load knowledge category");
            bot.send_message(chat_id, t_lang("error-generic", language_code))
                .await?;
            return Ok(());
        }
    };

    if items.is_empty() {
        bot.send_message(
            chat_id,
            t_args_lang("kb-category-empty", &[("category", category)], language_code),
        )
        .await?;
        return Ok(());
    }

    bot.send_message(
        chat_id,
        t_args_lang(
            "kb-category-items",
            &[("category", category), ("count", &items.len().to_string())],
            language_code,
        ),
    )
    .reply_markup(kb_items_keyboard(category, &items, language_code))
    .await?;
    Ok(())
}

/// Send one item rendered as HTML
pub async fn show_item(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &BotContext,
    category: &str,
    item_id: &str,
    language_code: Option<&str>,
) -> Result<()> {
    match ctx.knowledge.get_item(category, item_id) {
        Ok(Some(document)) => {
            let text = ctx
                .knowledge
                .format_result(&document, Some(category), language_code);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(kb_item_keyboard(category, language_code))
                .await?;
        }
        Ok(None) => {
            bot.send_message(chat_id, t_lang("kb-item-not-found", language_code))
                .await?;
        }
        Err(e) => {
            warn!(user_id = %chat_id, category, item_id, error = %e, "Failed to load knowledge item");
            bot.send_message(chat_id, t_lang("kb-item-not-found", language_code))
                .await?;
        }
    }
    Ok(())
}

/// Run a substring search and send the hits as buttons
pub async fn run_search(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &BotContext,
    query: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bot.send_message(chat_id, t_lang("kb-search-usage", language_code))
            .await?;
        return Ok(());
    }

    let hits = ctx.knowledge.search_knowledge(query, None);
    info!(user_id = %chat_id, query, hits = hits.len(), "Knowledge search completed");

    if hits.is_empty() {
        bot.send_message(
            chat_id,
            t_args_lang("kb-no-results", &[("query", query)], language_code),
        )
        .await?;
        return Ok(());
    }

    let shown = &hits[..hits.len().min(MAX_SEARCH_RESULTS)];
    bot.send_message(
        chat_id,
        t_args_lang(
            "kb-search-results",
            &[("query", query), ("count", &hits.len().to_string())],
            language_code,
        ),
    )
    .reply_markup(kb_search_results_keyboard(shown, query, language_code))
    .await?;
    Ok(())
}

/// Send the knowledge base help
pub async fn send_help(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(chat_id, ctx.knowledge.help_text(language_code))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle `/kb_add <category> <item_id> <json>` for admins
pub async fn handle_kb_add(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    args: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let user_id = msg.from.as_ref().map(|user| user.id.0);
    if !user_id.is_some_and(|id| ctx.config.is_admin(id)) {
        warn!(user_id = ?user_id, "Rejected /kb_add from non-admin");
        bot.send_message(msg.chat.id, t_lang("kb-add-forbidden", language_code))
            .await?;
        return Ok(());
    }

    let parsed = match parse_kb_add_args(args) {
        Ok(parsed) => parsed,
        Err(key) => {
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .await?;
            return Ok(());
        }
    };

    match ctx
        .knowledge
        .add_item(&parsed.category, &parsed.item_id, &parsed.document)
    {
        Ok(()) => {
            info!(user_id = ?user_id, category = %parsed.category, item_id = %parsed.item_id, "Knowledge item added");
            bot.send_message(
                msg.chat.id,
                t_args_lang(
                    "kb-add-success",
                    &[("category", &parsed.category), ("item_id", &parsed.item_id)],
                    language_code,
                ),
            )
            .await?;
        }
        Err(KnowledgeError::InvalidName(name)) => {
            bot.send_message(
                msg.chat.id,
                t_args_lang("kb-add-invalid-name", &[("name", &name)], language_code),
            )
            .await?;
        }
        Err(KnowledgeError::EmptyDocument(_)) => {
            bot.send_message(msg.chat.id, t_lang("kb-add-empty", language_code))
                .await?;
        }
        Err(e) => {
            error!(user_id = ?user_id, error = %e, "Failed to save knowledge item");
            bot.send_message(msg.chat.id, t_lang("error-generic", language_code))
                .await?;
        }
    }
    Ok(())
}
