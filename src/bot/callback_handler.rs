//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardMarkup, MessageId};
use tracing::{debug, error, info, warn};

use crate::dialogue::BotDialogue;
use crate::errors::StorageError;
use crate::localization::{t_args_lang, t_lang};

use super::dialogue_manager::begin_search;
use super::knowledge_handler::{run_search, show_categories, show_category, show_item};
use super::ui_builder::{
    format_material_deletion, format_materials_list, format_rooms_list, material_delete_keyboard,
    materials_page_keyboard, room_delete_keyboard, LIST_PAGE_SIZE,
};
use super::BotContext;

/// Decoded callback data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    KbCategory(String),
    KbItem { category: String, item_id: String },
    KbBackToCategories,
    /// Ask the user for a query
    KbSearchPrompt,
    /// Repeat a search for the given query
    KbSearch(String),
    /// Delete the record at `index` if it still has `stamp`
    RoomDelete { index: usize, stamp: i64 },
    MaterialDelete { index: usize, stamp: i64 },
    RoomsPage(usize),
    MaterialsPage(usize),
    MaterialDeletePage(usize),
    EstimateClear,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "kb_back_to_categories" => return Some(CallbackAction::KbBackToCategories),
            "kb_search" => return Some(CallbackAction::KbSearchPrompt),
            "estimate_clear" => return Some(CallbackAction::EstimateClear),
            _ => {}
        }

        if let Some(category) = data.strip_prefix("kb_category:") {
            return Some(CallbackAction::KbCategory(category.to_string()));
        }
        if let Some(rest) = data.strip_prefix("kb_item:") {
            let (category, item_id) = rest.split_once(':')?;
            return Some(CallbackAction::KbItem {
                category: category.to_string(),
                item_id: item_id.to_string(),
            });
        }
        if let Some(query) = data.strip_prefix("kb_search:") {
            return Some(CallbackAction::KbSearch(query.to_string()));
        }
        if let Some(rest) = data.strip_prefix("room_delete:") {
            let (index, stamp) = parse_record_ref(rest)?;
            return Some(CallbackAction::RoomDelete { index, stamp });
        }
        if let Some(rest) = data.strip_prefix("material_delete:") {
            let (index, stamp) = parse_record_ref(rest)?;
            return Some(CallbackAction::MaterialDelete { index, stamp });
        }
        if let Some(page) = data.strip_prefix("rooms_page:") {
            return page.parse().ok().map(CallbackAction::RoomsPage);
        }
        if let Some(page) = data.strip_prefix("materials_page:") {
            return page.parse().ok().map(CallbackAction::MaterialsPage);
        }
        if let Some(page) = data.strip_prefix("material_delete_page:") {
            return page.parse().ok().map(CallbackAction::MaterialDeletePage);
        }
        None
    }
}

/// "<index>:<stamp>"
fn parse_record_ref(data: &str) -> Option<(usize, i64)> {
    let (index, stamp) = data.split_once(':')?;
    Some((index.parse().ok()?, stamp.parse().ok()?))
}

/// Replace the text of the message carrying the keyboard, or send a new one
async fn refresh_message(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    let Some(message_id) = message_id else {
        bot.send_message(chat_id, text).await?;
        return Ok(());
    };

    let request = bot.edit_message_text(chat_id, message_id, text);
    let result = match keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await,
        None => request.await,
    };
    if let Err(e) = result {
        error!(user_id = %chat_id, error = %e, "Failed to edit message");
    }
    Ok(())
}

async fn show_rooms_page(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &BotContext,
    page: usize,
    language_code: Option<&str>,
) -> Result<()> {
    let rooms = ctx.store.get_user_rooms(chat_id.0)?;
    if rooms.is_empty() {
        return refresh_message(bot, chat_id, message_id, t_lang("rooms-empty", language_code), None).await;
    }
    refresh_message(
        bot,
        chat_id,
        message_id,
        format_rooms_list(&rooms, page, language_code),
        Some(room_delete_keyboard(&rooms, page)),
    )
    .await
}

async fn show_materials_page(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &BotContext,
    page: usize,
    language_code: Option<&str>,
) -> Result<()> {
    let materials = ctx.store.get_user_materials(chat_id.0)?;
    if materials.is_empty() {
        return refresh_message(bot, chat_id, message_id, t_lang("materials-empty", language_code), None).await;
    }
    refresh_message(
        bot,
        chat_id,
        message_id,
        format_materials_list(&materials, page, language_code),
        materials_page_keyboard(&materials, page),
    )
    .await
}

async fn show_material_deletion_page(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &BotContext,
    page: usize,
    language_code: Option<&str>,
) -> Result<()> {
    let materials = ctx.store.get_user_materials(chat_id.0)?;
    if materials.is_empty() {
        return refresh_message(bot, chat_id, message_id, t_lang("materials-empty", language_code), None).await;
    }
    refresh_message(
        bot,
        chat_id,
        message_id,
        format_material_deletion(&materials, page, language_code),
        Some(material_delete_keyboard(&materials, page)),
    )
    .await
}

async fn delete_room(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &BotContext,
    index: usize,
    stamp: i64,
    language_code: Option<&str>,
) -> Result<String> {
    let notice = match ctx.store.delete_room(chat_id.0, index, stamp) {
        Ok(room) => {
            info!(user_id = %chat_id, room = %room.name, "Room deleted");
            t_args_lang("room-deleted", &[("name", &room.name)], language_code)
        }
        Err(StorageError::IndexOutOfRange { .. } | StorageError::RecordChanged { .. }) => {
            debug!(user_id = %chat_id, index, "Stale room delete button");
            t_lang("already-deleted", language_code)
        }
        Err(e) => return Err(e.into()),
    };

    show_rooms_page(bot, chat_id, message_id, ctx, index / LIST_PAGE_SIZE, language_code).await?;
    Ok(notice)
}

async fn delete_material(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &BotContext,
    index: usize,
    stamp: i64,
    language_code: Option<&str>,
) -> Result<String> {
    let notice = match ctx.store.delete_material(chat_id.0, index, stamp) {
        Ok(material) => {
            info!(user_id = %chat_id, material = %material.name, "Material deleted");
            t_args_lang("material-deleted", &[("name", &material.name)], language_code)
        }
        Err(StorageError::IndexOutOfRange { .. } | StorageError::RecordChanged { .. }) => {
            debug!(user_id = %chat_id, index, "Stale material delete button");
            t_lang("already-deleted", language_code)
        }
        Err(e) => return Err(e.into()),
    };

    show_material_deletion_page(bot, chat_id, message_id, ctx, index / LIST_PAGE_SIZE, language_code).await?;
    Ok(notice)
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    ctx: Arc<BotContext>,
    dialogue: BotDialogue,
) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    let language_code = q.from.language_code.as_deref();
    let chat_id = q
        .message
        .as_ref()
        .map(|msg| msg.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id));
    let message_id = q.message.as_ref().map(|msg| msg.id());

    let action = q.data.as_deref().and_then(CallbackAction::parse);
    let notice = match action {
        Some(CallbackAction::KbCategory(category)) => {
            show_category(&bot, chat_id, &ctx, &category, language_code).await?;
            None
        }
        Some(CallbackAction::KbItem { category, item_id }) => {
            show_item(&bot, chat_id, &ctx, &category, &item_id, language_code).await?;
            None
        }
        Some(CallbackAction::KbBackToCategories) => {
            show_categories(&bot, chat_id, &ctx, language_code).await?;
            None
        }
        Some(CallbackAction::KbSearchPrompt) => {
            begin_search(&bot, chat_id, dialogue, language_code).await?;
            None
        }
        Some(CallbackAction::KbSearch(query)) => {
            run_search(&bot, chat_id, &ctx, &query, language_code).await?;
            None
        }
        Some(CallbackAction::RoomDelete { index, stamp }) => {
            Some(delete_room(&bot, chat_id, message_id, &ctx, index, stamp, language_code).await?)
        }
        Some(CallbackAction::MaterialDelete { index, stamp }) => {
            Some(delete_material(&bot, chat_id, message_id, &ctx, index, stamp, language_code).await?)
        }
        Some(CallbackAction::RoomsPage(page)) => {
            show_rooms_page(&bot, chat_id, message_id, &ctx, page, language_code).await?;
            None
        }
        Some(CallbackAction::MaterialsPage(page)) => {
            show_materials_page(&bot, chat_id, message_id, &ctx, page, language_code).await?;
            None
        }
        Some(CallbackAction::MaterialDeletePage(page)) => {
            show_material_deletion_page(&bot, chat_id, message_id, &ctx, page, language_code).await?;
            None
        }
        Some(CallbackAction::EstimateClear) => {
            let cleared = ctx.store.clear_estimate(chat_id.0)?;
            info!(user_id = %chat_id, cleared, "Estimate cleared");
            refresh_message(&bot, chat_id, message_id, t_lang("estimate-cleared", language_code), None).await?;
            None
        }
        None => {
            warn!(user_id = %q.from.id, data = ?q.data, "Unknown callback data");
            Some(t_lang("callback-unknown", language_code))
        }
    };

    // Answer the callback query to remove the loading state
    let answer = bot.answer_callback_query(q.id.clone());
    match notice {
        Some(text) => answer.text(text).await?,
        None => answer.await?,
    };

    Ok(())
}
