//! Message Handler module for routing text messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error, info};

use crate::dialogue::{BotDialogue, DialogueState};
use crate::estimate::EstimateSummary;
use crate::localization::{matches_label, t_args_lang, t_lang};
use crate::material_model::default_catalog;

use super::commands::Command;
use super::dialogue_manager::{
    begin_calculation, begin_material_wizard, begin_room_wizard, begin_search,
    handle_calculation_material_input, handle_calculation_room_input, handle_calculation_surface_input,
    handle_material_category_input, handle_material_name_input, handle_material_price_input,
    handle_material_unit_input, handle_room_height_input, handle_room_length_input, handle_room_name_input,
    handle_room_width_input, handle_search_query_input,
};
use super::knowledge_handler::{handle_kb_add, run_search, send_help, show_categories, show_category};
use super::ui_builder::{
    estimate_keyboard, format_estimate, format_material_deletion, format_materials_list, format_rooms_list,
    main_menu_keyboard, material_delete_keyboard, materials_menu_keyboard, materials_page_keyboard,
    room_delete_keyboard,
};
use super::BotContext;

/// Actions reachable from reply keyboard buttons outside a wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    CalculateArea,
    MyRooms,
    Materials,
    MyEstimate,
    MaterialCalculation,
    KnowledgeBase,
    Help,
    AddMaterial,
    ShowMaterials,
    DeleteMaterial,
    ImportMaterials,
    MainMenu,
}

impl MenuAction {
    const LABELS: [(&'static str, MenuAction); 12] = [
        ("menu-calculate-area", MenuAction::CalculateArea),
        ("menu-my-rooms", MenuAction::MyRooms),
        ("menu-materials", MenuAction::Materials),
        ("menu-my-estimate", MenuAction::MyEstimate),
        ("menu-material-calculation", MenuAction::MaterialCalculation),
        ("menu-knowledge", MenuAction::KnowledgeBase),
        ("menu-help", MenuAction::Help),
        ("menu-add-material", MenuAction::AddMaterial),
        ("menu-show-materials", MenuAction::ShowMaterials),
        ("menu-delete-material", MenuAction::DeleteMaterial),
        ("menu-import-materials", MenuAction::ImportMaterials),
        ("menu-main", MenuAction::MainMenu),
    ];

    /// Recognize a button label in any supported language
    pub fn from_text(text: &str) -> Option<Self> {
        Self::LABELS
            .iter()
            .find(|(key, _)| matches_label(text, key))
            .map(|(_, action)| *action)
    }
}

/// What a text message triggers, given the current dialogue state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Slash commands are honored at any step
    Command(Command),
    /// The main menu button, which also leaves any wizard
    MainMenu,
    /// Input for the active wizard step
    WizardStep,
    Menu(MenuAction),
    /// Unrecognized text outside a wizard
    Unknown,
}

/// Decide how to handle `text`: command, then main menu, then the active
/// wizard step, then menu buttons, then the fallback hint
pub fn route(text: &str, state: &DialogueState) -> Route {
    if let Some(command) = Command::parse(text) {
        return Route::Command(command);
    }

    let action = MenuAction::from_text(text);
    if action == Some(MenuAction::MainMenu) {
        return Route::MainMenu;
    }
    if state.is_active() {
        return Route::WizardStep;
    }

    match action {
        Some(action) => Route::Menu(action),
        None => Route::Unknown,
    }
}

fn message_language(msg: &Message) -> Option<&str> {
    msg.from
        .as_ref()
        .and_then(|user| user.language_code.as_ref())
        .map(|s| s.as_str())
}

async fn send_main_menu(bot: &Bot, chat_id: ChatId, key: &str, language_code: Option<&str>) -> Result<()> {
    bot.send_message(chat_id, t_lang(key, language_code))
        .reply_markup(main_menu_keyboard(language_code))
        .await?;
    Ok(())
}

async fn send_welcome(bot: &Bot, chat_id: ChatId, language_code: Option<&str>) -> Result<()> {
    let welcome_message = [
        t_lang("welcome-title", language_code),
        t_lang("welcome-description", language_code),
        t_lang("welcome-menu-hint", language_code),
    ]
    .join("\n\n");
    bot.send_message(chat_id, welcome_message)
        .reply_markup(main_menu_keyboard(language_code))
        .await?;
    Ok(())
}

async fn send_help_message(bot: &Bot, chat_id: ChatId, language_code: Option<&str>) -> Result<()> {
    let help_message = [
        t_lang("help-title", language_code),
        t_lang("help-rooms", language_code),
        t_lang("help-materials", language_code),
        t_lang("help-calculation", language_code),
        t_lang("help-estimate", language_code),
        t_lang("help-knowledge", language_code),
        t_lang("help-commands", language_code),
    ]
    .join("\n\n");
    bot.send_message(chat_id, help_message)
        .reply_markup(main_menu_keyboard(language_code))
        .await?;
    Ok(())
}

async fn handle_command(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    command: Command,
    language_code: Option<&str>,
) -> Result<()> {
    debug!(user_id = %msg.chat.id, command = ?command, "Handling command");
    let chat_id = msg.chat.id;

    if command.resets_dialogue() {
        dialogue.exit().await?;
    }

    match command {
        Command::Start => send_welcome(bot, chat_id, language_code).await,
        Command::Help => send_help_message(bot, chat_id, language_code).await,
        Command::Cancel => send_main_menu(bot, chat_id, "cancelled", language_code).await,
        Command::KnowledgeBase => show_categories(bot, chat_id, ctx, language_code).await,
        Command::Search(query) if query.is_empty() => begin_search(bot, chat_id, dialogue, language_code).await,
        Command::Search(query) => run_search(bot, chat_id, ctx, &query, language_code).await,
        Command::Category(name) if name.is_empty() => show_categories(bot, chat_id, ctx, language_code).await,
        Command::Category(name) => show_category(bot, chat_id, ctx, &name, language_code).await,
        Command::HelpKb => send_help(bot, chat_id, ctx, language_code).await,
        Command::KbAdd(args) => handle_kb_add(bot, msg, ctx, &args, language_code).await,
    }
}

async fn show_rooms(bot: &Bot, msg: &Message, ctx: &BotContext, language_code: Option<&str>) -> Result<()> {
    let rooms = ctx.store.get_user_rooms(msg.chat.id.0)?;
    if rooms.is_empty() {
        return send_main_menu(bot, msg.chat.id, "rooms-empty", language_code).await;
    }
    bot.send_message(msg.chat.id, format_rooms_list(&rooms, 0, language_code))
        .reply_markup(room_delete_keyboard(&rooms, 0))
        .await?;
    Ok(())
}

async fn show_materials(bot: &Bot, msg: &Message, ctx: &BotContext, language_code: Option<&str>) -> Result<()> {
    let materials = ctx.store.get_user_materials(msg.chat.id.0)?;
    if materials.is_empty() {
        bot.send_message(msg.chat.id, t_lang("materials-empty", language_code))
            .reply_markup(materials_menu_keyboard(language_code))
            .await?;
        return Ok(());
    }
    let request = bot.send_message(msg.chat.id, format_materials_list(&materials, 0, language_code));
    // Longer lists get page buttons; the materials menu keyboard stays from the previous message
    match materials_page_keyboard(&materials, 0) {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.reply_markup(materials_menu_keyboard(language_code)).await?,
    };
    Ok(())
}

async fn offer_material_deletion(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    let materials = ctx.store.get_user_materials(msg.chat.id.0)?;
    if materials.is_empty() {
        bot.send_message(msg.chat.id, t_lang("materials-empty", language_code))
            .reply_markup(materials_menu_keyboard(language_code))
            .await?;
        return Ok(());
    }
    bot.send_message(msg.chat.id, format_material_deletion(&materials, 0, language_code))
        .reply_markup(material_delete_keyboard(&materials, 0))
        .await?;
    Ok(())
}

async fn import_standard_materials(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    match ctx.store.import_materials(msg.chat.id.0, default_catalog()) {
        Ok(added) => {
            info!(user_id = %msg.chat.id, added, "Imported standard materials");
            let text = t_args_lang(
                "materials-imported",
                &[("count", &added.to_string())],
                language_code,
            );
            bot.send_message(msg.chat.id, text)
                .reply_markup(materials_menu_keyboard(language_code))
                .await?;
        }
        Err(e) => {
            error!(user_id = %msg.chat.id, error = %e, "Failed to import standard materials");
            bot.send_message(msg.chat.id, t_lang("error-save-failed", language_code))
                .await?;
        }
    }
    Ok(())
}

async fn show_estimate(bot: &Bot, msg: &Message, ctx: &BotContext, language_code: Option<&str>) -> Result<()> {
    let summary = EstimateSummary::from_lines(ctx.store.get_estimate_lines(msg.chat.id.0)?);
    let text = format_estimate(&summary, language_code);
    if summary.is_empty() {
        bot.send_message(msg.chat.id, text)
            .reply_markup(main_menu_keyboard(language_code))
            .await?;
    } else {
        bot.send_message(msg.chat.id, text)
            .reply_markup(estimate_keyboard(language_code))
            .await?;
    }
    Ok(())
}

async fn handle_menu_action(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    action: MenuAction,
    language_code: Option<&str>,
) -> Result<()> {
    debug!(user_id = %msg.chat.id, action = ?action, "Handling menu action");

    match action {
        MenuAction::CalculateArea => begin_room_wizard(bot, msg, dialogue, language_code).await,
        MenuAction::MyRooms => show_rooms(bot, msg, ctx, language_code).await,
        MenuAction::Materials => {
            bot.send_message(msg.chat.id, t_lang("materials-menu", language_code))
                .reply_markup(materials_menu_keyboard(language_code))
                .await?;
            Ok(())
        }
        MenuAction::MyEstimate => show_estimate(bot, msg, ctx, language_code).await,
        MenuAction::MaterialCalculation => begin_calculation(bot, msg, dialogue, ctx, language_code).await,
        MenuAction::KnowledgeBase => show_categories(bot, msg.chat.id, ctx, language_code).await,
        MenuAction::Help => send_help_message(bot, msg.chat.id, language_code).await,
        MenuAction::AddMaterial => begin_material_wizard(bot, msg, dialogue, language_code).await,
        MenuAction::ShowMaterials => show_materials(bot, msg, ctx, language_code).await,
        MenuAction::DeleteMaterial => offer_material_deletion(bot, msg, ctx, language_code).await,
        MenuAction::ImportMaterials => import_standard_materials(bot, msg, ctx, language_code).await,
        MenuAction::MainMenu => send_main_menu(bot, msg.chat.id, "main-menu", language_code).await,
    }
}

/// Route a wizard step to its handler
async fn handle_dialogue_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    state: DialogueState,
    text: &str,
    language_code: Option<&str>,
) -> Result<()> {
    match state {
        DialogueState::Start => Ok(()),
        DialogueState::WaitingForRoomName => {
            handle_room_name_input(bot, msg, dialogue, text, language_code).await
        }
        DialogueState::WaitingForRoomLength { name } => {
            handle_room_length_input(bot, msg, dialogue, text, name, language_code).await
        }
        DialogueState::WaitingForRoomWidth { name, length } => {
            handle_room_width_input(bot, msg, dialogue, text, name, length, language_code).await
        }
        DialogueState::WaitingForRoomHeight { name, length, width } => {
            handle_room_height_input(bot, msg, dialogue, ctx, text, name, length, width, language_code).await
        }
        DialogueState::WaitingForMaterialCategory => {
            handle_material_category_input(bot, msg, dialogue, text, language_code).await
        }
        DialogueState::WaitingForMaterialName { category } => {
            handle_material_name_input(bot, msg, dialogue, text, category, language_code).await
        }
        DialogueState::WaitingForMaterialUnit { category, name } => {
            handle_material_unit_input(bot, msg, dialogue, text, category, name, language_code).await
        }
        DialogueState::WaitingForMaterialPrice { category, name, unit } => {
            handle_material_price_input(bot, msg, dialogue, ctx, text, category, name, unit, language_code)
                .await
        }
        DialogueState::WaitingForCalculationRoom => {
            handle_calculation_room_input(bot, msg, dialogue, ctx, text, language_code).await
        }
        DialogueState::WaitingForCalculationMaterial { room } => {
            handle_calculation_material_input(bot, msg, dialogue, ctx, text, room, language_code).await
        }
        DialogueState::WaitingForCalculationSurface { room, material } => {
            handle_calculation_surface_input(bot, msg, dialogue, ctx, text, room, material, language_code)
                .await
        }
        DialogueState::WaitingForSearchQuery => {
            handle_search_query_input(bot, msg, dialogue, ctx, text, language_code).await
        }
    }
}

async fn handle_text_message(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    text: &str,
) -> Result<()> {
    debug!(user_id = %msg.chat.id, message_length = text.len(), "Received text message from user");
    let language_code = message_language(msg);

    let state = dialogue.get().await?.unwrap_or_default();

    match route(text, &state) {
        Route::Command(command) => handle_command(bot, msg, dialogue, ctx, command, language_code).await,
        Route::MainMenu => {
            if state.is_active() {
                debug!(user_id = %msg.chat.id, state = ?state, "Wizard cancelled from main menu");
                dialogue.exit().await?;
            }
            send_main_menu(bot, msg.chat.id, "main-menu", language_code).await
        }
        Route::WizardStep => handle_dialogue_input(bot, msg, dialogue, ctx, state, text, language_code).await,
        Route::Menu(action) => handle_menu_action(bot, msg, dialogue, ctx, action, language_code).await,
        Route::Unknown => send_main_menu(bot, msg.chat.id, "unknown-input", language_code).await,
    }
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message) -> Result<()> {
    let language_code = message_language(msg);
    debug!(user_id = %msg.chat.id, "Received unsupported message type from user");
    bot.send_message(msg.chat.id, t_lang("unsupported-message", language_code))
        .await?;
    Ok(())
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    ctx: Arc<BotContext>,
    dialogue: BotDialogue,
) -> Result<()> {
    if let Some(text) = msg.text() {
        handle_text_message(&bot, &msg, dialogue, &ctx, text).await?;
    } else {
        handle_unsupported_message(&bot, &msg).await?;
    }

    Ok(())
}
