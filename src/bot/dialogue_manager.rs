//! Dialogue Manager module for the room, material and calculation wizards

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, error, info};

use crate::dialogue::{BotDialogue, DialogueState};
use crate::estimate::{calculate, EstimateLine};
use crate::localization::{matches_label, t_args_lang, t_lang};
use crate::material_model::{parse_price, validate_material_name, Material, MaterialCategory, MaterialUnit};
use crate::room_model::{parse_dimension, parse_height, validate_room_name, Room, DEFAULT_HEIGHT};

use super::knowledge_handler::run_search;
use super::ui_builder::{
    cancel_keyboard, category_from_label, category_keyboard, format_calculation, format_material_info,
    format_room_info, height_keyboard, main_menu_keyboard, materials_choice_keyboard, materials_menu_keyboard,
    parse_choice_index, rooms_choice_keyboard, surface_from_label, surface_keyboard, unit_from_label,
    unit_keyboard,
};
use super::BotContext;

/// Pick an item by its numbered label, falling back to an exact name match
pub fn resolve_choice<T: Clone>(text: &str, items: &[T], name_of: impl Fn(&T) -> &str) -> Option<T> {
    if let Some(item) = parse_choice_index(text).and_then(|i| items.get(i)) {
        return Some(item.clone());
    }
    let text = text.trim();
    items.iter().find(|item| name_of(item) == text).cloned()
}

/// Start the room wizard
pub async fn begin_room_wizard(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(msg.chat.id, t_lang("room-enter-name", language_code))
        .reply_markup(cancel_keyboard(language_code))
        .await?;
    dialogue.update(DialogueState::WaitingForRoomName).await?;
    Ok(())
}

/// Handle room name input during dialogue
pub async fn handle_room_name_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    text: &str,
    language_code: Option<&str>,
) -> Result<()> {
    match validate_room_name(text) {
        Ok(name) => {
            bot.send_message(
                msg.chat.id,
                t_args_lang("room-enter-length", &[("name", &name)], language_code),
            )
            .await?;
            dialogue
                .update(DialogueState::WaitingForRoomLength { name })
                .await?;
        }
        Err(key) => {
            // Keep dialogue active, user can try again
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_room_length_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    text: &str,
    name: String,
    language_code: Option<&str>,
) -> Result<()> {
    match parse_dimension(text) {
        Ok(length) => {
            bot.send_message(msg.chat.id, t_lang("room-enter-width", language_code))
                .await?;
            dialogue
                .update(DialogueState::WaitingForRoomWidth { name, length })
                .await?;
        }
        Err(key) => {
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_room_width_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    text: &str,
    name: String,
    length: f64,
    language_code: Option<&str>,
) -> Result<()> {
    match parse_dimension(text) {
        Ok(width) => {
            bot.send_message(
                msg.chat.id,
                t_args_lang(
                    "room-enter-height",
                    &[("default", &DEFAULT_HEIGHT.to_string())],
                    language_code,
                ),
            )
            .reply_markup(height_keyboard(language_code))
            .await?;
            dialogue
                .update(DialogueState::WaitingForRoomHeight { name, length, width })
                .await?;
        }
        Err(key) => {
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .await?;
        }
    }
    Ok(())
}

/// Handle the last room step: compute areas and save the room
#[allow(clippy::too_many_arguments)]
pub async fn handle_room_height_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    text: &str,
    name: String,
    length: f64,
    width: f64,
    language_code: Option<&str>,
) -> Result<()> {
    let height = if matches_label(text, "height-standard") {
        Ok(DEFAULT_HEIGHT)
    } else {
        parse_height(text)
    };

    let height = match height {
        Ok(height) => height,
        Err(key) => {
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .reply_markup(height_keyboard(language_code))
                .await?;
            return Ok(());
        }
    };

    let room = Room::new(name, length, width, height);
    let user_id = msg.chat.id.0;

    match ctx.store.save_room(user_id, room.clone()) {
        Ok(()) => {
            info!(user_id = %msg.chat.id, room = %room.name, area = room.area, "Room saved");
            bot.send_message(
                msg.chat.id,
                format!(
                    "{}\n\n{}",
                    t_lang("room-saved", language_code),
                    format_room_info(&room, language_code)
                ),
            )
            .reply_markup(main_menu_keyboard(language_code))
            .await?;
        }
        Err(e) => {
            error!(user_id = %msg.chat.id, error = %e, "Failed to save room");
            bot.send_message(msg.chat.id, t_lang("error-save-failed", language_code))
                .reply_markup(main_menu_keyboard(language_code))
                .await?;
        }
    }

    dialogue.exit().await?;
    Ok(())
}

/// Start the material wizard
pub async fn begin_material_wizard(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(msg.chat.id, t_lang("material-choose-category", language_code))
        .reply_markup(category_keyboard(language_code))
        .await?;
    dialogue
        .update(DialogueState::WaitingForMaterialCategory)
        .await?;
    Ok(())
}

pub async fn handle_material_category_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    text: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let Some(category) = category_from_label(text) else {
        bot.send_message(msg.chat.id, t_lang("material-category-invalid", language_code))
            .reply_markup(category_keyboard(language_code))
            .await?;
        return Ok(());
    };

    bot.send_message(msg.chat.id, t_lang("material-enter-name", language_code))
        .reply_markup(cancel_keyboard(language_code))
        .await?;
    dialogue
        .update(DialogueState::WaitingForMaterialName { category })
        .await?;
    Ok(())
}

pub async fn handle_material_name_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    text: &str,
    category: MaterialCategory,
    language_code: Option<&str>,
) -> Result<()> {
    match validate_material_name(text) {
        Ok(name) => {
            bot.send_message(msg.chat.id, t_lang("material-choose-unit", language_code))
                .reply_markup(unit_keyboard(language_code))
                .await?;
            dialogue
                .update(DialogueState::WaitingForMaterialUnit { category, name })
                .await?;
        }
        Err(key) => {
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .await?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_material_unit_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    text: &str,
    category: MaterialCategory,
    name: String,
    language_code: Option<&str>,
) -> Result<()> {
    let Some(unit) = unit_from_label(text) else {
        bot.send_message(msg.chat.id, t_lang("material-unit-invalid", language_code))
            .reply_markup(unit_keyboard(language_code))
            .await?;
        return Ok(());
    };

    bot.send_message(
        msg.chat.id,
        t_args_lang(
            "material-enter-price",
            &[("unit", &t_lang(unit.label_key(), language_code))],
            language_code,
        ),
    )
    .reply_markup(cancel_keyboard(language_code))
    .await?;
    dialogue
        .update(DialogueState::WaitingForMaterialPrice { category, name, unit })
        .await?;
    Ok(())
}

/// Handle the last material step: save the material
#[allow(clippy::too_many_arguments)]
pub async fn handle_material_price_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    text: &str,
    category: MaterialCategory,
    name: String,
    unit: MaterialUnit,
    language_code: Option<&str>,
) -> Result<()> {
    let price = match parse_price(text) {
        Ok(price) => price,
        Err(key) => {
            bot.send_message(msg.chat.id, t_lang(key, language_code))
                .await?;
            return Ok(());
        }
    };

    let material = Material::new(name, category, unit, price);
    match ctx.store.save_material(msg.chat.id.0, material.clone()) {
        Ok(()) => {
            info!(user_id = %msg.chat.id, material = %material.name, price, "Material saved");
            bot.send_message(
                msg.chat.id,
                format!(
                    "{}\n\n{}",
                    t_lang("material-saved", language_code),
                    format_material_info(&material, language_code)
                ),
            )
            .reply_markup(materials_menu_keyboard(language_code))
            .await?;
        }
        Err(e) => {
            error!(user_id = %msg.chat.id, error = %e, "Failed to save material");
            bot.send_message(msg.chat.id, t_lang("error-save-failed", language_code))
                .reply_markup(materials_menu_keyboard(language_code))
                .await?;
        }
    }

    dialogue.exit().await?;
    Ok(())
}

/// Start the calculation wizard when the user has both rooms and materials
pub async fn begin_calculation(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    let user_id = msg.chat.id.0;
    let rooms = ctx.store.get_user_rooms(user_id)?;
    if rooms.is_empty() {
        bot.send_message(msg.chat.id, t_lang("calc-no-rooms", language_code))
            .reply_markup(main_menu_keyboard(language_code))
            .await?;
        return Ok(());
    }

    let materials = ctx.store.get_user_materials(user_id)?;
    if materials.is_empty() {
        bot.send_message(msg.chat.id, t_lang("calc-no-materials", language_code))
            .reply_markup(materials_menu_keyboard(language_code))
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, t_lang("calc-choose-room", language_code))
        .reply_markup(rooms_choice_keyboard(&rooms, language_code))
        .await?;
    dialogue
        .update(DialogueState::WaitingForCalculationRoom)
        .await?;
    Ok(())
}

pub async fn handle_calculation_room_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    text: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let user_id = msg.chat.id.0;
    let rooms = ctx.store.get_user_rooms(user_id)?;

    let Some(room) = resolve_choice(text, &rooms, |room| room.name.as_str()) else {
        bot.send_message(msg.chat.id, t_lang("calc-room-invalid", language_code))
            .reply_markup(rooms_choice_keyboard(&rooms, language_code))
            .await?;
        return Ok(());
    };
    debug!(user_id = %msg.chat.id, room = %room.name, "Room chosen for calculation");

    let materials = ctx.store.get_user_materials(user_id)?;
    if materials.is_empty() {
        bot.send_message(msg.chat.id, t_lang("calc-no-materials", language_code))
            .reply_markup(materials_menu_keyboard(language_code))
            .await?;
        dialogue.exit().await?;
        return Ok(());
    }

    bot.send_message(
        msg.chat.id,
        t_args_lang("calc-choose-material", &[("room", &room.name)], language_code),
    )
    .reply_markup(materials_choice_keyboard(&materials, language_code))
    .await?;
    dialogue
        .update(DialogueState::WaitingForCalculationMaterial { room })
        .await?;
    Ok(())
}

pub async fn handle_calculation_material_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    text: &str,
    room: Room,
    language_code: Option<&str>,
) -> Result<()> {
    let materials = ctx.store.get_user_materials(msg.chat.id.0)?;

    let Some(material) = resolve_choice(text, &materials, |material| material.name.as_str()) else {
        bot.send_message(msg.chat.id, t_lang("calc-material-invalid", language_code))
            .reply_markup(materials_choice_keyboard(&materials, language_code))
            .await?;
        return Ok(());
    };

    bot.send_message(msg.chat.id, t_lang("calc-choose-surface", language_code))
        .reply_markup(surface_keyboard(language_code))
        .await?;
    dialogue
        .update(DialogueState::WaitingForCalculationSurface { room, material })
        .await?;
    Ok(())
}

/// Handle the last calculation step: compute and record the estimate line
#[allow(clippy::too_many_arguments)]
pub async fn handle_calculation_surface_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    text: &str,
    room: Room,
    material: Material,
    language_code: Option<&str>,
) -> Result<()> {
    let Some(surface) = surface_from_label(text) else {
        bot.send_message(msg.chat.id, t_lang("calc-surface-invalid", language_code))
            .reply_markup(surface_keyboard(language_code))
            .await?;
        return Ok(());
    };

    let calculation = calculate(&room, &material, surface);
    info!(
        user_id = %msg.chat.id,
        room = %room.name,
        material = %material.name,
        surface = ?surface,
        cost = calculation.cost,
        "Material calculation completed"
    );

    let mut reply = format_calculation(&room, &material, &calculation, language_code);
    let line = EstimateLine::new(&room, &material, &calculation);
    match ctx.store.add_estimate_line(msg.chat.id.0, line) {
        Ok(()) => {
            reply.push_str("\n\n");
            reply.push_str(&t_lang("calc-added-to-estimate", language_code));
        }
        Err(e) => error!(user_id = %msg.chat.id, error = %e, "Failed to record estimate line"),
    }

    bot.send_message(msg.chat.id, reply)
        .reply_markup(main_menu_keyboard(language_code))
        .await?;
    dialogue.exit().await?;
    Ok(())
}

/// Ask for a knowledge base search query
pub async fn begin_search(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: BotDialogue,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(chat_id, t_lang("kb-enter-query", language_code))
        .reply_markup(cancel_keyboard(language_code))
        .await?;
    dialogue.update(DialogueState::WaitingForSearchQuery).await?;
    Ok(())
}

pub async fn handle_search_query_input(
    bot: &Bot,
    msg: &Message,
    dialogue: BotDialogue,
    ctx: &BotContext,
    text: &str,
    language_code: Option<&str>,
) -> Result<()> {
    if text.trim().is_empty() {
        bot.send_message(msg.chat.id, t_lang("kb-enter-query", language_code))
            .await?;
        return Ok(());
    }

    dialogue.exit().await?;
    bot.send_message(msg.chat.id, t_lang("kb-searching", language_code))
        .reply_markup(main_menu_keyboard(language_code))
        .await?;
    run_search(bot, msg.chat.id, ctx, text, language_code).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_choice_by_number_then_name() {
        let rooms = vec![Room::new("Кухня", 4.0, 3.0, 2.5), Room::new("Спальня", 5.0, 4.0, 2.7)];

        let room = resolve_choice("2. Спальня (50.6 м²)", &rooms, |r| r.name.as_str()).unwrap();
        assert_eq!(room.name, "Спальня");

        let room = resolve_choice(" Кухня ", &rooms, |r| r.name.as_str()).unwrap();
        assert_eq!(room.name, "Кухня");

        assert!(resolve_choice("9. Гараж", &rooms, |r| r.name.as_str()).is_none());
        assert!(resolve_choice("Гараж", &rooms, |r| r.name.as_str()).is_none());
    }
}
