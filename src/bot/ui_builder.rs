//! UI Builder module for creating keyboards and formatting messages

use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Range;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use tracing::warn;

use crate::estimate::{Calculation, EstimateSummary};
use crate::knowledge::SearchHit;
use crate::localization::{matches_label, t_args_lang, t_lang};
use crate::material_model::{Material, MaterialCategory, MaterialUnit};
use crate::room_model::{Room, Surface};
use crate::storage::Stamped;
use crate::timestamp;

/// Telegram rejects callback data longer than this many bytes
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

/// Telegram message length limit, counted in UTF-16 code units
pub const MAX_MESSAGE_UTF16: usize = 4096;

/// Rooms or materials shown per list message
pub const LIST_PAGE_SIZE: usize = 10;

/// Main menu button keys, in display order
pub const MAIN_MENU_KEYS: [&str; 7] = [
    "menu-calculate-area",
    "menu-my-rooms",
    "menu-materials",
    "menu-my-estimate",
    "menu-material-calculation",
    "menu-knowledge",
    "menu-help",
];

/// Two decimal places, the precision used for areas and money
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// Cut `text` to at most `max_bytes` bytes on a char boundary
pub fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub fn page_count(len: usize) -> usize {
    len.div_ceil(LIST_PAGE_SIZE).max(1)
}

/// Clamp `page` to the last page and return it with the item range it covers
pub fn page_bounds(len: usize, page: usize) -> (usize, Range<usize>) {
    let page = page.min(page_count(len) - 1);
    let start = page * LIST_PAGE_SIZE;
    (page, start..len.min(start + LIST_PAGE_SIZE))
}

/// Previous/next buttons for a paged list, empty when it fits one page
fn page_nav_row(len: usize, page: usize, prefix: &str) -> Vec<InlineKeyboardButton> {
    let mut row = Vec::new();
    if page > 0 {
        row.push(InlineKeyboardButton::callback("◀️", format!("{}:{}", prefix, page - 1)));
    }
    if page + 1 < page_count(len) {
        row.push(InlineKeyboardButton::callback("▶️", format!("{}:{}", prefix, page + 1)));
    }
    row
}

fn page_header(title: String, len: usize, page: usize, language_code: Option<&str>) -> String {
    let pages = page_count(len);
    if pages == 1 {
        return title;
    }
    let position = t_args_lang(
        "list-page",
        &[("page", &(page + 1).to_string()), ("pages", &pages.to_string())],
        language_code,
    );
    format!("{}\n{}", title, position)
}

fn fits_callback_data(data: &str) -> bool {
    data.len() <= MAX_CALLBACK_DATA_BYTES
}

fn reply_keyboard(rows: Vec<Vec<String>>) -> KeyboardMarkup {
    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard()
}

fn main_menu_row(language_code: Option<&str>) -> Vec<String> {
    vec![t_lang("menu-main", language_code)]
}

/// Create the main menu keyboard
pub fn main_menu_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    let labels: Vec<String> = MAIN_MENU_KEYS
        .iter()
        .map(|key| t_lang(key, language_code))
        .collect();
    let rows = labels.chunks(2).map(|chunk| chunk.to_vec()).collect();
    reply_keyboard(rows)
}

/// Keyboard with only the main menu button, shown during free-text steps
pub fn cancel_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    reply_keyboard(vec![main_menu_row(language_code)])
}

pub fn materials_menu_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    reply_keyboard(vec![
        vec![
            t_lang("menu-add-material", language_code),
            t_lang("menu-show-materials", language_code),
        ],
        vec![
            t_lang("menu-delete-material", language_code),
            t_lang("menu-import-materials", language_code),
        ],
        main_menu_row(language_code),
    ])
}

pub fn category_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    let labels: Vec<String> = MaterialCategory::ALL
        .iter()
        .map(|category| t_lang(category.label_key(), language_code))
        .collect();
    let mut rows: Vec<Vec<String>> = labels.chunks(2).map(|chunk| chunk.to_vec()).collect();
    rows.push(main_menu_row(language_code));
    reply_keyboard(rows)
}

pub fn unit_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    let labels: Vec<String> = MaterialUnit::ALL
        .iter()
        .map(|unit| t_lang(unit.label_key(), language_code))
        .collect();
    reply_keyboard(vec![labels, main_menu_row(language_code)])
}

/// Height step keyboard offering the standard ceiling height
pub fn height_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    reply_keyboard(vec![
        vec![t_lang("height-standard", language_code)],
        main_menu_row(language_code),
    ])
}

pub fn surface_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    let labels: Vec<String> = Surface::ALL
        .iter()
        .map(|surface| t_lang(surface.label_key(), language_code))
        .collect();
    reply_keyboard(vec![labels, main_menu_row(language_code)])
}

/// Button text for picking a room: "1. Кухня (32.5 м²)"
pub fn room_choice_label(index: usize, room: &Room) -> String {
    format!("{}. {} ({:.1} м²)", index + 1, room.name, room.area)
}

/// Button text for picking a material: "2. Краска (м², 300.00 ₽)"
pub fn material_choice_label(index: usize, material: &Material, language_code: Option<&str>) -> String {
    format!(
        "{}. {} ({}, {} ₽)",
        index + 1,
        material.name,
        t_lang(material.unit.label_key(), language_code),
        format_amount(material.price)
    )
}

/// Zero-based index from a numbered choice label like "3. Ванная (...)"
pub fn parse_choice_index(text: &str) -> Option<usize> {
    let (number, _) = text.trim().split_once(". ")?;
    number.parse::<usize>().ok()?.checked_sub(1)
}

pub fn rooms_choice_keyboard(rooms: &[Room], language_code: Option<&str>) -> KeyboardMarkup {
    let mut rows: Vec<Vec<String>> = rooms
        .iter()
        .enumerate()
        .map(|(i, room)| vec![room_choice_label(i, room)])
        .collect();
    rows.push(main_menu_row(language_code));
    reply_keyboard(rows)
}

pub fn materials_choice_keyboard(materials: &[Material], language_code: Option<&str>) -> KeyboardMarkup {
    let mut rows: Vec<Vec<String>> = materials
        .iter()
        .enumerate()
        .map(|(i, material)| vec![material_choice_label(i, material, language_code)])
        .collect();
    rows.push(main_menu_row(language_code));
    reply_keyboard(rows)
}

pub fn category_from_label(text: &str) -> Option<MaterialCategory> {
    MaterialCategory::ALL
        .into_iter()
        .find(|category| matches_label(text, category.label_key()))
}

pub fn unit_from_label(text: &str) -> Option<MaterialUnit> {
    MaterialUnit::ALL
        .into_iter()
        .find(|unit| matches_label(text, unit.label_key()))
}

pub fn surface_from_label(text: &str) -> Option<Surface> {
    Surface::ALL
        .into_iter()
        .find(|surface| matches_label(text, surface.label_key()))
}

/// Delete buttons for one page of records plus page navigation. Each button
/// carries the record position and its stamp.
fn delete_keyboard<T: Stamped>(
    records: &[T],
    page: usize,
    name: impl Fn(&T) -> &str,
    delete_prefix: &str,
    page_prefix: &str,
) -> InlineKeyboardMarkup {
    let (page, range) = page_bounds(records.len(), page);
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = records[range.clone()]
        .iter()
        .zip(range)
        .map(|(record, i)| {
            vec![InlineKeyboardButton::callback(
                format!("❌ {}. {}", i + 1, name(record)),
                format!("{}:{}:{}", delete_prefix, i, record.stamp()),
            )]
        })
        .collect();
    let nav = page_nav_row(records.len(), page, page_prefix);
    if !nav.is_empty() {
        buttons.push(nav);
    }
    InlineKeyboardMarkup::new(buttons)
}

/// Inline keyboard with a delete button per room on `page`
pub fn room_delete_keyboard(rooms: &[Room], page: usize) -> InlineKeyboardMarkup {
    delete_keyboard(rooms, page, |room| room.name.as_str(), "room_delete", "rooms_page")
}

/// Inline keyboard with a delete button per material on `page`
pub fn material_delete_keyboard(materials: &[Material], page: usize) -> InlineKeyboardMarkup {
    delete_keyboard(
        materials,
        page,
        |material| material.name.as_str(),
        "material_delete",
        "material_delete_page",
    )
}

/// Navigation for the read-only materials list; `None` when it fits one page
pub fn materials_page_keyboard(materials: &[Material], page: usize) -> Option<InlineKeyboardMarkup> {
    let (page, _) = page_bounds(materials.len(), page);
    let nav = page_nav_row(materials.len(), page, "materials_page");
    (!nav.is_empty()).then(|| InlineKeyboardMarkup::new(vec![nav]))
}

pub fn estimate_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        t_lang("btn-clear-estimate", language_code),
        "estimate_clear",
    )]])
}

/// Knowledge base categories plus a search button
pub fn kb_categories_keyboard(categories: &[String], language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut buttons = Vec::new();
    for category in categories {
        let data = format!("kb_category:{}", category);
        if !fits_callback_data(&data) {
            warn!(category = %category, "Knowledge category name too long for a button");
            continue;
        }
        buttons.push(vec![InlineKeyboardButton::callback(format!("📁 {}", category), data)]);
    }
    buttons.push(vec![InlineKeyboardButton::callback(
        t_lang("btn-kb-search", language_code),
        "kb_search",
    )]);
    InlineKeyboardMarkup::new(buttons)
}

fn item_button(category: &str, item_id: &str, title: &str) -> Option<InlineKeyboardButton> {
    let data = format!("kb_item:{}:{}", category, item_id);
    if !fits_callback_data(&data) {
        warn!(category, item_id, "Knowledge item id too long for a button");
        return None;
    }
    Some(InlineKeyboardButton::callback(format!("📄 {}", title), data))
}

fn back_to_categories_button(language_code: Option<&str>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(
        t_lang("btn-back-to-categories", language_code),
        "kb_back_to_categories",
    )
}

/// Items of one category, each opening the item
pub fn kb_items_keyboard(
    category: &str,
    items: &BTreeMap<String, Value>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .filter_map(|(item_id, document)| {
            let title = document.get("title").and_then(Value::as_str).unwrap_or(item_id);
            item_button(category, item_id, title).map(|button| vec![button])
        })
        .collect();
    buttons.push(vec![back_to_categories_button(language_code)]);
    InlineKeyboardMarkup::new(buttons)
}

/// Search hits plus a button repeating the search
pub fn kb_search_results_keyboard(
    hits: &[SearchHit],
    query: &str,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = hits
        .iter()
        .filter_map(|hit| item_button(&hit.category, &hit.item_id, &hit.title()).map(|b| vec![b]))
        .collect();

    let prefix = "kb_search:";
    let repeat_data = format!(
        "{}{}",
        prefix,
        truncate_to_bytes(query, MAX_CALLBACK_DATA_BYTES - prefix.len())
    );
    buttons.push(vec![InlineKeyboardButton::callback(
        t_lang("btn-kb-search-again", language_code),
        repeat_data,
    )]);
    buttons.push(vec![back_to_categories_button(language_code)]);
    InlineKeyboardMarkup::new(buttons)
}

/// Navigation under a single item
pub fn kb_item_keyboard(category: &str, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut buttons = Vec::new();
    let data = format!("kb_category:{}", category);
    if fits_callback_data(&data) {
        buttons.push(vec![InlineKeyboardButton::callback(
            t_args_lang("btn-back-to-category", &[("category", category)], language_code),
            data,
        )]);
    }
    buttons.push(vec![back_to_categories_button(language_code)]);
    InlineKeyboardMarkup::new(buttons)
}

/// Format a room card
pub fn format_room_info(room: &Room, language_code: Option<&str>) -> String {
    t_args_lang(
        "room-info",
        &[
            ("name", &room.name),
            ("length", &room.length.to_string()),
            ("width", &room.width.to_string()),
            ("height", &room.height.to_string()),
            ("floor_area", &format_amount(room.floor_area)),
            ("wall_area", &format_amount(room.wall_area())),
            ("area", &format_amount(room.area)),
            ("volume", &format_amount(room.volume())),
            ("created", &timestamp::display(&room.created_at)),
        ],
        language_code,
    )
}

/// Format one page of the numbered list of a user's rooms
pub fn format_rooms_list(rooms: &[Room], page: usize, language_code: Option<&str>) -> String {
    let (page, range) = page_bounds(rooms.len(), page);
    let mut result = page_header(t_lang("rooms-list-title", language_code), rooms.len(), page, language_code);
    for i in range {
        result.push_str(&format!("\n\n{}. {}", i + 1, format_room_info(&rooms[i], language_code)));
    }
    result
}

/// Format a material card
pub fn format_material_info(material: &Material, language_code: Option<&str>) -> String {
    t_args_lang(
        "material-info",
        &[
            ("name", &material.name),
            ("category", &t_lang(material.category.label_key(), language_code)),
            ("unit", &t_lang(material.unit.label_key(), language_code)),
            ("price", &format_amount(material.price)),
            ("created", &timestamp::display(&material.created_at)),
        ],
        language_code,
    )
}

/// Format one page of the numbered list of a user's materials
pub fn format_materials_list(materials: &[Material], page: usize, language_code: Option<&str>) -> String {
    let (page, range) = page_bounds(materials.len(), page);
    let mut result = page_header(
        t_lang("materials-list-title", language_code),
        materials.len(),
        page,
        language_code,
    );
    for i in range {
        result.push_str(&format!(
            "\n\n{}. {}",
            i + 1,
            format_material_info(&materials[i], language_code)
        ));
    }
    result
}

/// Deletion prompt above one page of the materials list
pub fn format_material_deletion(materials: &[Material], page: usize, language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("material-choose-delete", language_code),
        format_materials_list(materials, page, language_code)
    )
}

/// Format the outcome of a material calculation
pub fn format_calculation(
    room: &Room,
    material: &Material,
    calculation: &Calculation,
    language_code: Option<&str>,
) -> String {
    t_args_lang(
        "calculation-result",
        &[
            ("room", &room.name),
            ("material", &material.name),
            ("surface", &t_lang(calculation.surface.genitive_key(), language_code)),
            ("area", &format_amount(calculation.area)),
            ("quantity", &format_amount(calculation.quantity)),
            ("unit", &t_lang(material.unit.label_key(), language_code)),
            ("price", &format_amount(material.price)),
            ("cost", &format_amount(calculation.cost)),
        ],
        language_code,
    )
}

/// Format the estimate grouped by room with subtotals and a grand total
pub fn format_estimate(summary: &EstimateSummary, language_code: Option<&str>) -> String {
    if summary.is_empty() {
        return t_lang("estimate-empty", language_code);
    }

    let mut result = t_lang("estimate-title", language_code);
    for room in &summary.rooms {
        result.push_str(&format!("\n\n🏠 {}", room.room_name));
        for line in &room.lines {
            result.push('\n');
            result.push_str(&t_args_lang(
                "estimate-line",
                &[
                    ("material", &line.material_name),
                    ("surface", &t_lang(line.surface.label_key(), language_code)),
                    ("quantity", &format_amount(line.quantity)),
                    ("unit", &t_lang(line.unit.label_key(), language_code)),
                    ("cost", &format_amount(line.cost)),
                ],
                language_code,
            ));
        }
        result.push('\n');
        result.push_str(&t_args_lang(
            "estimate-subtotal",
            &[("amount", &format_amount(room.subtotal))],
            language_code,
        ));
    }
    result.push_str("\n\n");
    result.push_str(&t_args_lang(
        "estimate-total",
        &[("amount", &format_amount(summary.total))],
        language_code,
    ));
    result
}
