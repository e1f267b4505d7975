//! # Material Data Model
//!
//! Materials are priced per unit and tied to a surface category. Category
//! and unit are stored as their Russian labels so files stay readable and
//! compatible with records written by earlier versions of the bot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::room_model::{parse_positive_number, MAX_NAME_LENGTH};

/// Upper bound for a unit price
pub const MAX_PRICE: f64 = 10_000_000.0;

/// Surface category a material belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialCategory {
    #[serde(rename = "Стены", alias = "walls")]
    Walls,
    #[serde(rename = "Потолок", alias = "ceiling")]
    Ceiling,
    #[serde(rename = "Пол", alias = "floor")]
    Floor,
    #[serde(rename = "Двери", alias = "doors")]
    Doors,
    #[serde(rename = "Окна", alias = "windows")]
    Windows,
}

impl MaterialCategory {
    pub const ALL: [MaterialCategory; 5] = [
        MaterialCategory::Walls,
        MaterialCategory::Ceiling,
        MaterialCategory::Floor,
        MaterialCategory::Doors,
        MaterialCategory::Windows,
    ];

    /// Localization key for the category label
    pub fn label_key(&self) -> &'static str {
        match self {
            MaterialCategory::Walls => "category-walls",
            MaterialCategory::Ceiling => "category-ceiling",
            MaterialCategory::Floor => "category-floor",
            MaterialCategory::Doors => "category-doors",
            MaterialCategory::Windows => "category-windows",
        }
    }
}

/// Unit a material is priced in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialUnit {
    #[serde(rename = "м²")]
    SquareMeter,
    #[serde(rename = "м³")]
    CubicMeter,
    #[serde(rename = "шт")]
    Piece,
    #[serde(rename = "кг")]
    Kilogram,
    #[serde(rename = "л")]
    Liter,
}

impl MaterialUnit {
    pub const ALL: [MaterialUnit; 5] = [
        MaterialUnit::SquareMeter,
        MaterialUnit::CubicMeter,
        MaterialUnit::Piece,
        MaterialUnit::Kilogram,
        MaterialUnit::Liter,
    ];

    /// Localization key for the unit symbol
    pub fn label_key(&self) -> &'static str {
        match self {
            MaterialUnit::SquareMeter => "unit-m2",
            MaterialUnit::CubicMeter => "unit-m3",
            MaterialUnit::Piece => "unit-piece",
            MaterialUnit::Kilogram => "unit-kg",
            MaterialUnit::Liter => "unit-liter",
        }
    }
}

/// A construction material recorded by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub category: MaterialCategory,
    pub unit: MaterialUnit,
    /// Price per unit in rubles
    pub price: f64,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        category: MaterialCategory,
        unit: MaterialUnit,
        price: f64,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            unit,
            price,
            created_at: Utc::now(),
        }
    }
}

/// Validates a material name input
pub fn validate_material_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("material-name-empty");
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err("material-name-too-long");
    }

    Ok(trimmed.to_string())
}

/// Parse a unit price, accepting a decimal comma
pub fn parse_price(input: &str) -> Result<f64, &'static str> {
    let price = parse_positive_number(input).ok_or("price-invalid")?;
    if price > MAX_PRICE {
        return Err("price-too-large");
    }
    Ok(price)
}

/// Preset price list users can import into their own materials
pub fn default_catalog() -> Vec<Material> {
    use MaterialCategory::*;
    use MaterialUnit::SquareMeter;

    [
        ("Ламинат", Floor, 800.0),
        ("Паркетная доска", Floor, 2000.0),
        ("Керамическая плитка", Floor, 1200.0),
        ("Обои", Walls, 500.0),
        ("Краска", Walls, 300.0),
        ("Керамическая плитка", Walls, 1200.0),
        ("Краска", Ceiling, 300.0),
        ("Натяжной потолок", Ceiling, 1500.0),
    ]
    .into_iter()
    .map(|(name, category, price)| Material::new(name, category, SquareMeter, price))
    .collect()
}
