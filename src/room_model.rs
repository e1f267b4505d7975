//! # Room Data Model
//!
//! A room is a named rectangular space. Its floor area and total area
//! (walls plus floor) are computed once when the room is created and stored
//! alongside the raw dimensions; reads never recompute them.
//!
//! ## Usage
//!
//! ```rust
//! use stroyhelper::room_model::{Room, Surface};
//!
//! let room = Room::new("Kitchen", 4.0, 3.0, 2.5);
//! assert_eq!(room.floor_area, 12.0);
//! assert_eq!(room.surface_area(Surface::Walls), 35.0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard ceiling height in meters
pub const DEFAULT_HEIGHT: f64 = 2.5;
/// Upper bound for length and width in meters
pub const MAX_DIMENSION: f64 = 100.0;
/// Upper bound for height in meters
pub const MAX_HEIGHT: f64 = 10.0;
/// Maximum room name length in characters
pub const MAX_NAME_LENGTH: usize = 64;

/// A room with its measurements and derived areas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRoom")]
pub struct Room {
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    /// Total area: walls plus floor, in m²
    pub area: f64,
    /// Floor area in m²
    pub floor_area: f64,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// On-disk shape of a room. Older files may lack `height`, `floor_area`
/// or `area`; there `area` held the floor area only.
#[derive(Deserialize)]
struct StoredRoom {
    name: String,
    length: f64,
    width: f64,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    area: Option<f64>,
    #[serde(default)]
    floor_area: Option<f64>,
    #[serde(with = "crate::timestamp")]
    created_at: DateTime<Utc>,
}

impl From<StoredRoom> for Room {
    fn from(stored: StoredRoom) -> Self {
        let height = stored.height.unwrap_or(DEFAULT_HEIGHT);
        let computed = Room::new(stored.name, stored.length, stored.width, height);
        let floor_area = stored.floor_area.or(stored.area).unwrap_or(computed.floor_area);
        Room {
            area: stored.area.unwrap_or(computed.area),
            floor_area,
            created_at: stored.created_at,
            ..computed
        }
    }
}

/// A room surface a material can be applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Walls,
    Floor,
    Ceiling,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Walls, Surface::Floor, Surface::Ceiling];

    /// Localization key for the surface button label
    pub fn label_key(&self) -> &'static str {
        match self {
            Surface::Walls => "surface-walls",
            Surface::Floor => "surface-floor",
            Surface::Ceiling => "surface-ceiling",
        }
    }

    /// Localization key for the surface name used inside sentences
    pub fn genitive_key(&self) -> &'static str {
        match self {
            Surface::Walls => "surface-walls-genitive",
            Surface::Floor => "surface-floor-genitive",
            Surface::Ceiling => "surface-ceiling-genitive",
        }
    }
}

impl Room {
    /// Create a room, computing floor and total areas
    pub fn new(name: impl Into<String>, length: f64, width: f64, height: f64) -> Self {
        let floor_area = length * width;
        let area = 2.0 * (length + width) * height + floor_area;
        Self {
            name: name.into(),
            length,
            width,
            height,
            area,
            floor_area,
            created_at: Utc::now(),
        }
    }

    pub fn perimeter(&self) -> f64 {
        2.0 * (self.length + self.width)
    }

    pub fn wall_area(&self) -> f64 {
        self.perimeter() * self.height
    }

    pub fn ceiling_area(&self) -> f64 {
        self.length * self.width
    }

    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Area of the given surface, from the raw dimensions
    pub fn surface_area(&self, surface: Surface) -> f64 {
        match surface {
            Surface::Walls => self.wall_area(),
            Surface::Floor => self.length * self.width,
            Surface::Ceiling => self.ceiling_area(),
        }
    }
}

/// Validates a room name input
pub fn validate_room_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("room-name-empty");
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err("room-name-too-long");
    }

    Ok(trimmed.to_string())
}

/// Parse a positive number, accepting a decimal comma
pub fn parse_positive_number(input: &str) -> Option<f64> {
    let value = input.trim().replace(',', ".").parse::<f64>().ok()?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Parse a length or width in meters
pub fn parse_dimension(input: &str) -> Result<f64, &'static str> {
    let value = parse_positive_number(input).ok_or("dimension-invalid")?;
    if value > MAX_DIMENSION {
        return Err("dimension-too-large");
    }
    Ok(value)
}

/// Parse a height in meters; empty input means the standard height
pub fn parse_height(input: &str) -> Result<f64, &'static str> {
    if input.trim().is_empty() {
        return Ok(DEFAULT_HEIGHT);
    }
    let value = parse_positive_number(input).ok_or("height-invalid")?;
    if value > MAX_HEIGHT {
        return Err("height-too-large");
    }
    Ok(value)
}
