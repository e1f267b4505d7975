//! # Estimate Module
//!
//! Material cost calculation for a room surface, and the per-user estimate
//! built from the calculations a user has run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::material_model::{Material, MaterialUnit};
use crate::room_model::{Room, Surface};

/// Result of applying one material to one room surface
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub surface: Surface,
    /// Surface area in m²
    pub area: f64,
    /// Required quantity in the material's unit
    pub quantity: f64,
    /// Total cost in rubles
    pub cost: f64,
}

/// Compute the required quantity and cost of `material` for a room surface.
///
/// Area-priced materials cover the surface area, volume-priced materials
/// take the area times the room height, and any other unit counts as one.
pub fn calculate(room: &Room, material: &Material, surface: Surface) -> Calculation {
    let area = room.surface_area(surface);
    let quantity = match material.unit {
        MaterialUnit::SquareMeter => area,
        MaterialUnit::CubicMeter => area * room.height,
        _ => 1.0,
    };
    Calculation {
        surface,
        area,
        quantity,
        cost: quantity * material.price,
    }
}

/// A saved calculation in the user's estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateLine {
    pub room_name: String,
    pub material_name: String,
    pub unit: MaterialUnit,
    pub surface: Surface,
    pub area: f64,
    pub quantity: f64,
    pub price: f64,
    pub cost: f64,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl EstimateLine {
    pub fn new(room: &Room, material: &Material, calculation: &Calculation) -> Self {
        Self {
            room_name: room.name.clone(),
            material_name: material.name.clone(),
            unit: material.unit,
            surface: calculation.surface,
            area: calculation.area,
            quantity: calculation.quantity,
            price: material.price,
            cost: calculation.cost,
            created_at: Utc::now(),
        }
    }
}

/// Lines of one room with their subtotal
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEstimate {
    pub room_name: String,
    pub lines: Vec<EstimateLine>,
    pub subtotal: f64,
}

/// An estimate grouped by room, in first-seen order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EstimateSummary {
    pub rooms: Vec<RoomEstimate>,
    pub total: f64,
}

impl EstimateSummary {
    pub fn from_lines(lines: Vec<EstimateLine>) -> Self {
        let mut rooms: Vec<RoomEstimate> = Vec::new();
        let mut total = 0.0;

        for line in lines {
            total += line.cost;
            match rooms.iter_mut().find(|r| r.room_name == line.room_name) {
                Some(room) => {
                    room.subtotal += line.cost;
                    room.lines.push(line);
                }
                None => rooms.push(RoomEstimate {
                    room_name: line.room_name.clone(),
                    subtotal: line.cost,
                    lines: vec![line],
                }),
            }
        }

        Self { rooms, total }
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material_model::MaterialCategory;

    fn room() -> Room {
        Room::new("Kitchen", 4.0, 3.0, 2.5)
    }

    #[test]
    fn test_area_priced_material() {
        let paint = Material::new("Paint", MaterialCategory::Walls, MaterialUnit::SquareMeter, 300.0);
        let calc = calculate(&room(), &paint, Surface::Walls);
        assert_eq!(calc.area, 35.0);
        assert_eq!(calc.quantity, 35.0);
        assert_eq!(calc.cost, 10500.0);
    }

    #[test]
    fn test_volume_priced_material() {
        let screed = Material::new("Screed", MaterialCategory::Floor, MaterialUnit::CubicMeter, 100.0);
        let calc = calculate(&room(), &screed, Surface::Floor);
        assert_eq!(calc.area, 12.0);
        assert_eq!(calc.quantity, 30.0);
        assert_eq!(calc.cost, 3000.0);
    }

    #[test]
    fn test_count_priced_material() {
        let door = Material::new("Door", MaterialCategory::Doors, MaterialUnit::Piece, 15000.0);
        let calc = calculate(&room(), &door, Surface::Walls);
        assert_eq!(calc.quantity, 1.0);
        assert_eq!(calc.cost, 15000.0);
    }

    #[test]
    fn test_summary_groups_by_room() {
        let paint = Material::new("Paint", MaterialCategory::Walls, MaterialUnit::SquareMeter, 100.0);
        let kitchen = room();
        let hall = Room::new("Hall", 2.0, 2.0, 2.5);

        let lines = vec![
            EstimateLine::new(&kitchen, &paint, &calculate(&kitchen, &paint, Surface::Floor)),
            EstimateLine::new(&hall, &paint, &calculate(&hall, &paint, Surface::Floor)),
            EstimateLine::new(&kitchen, &paint, &calculate(&kitchen, &paint, Surface::Ceiling)),
        ];

        let summary = EstimateSummary::from_lines(lines);
        assert_eq!(summary.rooms.len(), 2);
        assert_eq!(summary.rooms[0].room_name, "Kitchen");
        assert_eq!(summary.rooms[0].lines.len(), 2);
        assert_eq!(summary.rooms[0].subtotal, 2400.0);
        assert_eq!(summary.rooms[1].subtotal, 400.0);
        assert_eq!(summary.total, 2800.0);
    }

    #[test]
    fn test_empty_summary() {
        assert!(EstimateSummary::from_lines(Vec::new()).is_empty());
    }
}
