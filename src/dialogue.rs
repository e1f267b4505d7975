//! Wizard dialogue state kept per chat.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::material_model::{Material, MaterialCategory, MaterialUnit};
use crate::room_model::Room;

/// Represents the conversation state of one chat
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    Start,

    // Room wizard: name -> length -> width -> height
    WaitingForRoomName,
    WaitingForRoomLength {
        name: String,
    },
    WaitingForRoomWidth {
        name: String,
        length: f64,
    },
    WaitingForRoomHeight {
        name: String,
        length: f64,
        width: f64,
    },

    // Material wizard: category -> name -> unit -> price
    WaitingForMaterialCategory,
    WaitingForMaterialName {
        category: MaterialCategory,
    },
    WaitingForMaterialUnit {
        category: MaterialCategory,
        name: String,
    },
    WaitingForMaterialPrice {
        category: MaterialCategory,
        name: String,
        unit: MaterialUnit,
    },

    // Calculation wizard: room -> material -> surface
    WaitingForCalculationRoom,
    WaitingForCalculationMaterial {
        room: Room,
    },
    WaitingForCalculationSurface {
        room: Room,
        material: Material,
    },

    WaitingForSearchQuery,
}

impl DialogueState {
    /// Whether the chat is in the middle of a wizard
    pub fn is_active(&self) -> bool {
        !matches!(self, DialogueState::Start)
    }
}

/// Type alias for our dialogue
pub type BotDialogue = Dialogue<DialogueState, InMemStorage<DialogueState>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        assert_eq!(DialogueState::default(), DialogueState::Start);
        assert!(!DialogueState::default().is_active());
        assert!(DialogueState::WaitingForRoomName.is_active());
    }
}
