//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: routes text messages to commands, menus and wizard steps
//! - `callback_handler`: handles inline keyboard callback queries
//! - `dialogue_manager`: room, material and calculation wizard steps
//! - `knowledge_handler`: knowledge base browsing, search and admin additions
//! - `commands`: slash command parsing
//! - `ui_builder`: creates keyboards and formats messages

pub mod callback_handler;
pub mod commands;
pub mod dialogue_manager;
pub mod knowledge_handler;
pub mod message_handler;
pub mod ui_builder;

use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::config::BotConfig;
use crate::dialogue::DialogueState;
use crate::knowledge::KnowledgeBase;
use crate::storage::UserStore;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

/// Shared state injected into every handler
pub struct BotContext {
    pub store: UserStore,
    pub knowledge: KnowledgeBase,
    pub config: BotConfig,
}

impl BotContext {
    pub fn new(config: BotConfig) -> Self {
        Self {
            store: UserStore::new(&config.data_dir),
            knowledge: KnowledgeBase::new(&config.knowledge_base_dir),
            config,
        }
    }
}

/// Dispatch tree: messages and callback queries, both with per-chat dialogue
pub fn schema() -> UpdateHandler<anyhow::Error> {
    let messages = Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<DialogueState>, DialogueState>()
        .endpoint(message_handler);

    let callbacks = Update::filter_callback_query()
        .enter_dialogue::<CallbackQuery, InMemStorage<DialogueState>, DialogueState>()
        .endpoint(callback_handler);

    dptree::entry().branch(messages).branch(callbacks)
}
