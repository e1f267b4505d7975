//! # StroyHelper Telegram Bot
//!
//! A Telegram bot that helps estimate home-renovation costs: users describe
//! rooms and material prices through short wizards, get areas and costs
//! computed, and browse a small reference knowledge base.

pub mod bot;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod estimate;
pub mod knowledge;
pub mod localization;
pub mod logging;
pub mod material_model;
pub mod retry;
pub mod room_model;
pub mod storage;
pub mod timestamp;
