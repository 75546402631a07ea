pub mod commands;
pub mod config;
pub mod data;
pub mod handlers;
pub mod logging;
pub mod moderation;

pub const BOT_NAME: &str = "casekeeper";
pub const COMMAND_TARGET: &str = "casekeeper::command";
pub const ERROR_TARGET: &str = "casekeeper::error";
pub const EVENT_TARGET: &str = "casekeeper::handlers";
pub const CONSOLE_TARGET: &str = "casekeeper";

pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
