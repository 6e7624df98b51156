pub mod commands;
pub mod config;
pub mod correction;
pub mod db;
pub mod error;
pub mod event;
pub mod filter;
pub mod http;
pub mod interaction;
pub mod llm;
pub mod persona;
pub mod pipeline;
pub mod reply;
pub mod settings;
pub mod stats;
pub mod store;

#[cfg(test)]
mod testing;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub db: db::Database,
    /// Shared with the HTTP listener when it is enabled
    pub relay: std::sync::Arc<pipeline::Relay>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
