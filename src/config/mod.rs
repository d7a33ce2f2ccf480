/// Database configuration and connection management
pub mod database;

/// Gameplay and projection settings loaded from config.toml
pub mod settings;
