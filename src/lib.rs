pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{AppConfig, CliConfig};
pub use utils::error::{KrabotError, Result};
