pub mod toml_config;

pub use toml_config::AppConfig;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "krabot-notif")]
#[command(about = "Watches the game site for unread kramails and reports them to Discord")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "krabot.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate the configuration, print a summary and exit
    #[arg(long)]
    pub check_config: bool,
}
