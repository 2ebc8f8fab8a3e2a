pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "tabload")]
#[command(about = "Load a JSON API or CSV file into a SQLite table, then read it back")]
pub struct CliConfig {
    /// Path to a TOML pipeline definition; overrides --preset
    #[arg(short, long)]
    pub config: Option<String>,

    /// Built-in pipeline to run when no config file is given
    #[arg(long, default_value = "users", value_parser = ["users", "movies"])]
    pub preset: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    /// Validate the configuration and print the plan without running it
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn load_pipeline_config(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => TomlConfig::from_file(path),
            None => TomlConfig::preset(&self.preset),
        }
    }
}
