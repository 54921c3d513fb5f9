// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "k65d")]
#[command(author, version, about = "Corsair K65 Plus lighting daemon")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/k65d/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace), overrides the config file
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Select a keyboard by serial number
    #[arg(short, long, global = true)]
    pub serial: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Take control of the keyboard lighting until interrupted
    #[command(visible_alias = "r")]
    Run,

    /// List connected keyboards
    #[command(visible_aliases = ["ls", "l"])]
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List effects supported by the keyboard model
    #[command(visible_alias = "e")]
    Effects {
        /// Model to list for instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show identity and firmware version
    #[command(visible_aliases = ["version", "i"])]
    Info,

    /// Write a config file with all defaults
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}
