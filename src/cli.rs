use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

#[derive(Parser)]
#[command(
    name = "json-notifier",
    about = "Forward orchestration lifecycle events as JSON to a webhook",
    version = env!("GIT_DESCRIBE"),
    after_help = "The webhook URL is read from --url, then JSON_WEBHOOK_URL, then\n`callback_json_notifier.json_webhook_url` in json-notifier.yaml."
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to json-notifier.yaml config file")]
    pub config: Option<PathBuf>,

    /// Webhook URL, overriding environment and config file
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read a stream of notifications (one JSON object per line) and forward each
    Listen {
        /// Read from this file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,
    },

    /// Forward a single notification
    Send {
        /// Notification JSON (read from stdin if omitted)
        payload: Option<String>,

        /// Id of the play the notification belongs to
        #[arg(long)]
        play: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format
        #[arg(long, short = 'o', value_enum, default_value_t)]
        format: OutputFormat,
    },
}
