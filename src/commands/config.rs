use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

/// Configuration plus the URL that would actually be used
#[derive(Serialize)]
struct Effective<'a> {
    #[serde(flatten)]
    config: &'a Config,
    webhook_url: Option<String>,
}

pub fn run(action: ConfigAction, url: Option<&str>, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(format, url, config),
    }
}

fn show(format: OutputFormat, url: Option<&str>, config: &Config) -> Result<()> {
    let effective = Effective {
        config,
        webhook_url: config.webhook_url(url),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&effective)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&effective)?);
        }
        OutputFormat::Text => {
            println!("{}", "json-notifier Configuration".bold());
            println!();

            println!("{}:", "logging".cyan());
            println!("  log_level: {}", config.log_level.as_filter());
            match &config.log_file {
                Some(path) => println!("  log_file: {}", path.display()),
                None => println!("  log_file: {}", "stderr".dimmed()),
            }
            println!();

            println!("{}:", "callback_json_notifier".cyan());
            match &config.callback_json_notifier.json_webhook_url {
                Some(u) => println!("  json_webhook_url: {}", u),
                None => println!("  json_webhook_url: {}", "unset".dimmed()),
            }
            println!();

            match &effective.webhook_url {
                Some(u) => println!("{} Events are sent to {}", "✓".green(), u.green()),
                None => println!("{} No webhook URL, notifier is disabled", "⚠".yellow()),
            }
        }
    }

    Ok(())
}
