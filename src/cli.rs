//! CLI for this application
//!
use std::path::PathBuf;

use crate::category::Category;
use crate::error::{HeraldError, Result};
use crate::settings::{self, Settings};

#[derive(Clone, Debug, clap::Parser)]
#[command(name = settings::APP_NAME, version = settings::APP_VERSION)]
pub struct Cli {
    // Quota configuration file
    #[clap(
        long,
        env("HERALD_CONFIG"),
        help = "JSON quota configuration; built-in defaults are used when omitted"
    )]
    pub config: Option<PathBuf>,

    // Log output format
    #[clap(
        long,
        default_value_t = false,
        env("HERALD_JSON_LOGS"),
        help = "Emit logs as JSON lines"
    )]
    pub json_logs: bool,
}

impl Cli {
    pub fn settings(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => Settings::from_path(path),
            None => Ok(Settings::default()),
        }
    }
}

/// A single notification request read from input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub category: Category,
    pub recipient: String,
    pub message: String,
}

/// Parse `<category> <recipient> <message...>`.
///
/// Blank lines and lines starting with `#` yield `Ok(None)`.
pub fn parse_request(line: &str) -> Result<Option<Request>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.splitn(3, char::is_whitespace);
    let category = parts.next().unwrap_or_default();
    let recipient = parts.next().unwrap_or_default();
    let message = parts.next().unwrap_or_default().trim();
    if recipient.is_empty() || message.is_empty() {
        return Err(crate::config_error!(
            "expected '<category> <recipient> <message>', got '{}'",
            line
        ));
    }

    let category = category.parse::<Category>().map_err(HeraldError::Config)?;
    Ok(Some(Request {
        category,
        recipient: recipient.to_string(),
        message: message.to_string(),
    }))
}
