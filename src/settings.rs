//! Herald application settings
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{HeraldError, Result};

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Time unit a quota is expressed over.
///
/// Names are matched case-insensitively when parsed or deserialized. Unknown
/// names become `Unrecognized`, which gets the degenerate "`limit` per second,
/// capacity 1" bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Window {
    Minute,
    Hour,
    Day,
    Unrecognized,
}

impl From<String> for Window {
    fn from(name: String) -> Self {
        Window::from_name(&name)
    }
}

impl Window {
    /// Parse a window name; anything unknown maps to `Unrecognized`.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "minute" => Window::Minute,
            "hour" => Window::Hour,
            "day" => Window::Day,
            _ => Window::Unrecognized,
        }
    }

    /// Length of the window in seconds
    pub fn seconds(&self) -> u32 {
        match self {
            Window::Minute => 60,
            Window::Hour => 3_600,
            Window::Day => 86_400,
            Window::Unrecognized => 1,
        }
    }

    /// Factor applied to `limit` to size the bucket: one minute's worth of
    /// quota for every minute in the window.
    pub fn capacity_multiplier(&self) -> Option<u32> {
        match self {
            Window::Minute => Some(1),
            Window::Hour => Some(60),
            Window::Day => Some(1_440),
            Window::Unrecognized => None,
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Window::Minute => write!(f, "minute"),
            Window::Hour => write!(f, "hour"),
            Window::Day => write!(f, "day"),
            Window::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// At most `limit` admissions per `window`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuotaSpec {
    pub limit: u32,
    pub window: Window,
}

impl QuotaSpec {
    pub fn new(limit: u32, window: Window) -> Self {
        Self { limit, window }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Window::Minute)
    }

    pub fn per_hour(limit: u32) -> Self {
        Self::new(limit, Window::Hour)
    }

    pub fn per_day(limit: u32) -> Self {
        Self::new(limit, Window::Day)
    }

    /// Tokens added per second
    pub fn refill_rate(&self) -> f64 {
        f64::from(self.limit) / f64::from(self.window.seconds())
    }

    /// Maximum tokens the bucket holds
    pub fn capacity(&self) -> f64 {
        match self.window.capacity_multiplier() {
            Some(multiplier) => f64::from(self.limit) * f64::from(multiplier),
            None => 1.0,
        }
    }

    pub fn validate(&self, category: Category) -> Result<()> {
        if self.limit == 0 {
            return Err(HeraldError::InvalidQuotaSpec {
                category,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

/// Quota configuration document
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    pub quotas: BTreeMap<Category, QuotaSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        let quotas = BTreeMap::from([
            (Category::Status, QuotaSpec::per_minute(2)),
            (Category::News, QuotaSpec::per_day(1)),
            (Category::Marketing, QuotaSpec::per_hour(3)),
        ]);
        Self { quotas }
    }
}

impl Settings {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quotas.is_empty() {
            return Err(crate::config_error!("no quotas configured"));
        }
        for (category, spec) in &self.quotas {
            spec.validate(*category)?;
        }
        Ok(())
    }
}
