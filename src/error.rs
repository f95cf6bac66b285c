use std::time::Duration;

use crate::category::Category;
use crate::sink::SinkError;

/// Main error type for herald
#[derive(Debug, thiserror::Error)]
pub enum HeraldError {
    /// No quota is configured for the category
    #[error("Category not configured: {category}")]
    CategoryNotConfigured { category: Category },

    /// The category's bucket is empty; the caller may retry after `retry_after`
    #[error("Rate limit exceeded for {category} notifications to recipient {recipient}")]
    RateLimited {
        category: Category,
        recipient: String,
        retry_after: Duration,
    },

    /// The sink refused or failed the delivery
    #[error("Delivery of {category} notification to {recipient} failed: {source}")]
    Delivery {
        category: Category,
        recipient: String,
        #[source]
        source: SinkError,
    },

    /// A quota with a zero limit was supplied at construction time
    #[error("Invalid quota for {category}: limit must be positive, got {limit}")]
    InvalidQuotaSpec { category: Category, limit: u32 },

    /// Configuration or CLI argument errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// System I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, HeraldError>;

impl HeraldError {
    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            HeraldError::CategoryNotConfigured { .. } => "category_not_configured",
            HeraldError::RateLimited { .. } => "rate_limited",
            HeraldError::Delivery { .. } => "delivery_failed",
            HeraldError::InvalidQuotaSpec { .. } => "invalid_quota_spec",
            HeraldError::Config(_) => "configuration_error",
            HeraldError::Io(_) => "io_error",
            HeraldError::Json(_) => "json_error",
        }
    }

    /// Only a rate-limit denial goes away by itself; everything else needs a
    /// configuration fix or a downstream repair.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HeraldError::RateLimited { .. })
    }

    /// Suggested back-off for retryable errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            HeraldError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::HeraldError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::HeraldError::Config(format!($fmt, $($arg)*))
    };
}
