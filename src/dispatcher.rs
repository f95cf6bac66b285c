//! Check-then-send protocol for notifications
use std::time::Duration;

use tracing::{debug, error, instrument, warn};

use crate::category::Category;
use crate::error::{HeraldError, Result};
use crate::limiters::Admission;
use crate::registry::CategoryRegistry;
use crate::sink::Sink;

/// Sends notifications through `sink`, gated by the category's rate limiter.
///
/// `send` takes `&self`; wrap the dispatcher in an `Arc` to share it between
/// threads. Recipients within one category draw from the same bucket.
#[derive(Debug)]
pub struct Dispatcher<S> {
    registry: CategoryRegistry,
    sink: S,
}

impl<S: Sink> Dispatcher<S> {
    pub fn new(registry: CategoryRegistry, sink: S) -> Self {
        Self { registry, sink }
    }

    /// Send `message` to `recipient` if the category has a token left.
    ///
    /// The sink is only invoked after admission. Denials come back as
    /// [`HeraldError::RateLimited`] and sink failures as
    /// [`HeraldError::Delivery`]; neither is retried here.
    #[instrument(skip(self, message), level = "debug")]
    pub fn send(&self, category: Category, recipient: &str, message: &str) -> Result<()> {
        let limiter = self.registry.get(category).map_err(|err| {
            warn!(category = category.name(), "Category has no configured quota");
            err
        })?;

        match limiter.check() {
            Admission::Denied { retry_after } => {
                warn!(
                    category = category.name(),
                    recipient,
                    retry_after_ms = whole_millis(retry_after),
                    "Can't send notification: rate limit exceeded"
                );
                return Err(HeraldError::RateLimited {
                    category,
                    recipient: recipient.to_string(),
                    retry_after,
                });
            }
            Admission::Admitted { remaining } => {
                debug!(category = category.name(), remaining, "Notification admitted");
            }
        }

        self.sink
            .deliver(category.name(), recipient, message)
            .map_err(|source| {
                error!(
                    category = category.name(),
                    recipient,
                    err = %source,
                    "Notification delivery failed"
                );
                HeraldError::Delivery {
                    category,
                    recipient: recipient.to_string(),
                    source,
                }
            })
    }

    /// Categories this dispatcher accepts
    pub fn categories(&self) -> Vec<Category> {
        self.registry.categories()
    }

    pub fn is_configured(&self, category: Category) -> bool {
        self.registry.contains(category)
    }

    /// Whole tokens left for `category` right now
    pub fn remaining(&self, category: Category) -> Result<u32> {
        Ok(self.registry.get(category)?.remaining())
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Milliseconds for log fields, saturating at `u64::MAX`
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
