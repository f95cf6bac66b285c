//! One rate limiter per configured notification category.
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::category::Category;
use crate::clock::{Clock, SystemClock};
use crate::error::{HeraldError, Result};
use crate::limiters::RateLimiter;
use crate::settings::{QuotaSpec, Settings, Window};

/// Registry of per-category limiters.
///
/// The set of categories is fixed at construction. Lookups never create a
/// limiter, so an unconfigured category is always an error.
#[derive(Debug)]
pub struct CategoryRegistry {
    limiters: BTreeMap<Category, RateLimiter>,
}

impl CategoryRegistry {
    /// Build a limiter for every entry. Fails as a whole if any quota is invalid.
    pub fn build<I>(configs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Category, QuotaSpec)>,
    {
        Self::build_with_clock(configs, Arc::new(SystemClock::new()))
    }

    pub fn build_with_clock<I>(configs: I, clock: Arc<dyn Clock>) -> Result<Self>
    where
        I: IntoIterator<Item = (Category, QuotaSpec)>,
    {
        let configs: BTreeMap<Category, QuotaSpec> = configs.into_iter().collect();
        for (category, spec) in &configs {
            spec.validate(*category)?;
        }

        let limiters = configs
            .into_iter()
            .map(|(category, spec)| {
                if spec.window == Window::Unrecognized {
                    warn!(
                        category = category.name(),
                        limit = spec.limit,
                        "Unrecognized quota window; bucket capacity is 1"
                    );
                }
                let limiter = RateLimiter::with_clock(spec, clock.clone());
                info!(
                    category = category.name(),
                    limit = spec.limit,
                    window = %spec.window,
                    capacity = limiter.capacity(),
                    "Configured rate limiter"
                );
                (category, limiter)
            })
            .collect();

        Ok(Self { limiters })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::build(settings.quotas.clone())
    }

    pub fn get(&self, category: Category) -> Result<&RateLimiter> {
        self.limiters
            .get(&category)
            .ok_or(HeraldError::CategoryNotConfigured { category })
    }

    pub fn contains(&self, category: Category) -> bool {
        self.limiters.contains_key(&category)
    }

    /// Configured categories in declaration order
    pub fn categories(&self) -> Vec<Category> {
        self.limiters.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}
