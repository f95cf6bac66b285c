//! Per-category rate limiting for outbound notifications.
//!
//! Every [`Category`] gets its own token bucket sized from a [`QuotaSpec`].
//! The [`Dispatcher`] asks the category's limiter for a token before handing
//! a notification to its [`Sink`], and reports denials as
//! [`HeraldError::RateLimited`].
//!
//! ```
//! use herald::{Category, CategoryRegistry, Dispatcher, HeraldError, MemorySink, QuotaSpec};
//!
//! let registry = CategoryRegistry::build([(Category::Status, QuotaSpec::per_minute(1))])?;
//! let dispatcher = Dispatcher::new(registry, MemorySink::new());
//!
//! dispatcher.send(Category::Status, "ops@example.com", "deploy finished")?;
//! let denied = dispatcher.send(Category::Status, "ops@example.com", "deploy finished again");
//! assert!(matches!(denied, Err(HeraldError::RateLimited { .. })));
//! assert_eq!(dispatcher.sink().count(), 1);
//! # Ok::<(), HeraldError>(())
//! ```

pub mod category;
pub mod cli;
pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod limiters;
pub mod registry;
pub mod settings;
pub mod sink;

pub use category::Category;
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::Dispatcher;
pub use error::{HeraldError, Result};
pub use limiters::{Admission, RateLimiter};
pub use registry::CategoryRegistry;
pub use settings::{QuotaSpec, Settings, Window};
pub use sink::{Delivery, FnSink, LogSink, MemorySink, Sink, SinkError};
