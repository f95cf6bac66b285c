//! Delivery sinks.
//!
//! A sink is whatever actually gets a notification to its recipient. The
//! dispatcher only calls it after the category's limiter admitted the send.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

/// Error reported by a sink; the dispatcher passes it on untouched
pub type SinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub trait Sink: Send + Sync {
    fn deliver(&self, category: &str, recipient: &str, message: &str) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn deliver(&self, category: &str, recipient: &str, message: &str) -> Result<(), SinkError> {
        (**self).deliver(category, recipient, message)
    }
}

/// Sink that writes each notification to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn deliver(&self, category: &str, recipient: &str, message: &str) -> Result<(), SinkError> {
        info!(category, recipient, message, "Sending notification");
        Ok(())
    }
}

/// Adapter turning a closure into a sink
pub struct FnSink<F>(pub F);

impl<F> Sink for FnSink<F>
where
    F: Fn(&str, &str, &str) -> Result<(), SinkError> + Send + Sync,
{
    fn deliver(&self, category: &str, recipient: &str, message: &str) -> Result<(), SinkError> {
        (self.0)(category, recipient, message)
    }
}

/// A notification handed to a [`MemorySink`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub category: String,
    pub recipient: String,
    pub message: String,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    deliveries: Vec<Delivery>,
    failure: Option<String>,
}

/// Sink that keeps every delivery in memory.
///
/// Clones share the same record. [`fail_with`](Self::fail_with) makes
/// subsequent deliveries fail without being recorded.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().deliveries.clone()
    }

    pub fn count(&self) -> usize {
        self.lock().deliveries.len()
    }

    pub fn clear(&self) {
        self.lock().deliveries.clear();
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        self.lock().failure = Some(reason.into());
    }

    pub fn recover(&self) {
        self.lock().failure = None;
    }

    fn lock(&self) -> MutexGuard<'_, MemorySinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for MemorySink {
    fn deliver(&self, category: &str, recipient: &str, message: &str) -> Result<(), SinkError> {
        let mut state = self.lock();
        if let Some(reason) = &state.failure {
            return Err(reason.clone().into());
        }
        state.deliveries.push(Delivery {
            category: category.to_string(),
            recipient: recipient.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}
