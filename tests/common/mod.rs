//! Shared test helpers: a notifier and callbacks that write to one event log.

#![allow(dead_code)]

use outcall::Notifier;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; set `RUST_LOG=outcall=debug` to see client logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ordered record of notifications and callbacks.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn notifier(&self) -> RecordingNotifier {
        RecordingNotifier(self.clone())
    }
}

pub struct RecordingNotifier(EventLog);

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.0.push(format!("notify:success:{message}"));
    }

    fn error(&self, message: &str) {
        self.0.push(format!("notify:error:{message}"));
    }
}
