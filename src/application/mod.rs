pub mod bootstrap;
pub mod commands;
pub mod dashboard;
pub mod history;
pub mod onboarding;
pub mod partners;

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
pub type IdProvider = Arc<dyn Fn(&str) -> String + Send + Sync>;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn next_id(prefix: &str) -> String {
    let counter = ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}-{}-{counter}", Utc::now().timestamp_millis())
}

pub fn default_id_provider() -> IdProvider {
    Arc::new(|prefix| next_id(prefix))
}
