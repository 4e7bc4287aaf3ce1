//! Shared helpers for scheduler tests.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use iosched_core::{MockClient, Scheduler, SchedulerClient, SchedulerConfig};

/// Installs a fmt tracing subscriber honoring `RUST_LOG`. Safe to call from
/// every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Builds a scheduler backed by a mock client with the given pool size.
pub fn test_scheduler(num_workers: usize) -> (Arc<Scheduler>, Arc<MockClient>) {
    let client = Arc::new(MockClient::new());
    let config = SchedulerConfig {
        num_workers,
        thread_name: "iosched-test".to_string(),
    };
    let sched = Scheduler::new(Arc::clone(&client) as Arc<dyn SchedulerClient>, config);
    (Arc::new(sched), client)
}

/// Polls `cond` until it holds or `timeout` elapses. Returns the final
/// evaluation of the condition.
pub fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}
