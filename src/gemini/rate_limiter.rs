//! Sliding-window request accounting for the generation service.
//!
//! The limiter is advisory: [`RequestWindow::admit`] records an admission,
//! it never refuses one. Callers read [`RequestWindow::current_load`] and
//! decide for themselves whether to proceed. A lazily-pruned list is
//! adequate at the request volumes involved; correctness only requires
//! exactness of the 60-second window, not throughput.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Width of the sliding window, in seconds.
const WINDOW_SECONDS: i64 = 60;

/// Tracks request admissions over a trailing 60-second window.
///
/// Safe under concurrent invocation from multiple tasks; a single mutex
/// guards both the window and the lifetime counter. Pruning happens
/// opportunistically inside both `admit` and `current_load`; there is no
/// background sweep.
#[derive(Debug, Default)]
pub struct RequestWindow {
    state: Mutex<WindowState>,
}

#[derive(Debug, Default)]
struct WindowState {
    admissions: VecDeque<DateTime<Utc>>,
    total: u64,
}

impl RequestWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request admission at the current time.
    pub async fn admit(&self) {
        self.admit_at(Utc::now()).await;
    }

    /// Number of admissions within the trailing 60 seconds.
    pub async fn current_load(&self) -> usize {
        self.load_at(Utc::now()).await
    }

    /// Lifetime admission count; monotonic, never reset by pruning.
    pub async fn total_count(&self) -> u64 {
        self.state.lock().await.total
    }

    pub(crate) async fn admit_at(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        prune(&mut state.admissions, now);
        state.admissions.push_back(now);
        state.total += 1;
    }

    pub(crate) async fn load_at(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.lock().await;
        prune(&mut state.admissions, now);
        state.admissions.len()
    }
}

/// Discard admissions older than the window, oldest first.
fn prune(admissions: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
    let cutoff = now - Duration::seconds(WINDOW_SECONDS);
    while admissions.front().is_some_and(|stamp| *stamp <= cutoff) {
        admissions.pop_front();
    }
}
