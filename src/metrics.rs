// Process-wide observer for match runs. The crate exports no counters of its
// own; whoever embeds the matcher decides what to do with the numbers.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for match operations.
pub trait MatchMetrics: Send + Sync {
    /// Record the outcome of one match run.
    ///
    /// `latency` is the wall-clock duration of the run, `candidates` the
    /// number of candidate variants offered, `matches` the number returned
    /// after disambiguation, and `cache_hit` whether the result came out of
    /// the memoization cache without recomputing.
    fn record_match(&self, latency: Duration, candidates: usize, matches: usize, cache_hit: bool);
}

type Installed = RwLock<Option<Arc<dyn MatchMetrics>>>;

static INSTALLED: OnceCell<Installed> = OnceCell::new();

fn installed() -> &'static Installed {
    INSTALLED.get_or_init(Installed::default)
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    installed()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Install or clear the global match metrics recorder.
///
/// Every [`AttributeMatcher`](crate::engine::AttributeMatcher) and
/// [`CachedMatcher`](crate::cache::CachedMatcher) in the process reports to
/// the installed recorder; passing `None` detaches it.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut slot = installed()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = recorder;
}
