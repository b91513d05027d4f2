// ── Store configuration ──

use std::time::Duration;

/// What happens when a disposed query is subscribed to or revalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposedBehavior {
    /// Fail fast with [`StoreError::DisposedQuery`](crate::StoreError::DisposedQuery).
    /// Catches use-after-dispose bugs during development.
    #[default]
    Strict,
    /// Silently ignore the operation.
    Lenient,
}

/// Per-store tunables.
///
/// Constructed once and handed to [`Store::with_config`](crate::Store::with_config);
/// every query created by that store shares it.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Freshness window for non-forced revalidation. A `revalidate(false)`
    /// within this window of the last successful load is a no-op. Zero
    /// means data is never considered fresh.
    pub dedupe_interval: Duration,

    /// Behavior of operations on disposed queries.
    pub disposed_behavior: DisposedBehavior,

    /// Attach an [`EmissionTracker`](crate::diagnostics::EmissionTracker)
    /// to every subscription. Diagnostic only; off by default.
    pub track_emissions: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dedupe_interval: Duration::ZERO,
            disposed_behavior: DisposedBehavior::Strict,
            track_emissions: false,
        }
    }
}

impl StoreConfig {
    pub fn with_dedupe_interval(mut self, interval: Duration) -> Self {
        self.dedupe_interval = interval;
        self
    }

    pub fn with_disposed_behavior(mut self, behavior: DisposedBehavior) -> Self {
        self.disposed_behavior = behavior;
        self
    }

    pub fn with_emission_tracking(mut self, enabled: bool) -> Self {
        self.track_emissions = enabled;
        self
    }
}
