use crate::cluster::Generation;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Stage of the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// No recompute is pending and the map shows the latest result.
    Idle,
    /// At least one recompute is requested and its result is not applied yet.
    Computing,
    /// The map thread is applying a result to the overlay.
    Applying,
}

/// Counter shared by all execution contexts, used to detect stale recompute results.
#[derive(Debug, Clone, Default)]
pub(crate) struct GenerationToken(Arc<AtomicU64>);

impl GenerationToken {
    /// Starts a new generation, making all the older ones stale.
    pub(crate) fn advance(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub(crate) fn current(&self) -> Generation {
        Generation(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }
}

#[derive(Debug, Default)]
struct StateInner {
    pending: AtomicUsize,
    applying: AtomicBool,
}

/// Engine state shared between the caller and the map thread.
///
/// The state is derived from the number of requests whose results did not reach the map
/// thread yet, and a flag set while a result is being applied.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateCell(Arc<StateInner>);

impl StateCell {
    pub(crate) fn get(&self) -> EngineState {
        if self.0.applying.load(Ordering::Acquire) {
            EngineState::Applying
        } else if self.0.pending.load(Ordering::Acquire) > 0 {
            EngineState::Computing
        } else {
            EngineState::Idle
        }
    }

    pub(crate) fn request_submitted(&self) {
        self.0.pending.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn result_received(&self) {
        let _ = self
            .0
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                pending.checked_sub(1)
            });
    }

    pub(crate) fn set_applying(&self, applying: bool) {
        self.0.applying.store(applying, Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.0.pending.store(0, Ordering::Release);
        self.0.applying.store(false, Ordering::Release);
    }
}
