use std::time::Duration;
use web_time::Instant;

/// Direction of a marker fade.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fade {
    /// Marker appears on the map.
    In,
    /// Marker disappears and is removed when the transition ends.
    Out,
}

/// Time-bounded opacity change of a marker.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transition {
    fade: Fade,
    start: Instant,
    duration: Duration,
}

impl Transition {
    pub(crate) fn new(fade: Fade, start: Instant, duration: Duration) -> Self {
        Self {
            fade,
            start,
            duration,
        }
    }

    /// Direction of the fade.
    pub fn fade(&self) -> Fade {
        self.fade
    }

    /// Portion of the transition passed by `now`, in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }

        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    /// Marker opacity at `now`.
    pub fn opacity(&self, now: Instant) -> f32 {
        match self.fade {
            Fade::In => self.progress(now),
            Fade::Out => 1.0 - self.progress(now),
        }
    }

    /// Returns true if the transition is over at `now`.
    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}
