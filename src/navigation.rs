//! Vertical section pager driven by drags, wheel ticks and dot clicks.

use std::time::{Duration, Instant};

use tracing::trace;

pub const DEFAULT_SECTIONS: usize = 6;
pub const SWIPE_THRESHOLD_PX: f32 = 80.0;
pub const WHEEL_THRESHOLD: f32 = 30.0;
pub const EDGE_RESISTANCE: f32 = 0.3;
pub const ANIMATION: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Moved to this section.
    To(usize),
    /// Snapped back to the current section.
    Bounce(usize),
    /// Swallowed (animating, or nothing to do).
    Ignored,
}

#[derive(Debug)]
pub struct SectionNavigator {
    sections: usize,
    threshold: f32,
    current: usize,
    animating_until: Option<Instant>,
    drag_start: Option<f32>,
}

impl SectionNavigator {
    pub fn new(sections: usize, threshold: f32) -> Self {
        Self {
            sections: sections.max(1),
            threshold,
            current: 0,
            animating_until: None,
            drag_start: None,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn sections(&self) -> usize {
        self.sections
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.animating_until.is_some_and(|until| now < until)
    }

    /// Jumps to `index`. Out of range indices and requests during an
    /// animation are ignored.
    pub fn go_to(&mut self, index: usize, now: Instant) -> Move {
        if index >= self.sections || self.is_animating(now) {
            return Move::Ignored;
        }
        self.settle(index, now)
    }

    fn settle(&mut self, index: usize, now: Instant) -> Move {
        let moved = index != self.current;
        self.current = index;
        self.animating_until = Some(now + ANIMATION);
        trace!(section = index, "section settled");
        if moved {
            Move::To(index)
        } else {
            Move::Bounce(index)
        }
    }

    pub fn drag_start(&mut self, y: f32, now: Instant) {
        if self.is_animating(now) {
            return;
        }
        self.drag_start = Some(y);
    }

    /// Live offset of the current drag in pixels, damped past either end.
    pub fn drag_offset(&self, y: f32) -> f32 {
        let Some(start) = self.drag_start else {
            return 0.0;
        };
        let diff = y - start;
        let at_first = self.current == 0 && diff > 0.0;
        let at_last = self.current + 1 == self.sections && diff < 0.0;
        if at_first || at_last {
            diff * EDGE_RESISTANCE
        } else {
            diff
        }
    }

    /// Ends a drag. Swiping up past the threshold moves forward, down moves
    /// back; anything else snaps back.
    pub fn drag_end(&mut self, y: f32, now: Instant) -> Move {
        let Some(start) = self.drag_start.take() else {
            return Move::Ignored;
        };
        let diff = y - start;
        let target = if diff.abs() > self.threshold {
            if diff < 0.0 && self.current + 1 < self.sections {
                self.current + 1
            } else if diff > 0.0 && self.current > 0 {
                self.current - 1
            } else {
                self.current
            }
        } else {
            self.current
        };
        self.settle(target, now)
    }

    pub fn wheel(&mut self, delta_y: f32, now: Instant) -> Move {
        if self.is_animating(now) {
            return Move::Ignored;
        }
        if delta_y > WHEEL_THRESHOLD && self.current + 1 < self.sections {
            self.settle(self.current + 1, now)
        } else if delta_y < -WHEEL_THRESHOLD && self.current > 0 {
            self.settle(self.current - 1, now)
        } else {
            Move::Ignored
        }
    }
}

impl Default for SectionNavigator {
    fn default() -> Self {
        Self::new(DEFAULT_SECTIONS, SWIPE_THRESHOLD_PX)
    }
}
