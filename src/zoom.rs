//! Zoom and scroll state for the page stack
//!
//! Manages the zoom factor and the vertical scroll offset (in content
//! pixels) of the scroll container hosting the view.

/// Scroll direction for keyboard navigation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Zoom factor and scroll position
#[derive(Debug)]
pub struct Zoom {
    /// Current zoom factor (1.0 = 100%)
    pub factor: f64,

    /// Vertical scroll offset in content pixels
    pub scroll_offset: u32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            factor: 1.0,
            scroll_offset: 0,
        }
    }
}

impl Zoom {
    /// Zoom in rate multiplier per step - 10%
    pub const ZOOM_IN_RATE: f64 = 1.1;
    /// Zoom out rate divisor per step - 5%
    pub const ZOOM_OUT_RATE: f64 = 1.05;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f64 = 0.1;

    #[must_use]
    pub fn with_factor(factor: f64) -> Self {
        Self {
            factor: Self::clamp_factor(factor),
            ..Self::default()
        }
    }

    /// Returns the current zoom factor
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Zoom in by one step
    pub fn step_in(&mut self) {
        self.factor = Self::clamp_factor(self.factor * Self::ZOOM_IN_RATE);
    }

    /// Zoom out by one step
    pub fn step_out(&mut self) {
        self.factor = Self::clamp_factor(self.factor / Self::ZOOM_OUT_RATE);
    }

    pub fn reset(&mut self) {
        self.factor = 1.0;
    }

    /// Scroll by `step` pixels, never past `max_offset`
    pub fn scroll(&mut self, direction: ScrollDirection, step: u32, max_offset: u32) {
        self.scroll_offset = match direction {
            ScrollDirection::Up => self.scroll_offset.saturating_sub(step),
            ScrollDirection::Down => self.scroll_offset.saturating_add(step),
        }
        .min(max_offset);
    }

    /// Scroll to an absolute offset, never past `max_offset`
    pub fn scroll_to(&mut self, offset: u32, max_offset: u32) {
        self.scroll_offset = offset.min(max_offset);
    }

    /// Clamp factor to valid range, handling NaN/Inf
    pub fn clamp_factor(factor: f64) -> f64 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.max(Self::MIN_SCALE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_change_factor() {
        let mut zoom = Zoom::default();
        zoom.step_in();
        assert!((zoom.factor() - 1.1).abs() < 1e-9);
        zoom.reset();
        zoom.step_out();
        assert!((zoom.factor() - 1.0 / 1.05).abs() < 1e-9);
    }

    #[test]
    fn factor_never_drops_below_minimum() {
        let mut zoom = Zoom::with_factor(0.1);
        zoom.step_out();
        assert!((zoom.factor() - Zoom::MIN_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_factor_resets() {
        assert!((Zoom::clamp_factor(f64::NAN) - 1.0).abs() < f64::EPSILON);
        assert!((Zoom::clamp_factor(f64::INFINITY) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scroll_is_clamped() {
        let mut zoom = Zoom::default();
        zoom.scroll(ScrollDirection::Down, 50, 30);
        assert_eq!(zoom.scroll_offset, 30);
        zoom.scroll(ScrollDirection::Up, 100, 30);
        assert_eq!(zoom.scroll_offset, 0);
        zoom.scroll_to(500, 120);
        assert_eq!(zoom.scroll_offset, 120);
    }
}
