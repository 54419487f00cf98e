use serde::{Deserialize, Serialize};

use crate::core::viewport::ViewportState;
use crate::prelude::{Duration, Instant};

/// Easing curves for view transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    Smooth,
}

impl EasingType {
    /// Apply easing function to a normalized time value (0.0 to 1.0)
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingType::Linear => t,
            EasingType::EaseIn => t * t * t,
            EasingType::EaseOut => {
                let t = t - 1.0;
                t * t * t + 1.0
            }
            EasingType::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            // Smooth step (3t^2 - 2t^3)
            EasingType::Smooth => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// A zoom transition between two viewport states.
///
/// Origin and scale are interpolated with the same eased parameter, so a
/// transition built from [`Viewport::zoom_about`](crate::core::viewport::Viewport::zoom_about)
/// keeps its anchor under the cursor on every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomAnimation {
    from: ViewportState,
    to: ViewportState,
    start_time: Instant,
    duration: Duration,
    easing: EasingType,
}

impl ZoomAnimation {
    pub fn new(
        from: ViewportState,
        to: ViewportState,
        start_time: Instant,
        duration: Duration,
        easing: EasingType,
    ) -> Self {
        Self {
            from,
            to,
            start_time,
            duration,
            easing,
        }
    }

    /// Normalized progress at `now`, in `[0, 1]`
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        if now <= self.start_time {
            return 0.0;
        }
        let elapsed = now.duration_since(self.start_time);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Interpolated state at `now`; exactly the target once finished
    pub fn state_at(&self, now: Instant) -> ViewportState {
        if self.is_finished(now) {
            return self.to;
        }
        self.from.lerp(&self.to, self.easing.apply(self.progress(now)))
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    pub fn target(&self) -> ViewportState {
        self.to
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            EasingType::Linear,
            EasingType::EaseIn,
            EasingType::EaseOut,
            EasingType::EaseInOut,
            EasingType::Smooth,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(2.0), 1.0);
        }
        assert_eq!(EasingType::Linear.apply(0.25), 0.25);
    }

    #[test]
    fn test_interpolation() {
        let from = ViewportState {
            origin: Point::new(0.0, 0.0),
            scale: 1.0,
        };
        let to = ViewportState {
            origin: Point::new(100.0, -50.0),
            scale: 3.0,
        };
        let t0 = Instant::now();
        let animation =
            ZoomAnimation::new(from, to, t0, Duration::from_millis(200), EasingType::Linear);

        assert_eq!(animation.state_at(t0), from);
        let mid = animation.state_at(t0 + Duration::from_millis(100));
        assert_eq!(mid.origin, Point::new(50.0, -25.0));
        assert_eq!(mid.scale, 2.0);
        assert!(!animation.is_finished(t0 + Duration::from_millis(199)));
        assert_eq!(animation.state_at(t0 + Duration::from_millis(500)), to);
        assert!(animation.is_finished(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let state = ViewportState {
            origin: Point::new(1.0, 2.0),
            scale: 4.0,
        };
        let t0 = Instant::now();
        let animation = ZoomAnimation::new(state, state, t0, Duration::ZERO, EasingType::Smooth);
        assert!(animation.is_finished(t0));
        assert_eq!(animation.target(), state);
    }
}
