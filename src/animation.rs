use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeFunction {
    Linear,
    /// CSS-style `cubic-bezier(x1, y1, x2, y2)`.
    CubicBezier(f32, f32, f32, f32),
}

impl TimeFunction {
    /// `cubic-bezier(.4, 0, .2, 1)`, the popup's entrance/exit curve.
    pub const STANDARD: Self = Self::CubicBezier(0.4, 0.0, 0.2, 1.0);

    pub fn sample(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::CubicBezier(x1, y1, x2, y2) => {
                let s = solve_bezier_parameter(t, x1, x2);
                bezier_axis(s, y1, y2)
            }
        }
    }
}

fn bezier_axis(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_axis_slope(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Finds the curve parameter whose x equals `x`. Newton first, bisection
/// when the slope is too flat to trust.
fn solve_bezier_parameter(x: f32, x1: f32, x2: f32) -> f32 {
    let mut s = x;
    for _ in 0..8 {
        let err = bezier_axis(s, x1, x2) - x;
        if err.abs() < 1e-5 {
            return s;
        }
        let slope = bezier_axis_slope(s, x1, x2);
        if slope.abs() < 1e-6 {
            break;
        }
        s = (s - err / slope).clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    s = x;
    for _ in 0..32 {
        let value = bezier_axis(s, x1, x2);
        if (value - x).abs() < 1e-5 {
            break;
        }
        if value < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) * 0.5;
    }
    s
}

/// Two-state visual transition, the terminal counterpart of toggling an
/// `active` class on an element with `transition: opacity, transform`.
///
/// Reversing mid-flight starts from the current value, so a quick
/// close-after-open fades out from wherever the entrance got to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fade {
    active: bool,
    from: f32,
    started_at: Option<Instant>,
    duration: Duration,
    timing: TimeFunction,
}

impl Fade {
    pub fn new(duration: Duration, timing: TimeFunction) -> Self {
        Self {
            active: false,
            from: 0.0,
            started_at: None,
            duration,
            timing,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool, now: Instant) {
        if self.active == active {
            return;
        }
        self.from = self.progress(now);
        self.active = active;
        self.started_at = Some(now);
    }

    fn target(&self) -> f32 {
        if self.active { 1.0 } else { 0.0 }
    }

    /// Shown-ness in `[0, 1]`: 0 is fully hidden (opacity 0, shifted down),
    /// 1 is fully shown.
    pub fn progress(&self, now: Instant) -> f32 {
        let Some(started_at) = self.started_at else {
            return self.target();
        };
        let elapsed = now.saturating_duration_since(started_at);
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.target();
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        let eased = self.timing.sample(t);
        self.from + (self.target() - self.from) * eased
    }

    pub fn is_running(&self, now: Instant) -> bool {
        self.started_at
            .is_some_and(|started_at| now.saturating_duration_since(started_at) < self.duration)
    }
}
