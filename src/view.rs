use crate::config::ViewConfig;

/// A CSS-style timing curve through (0, 0), (x1, y1), (x2, y2), (1, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    /// The stock `ease-in-out` of web opacity transitions.
    pub const STANDARD: CubicBezier = CubicBezier {
        x1: 0.4,
        y1: 0.0,
        x2: 0.2,
        y2: 1.0,
    };

    fn component(s: f64, p1: f64, p2: f64) -> f64 {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
    }

    /// Eased value for progress `x` in `0..=1`.
    ///
    /// x(s) is monotonic for control points inside the unit square, so bisection finds s.
    pub fn at(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let (mut lo, mut hi) = (0.0, 1.0);

        for _ in 0..40 {
            let mid = 0.5 * (lo + hi);
            if Self::component(mid, self.x1, self.x2) < x {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        Self::component(0.5 * (lo + hi), self.y1, self.y2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Showing3D,
    FadingOut,
    ShowingFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTransition {
    FadeStarted,
    /// The 3D view is gone and its session must be torn down.
    SwappedToFallback,
}

/// Owns the 3D → fade → fallback lifecycle and the timing between the steps.
#[derive(Debug, Clone)]
pub struct ViewController {
    state: ViewState,
    fade_started_at: Option<f64>,
    fallback_delay: f64,
    fade_duration: f64,
    fade_curve: CubicBezier,
}

impl ViewController {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            state: ViewState::Showing3D,
            fade_started_at: None,
            fallback_delay: config.fallback_delay,
            fade_duration: config.fade_duration,
            fade_curve: CubicBezier::STANDARD,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// Called when the connection animation completes. Only the first call has an effect.
    pub fn begin_fade(&mut self, now: f64) -> Option<ViewTransition> {
        if self.state != ViewState::Showing3D {
            return None;
        }

        self.state = ViewState::FadingOut;
        self.fade_started_at = Some(now);
        Some(ViewTransition::FadeStarted)
    }

    /// Moves to the fallback surface once the delay after the fade start has passed.
    pub fn tick(&mut self, now: f64) -> Option<ViewTransition> {
        let started = self.fade_started_at?;

        if self.state == ViewState::FadingOut && now >= started + self.fallback_delay {
            self.state = ViewState::ShowingFallback;
            return Some(ViewTransition::SwappedToFallback);
        }

        None
    }

    /// Opacity of the white overlay covering the scene.
    pub fn overlay_opacity(&self, now: f64) -> f32 {
        match (self.state, self.fade_started_at) {
            (ViewState::Showing3D, _) | (_, None) => 0.0,
            (ViewState::ShowingFallback, _) => 1.0,
            (ViewState::FadingOut, Some(started)) => {
                if self.fade_duration <= 0.0 {
                    return 1.0;
                }
                let progress = ((now - started) / self.fade_duration).clamp(0.0, 1.0);
                self.fade_curve.at(progress) as f32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;

    fn controller() -> ViewController {
        ViewController::new(&SceneConfig::default().view)
    }

    #[test]
    fn swaps_to_fallback_after_the_delay() {
        let mut view = controller();
        assert_eq!(view.tick(100.0), None);

        assert_eq!(view.begin_fade(10.0), Some(ViewTransition::FadeStarted));
        assert_eq!(view.state(), ViewState::FadingOut);

        assert_eq!(view.tick(11.0), None);
        assert_eq!(view.tick(11.49), None);
        assert_eq!(view.tick(11.5), Some(ViewTransition::SwappedToFallback));
        assert_eq!(view.state(), ViewState::ShowingFallback);

        assert_eq!(view.tick(20.0), None);
    }

    #[test]
    fn fade_only_starts_once() {
        let mut view = controller();
        view.begin_fade(1.0);
        assert_eq!(view.begin_fade(1.2), None);
        assert_eq!(view.tick(2.4), None);
        assert_eq!(view.tick(2.5), Some(ViewTransition::SwappedToFallback));
    }

    #[test]
    fn overlay_fades_in_over_its_duration() {
        let mut view = controller();
        assert_eq!(view.overlay_opacity(5.0), 0.0);

        view.begin_fade(5.0);
        assert_eq!(view.overlay_opacity(5.0), 0.0);
        assert!((view.overlay_opacity(5.6) - 0.7756).abs() < 1e-3);
        assert_eq!(view.overlay_opacity(6.2), 1.0);
        assert_eq!(view.overlay_opacity(7.0), 1.0);
    }

    #[test]
    fn standard_curve_matches_css_timing() {
        let curve = CubicBezier::STANDARD;
        assert_eq!(curve.at(0.0), 0.0);
        assert_eq!(curve.at(1.0), 1.0);
        assert!((curve.at(0.25) - 0.2366).abs() < 1e-3);
        assert!((curve.at(0.5) - 0.7756).abs() < 1e-3);
        assert!((curve.at(0.75) - 0.9594).abs() < 1e-3);

        let samples: Vec<f64> = (0..=100).map(|i| curve.at(i as f64 / 100.0)).collect();
        assert!(samples.windows(2).all(|pair| pair[1] >= pair[0]));
    }
}
