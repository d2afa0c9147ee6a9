use docsum_common::{ElbowKind, PipelineConfig};
use std::fmt;

use crate::types::InertiaPoint;

/// Picks the number of clusters from a `(k, inertia)` curve
pub trait ElbowStrategy: Send + Sync + fmt::Debug {
    /// Chosen k, or `None` when the curve shows no clear elbow
    fn choose_k(&self, curve: &[InertiaPoint]) -> Option<usize>;

    fn name(&self) -> &'static str;
}

/// Discrete maximum-curvature elbow.
///
/// The curve is normalized to the unit square and the point lying farthest
/// below the chord between its first and last points wins.
#[derive(Debug, Clone, Copy)]
pub struct CurvatureElbow {
    /// Minimum normalized distance below the chord
    pub min_gain: f64,
}

impl Default for CurvatureElbow {
    fn default() -> Self {
        Self { min_gain: 0.05 }
    }
}

impl ElbowStrategy for CurvatureElbow {
    fn choose_k(&self, curve: &[InertiaPoint]) -> Option<usize> {
        if curve.len() < 3 {
            return None;
        }

        let first = curve.first()?;
        let last = curve.last()?;
        let k_span = (last.k as f64) - (first.k as f64);
        if k_span <= 0.0 {
            return None;
        }

        let (min, max) = curve.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.inertia), hi.max(p.inertia))
        });
        let range = max - min;
        if !range.is_finite() || range <= f64::EPSILON * max.abs().max(1.0) {
            return None;
        }

        let x = |p: &InertiaPoint| (p.k as f64 - first.k as f64) / k_span;
        let y = |p: &InertiaPoint| (p.inertia - min) / range;
        let (y0, y1) = (y(first), y(last));

        let mut best: Option<(usize, f64)> = None;
        for point in &curve[1..curve.len() - 1] {
            let chord = y0 + (y1 - y0) * x(point);
            let gain = chord - y(point);
            if best.map_or(true, |(_, g)| gain > g) {
                best = Some((point.k, gain));
            }
        }

        best.filter(|&(_, gain)| gain >= self.min_gain)
            .map(|(k, _)| k)
    }

    fn name(&self) -> &'static str {
        "curvature"
    }
}

/// Always the same k
#[derive(Debug, Clone, Copy)]
pub struct FixedK(pub usize);

impl ElbowStrategy for FixedK {
    fn choose_k(&self, _curve: &[InertiaPoint]) -> Option<usize> {
        Some(self.0)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Build the configured strategy
pub fn strategy_from_config(config: &PipelineConfig) -> Box<dyn ElbowStrategy> {
    match config.elbow {
        ElbowKind::Curvature => Box::new(CurvatureElbow {
            min_gain: config.elbow_min_gain,
        }),
        ElbowKind::Fixed => Box::new(FixedK(config.fallback_k)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(start_k: usize, inertia: &[f64]) -> Vec<InertiaPoint> {
        inertia
            .iter()
            .enumerate()
            .map(|(i, &inertia)| InertiaPoint {
                k: start_k + i,
                inertia,
            })
            .collect()
    }

    #[test]
    fn test_curvature_finds_elbow() {
        let points = curve(2, &[100.0, 30.0, 20.0, 15.0, 12.0]);
        assert_eq!(CurvatureElbow::default().choose_k(&points), Some(3));
    }

    #[test]
    fn test_curvature_no_elbow_on_straight_line() {
        let points = curve(2, &[50.0, 40.0, 30.0, 20.0, 10.0]);
        assert_eq!(CurvatureElbow::default().choose_k(&points), None);
    }

    #[test]
    fn test_curvature_flat_or_short_curve() {
        let elbow = CurvatureElbow::default();
        assert_eq!(elbow.choose_k(&curve(2, &[5.0, 5.0, 5.0, 5.0])), None);
        assert_eq!(elbow.choose_k(&curve(2, &[10.0, 1.0])), None);
        assert_eq!(elbow.choose_k(&[]), None);
    }

    #[test]
    fn test_fixed_k() {
        assert_eq!(FixedK(4).choose_k(&[]), Some(4));
    }

    #[test]
    fn test_strategy_from_config() {
        let mut config = PipelineConfig::default();
        assert_eq!(strategy_from_config(&config).name(), "curvature");
        config.elbow = ElbowKind::Fixed;
        config.fallback_k = 3;
        let strategy = strategy_from_config(&config);
        assert_eq!(strategy.name(), "fixed");
        assert_eq!(strategy.choose_k(&[]), Some(3));
    }
}
