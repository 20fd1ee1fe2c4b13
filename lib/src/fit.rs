use glam::DMat3;
use glam::DVec2;
use glam::DVec3;
use serde::Serialize;

/// A circle in the XY plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Circle {
    /// Centre.
    pub center: DVec2,
    /// Radius.
    pub radius: f64,
}

/// Algebraic least squares circle through `points`.
///
/// Solves `2x·cx + 2y·cy + c = x² + y²` for the centre and
/// `r² = cx² + cy² + c`. Points are recentred on their mean first to keep
/// the normal equations well conditioned at housing coordinates.
///
/// Returns `None` for fewer than three points or a collinear set.
#[must_use]
pub fn fit_circle_2d(points: &[DVec2]) -> Option<Circle> {
    if points.len() < 3 {
        return None;
    }
    let origin = points.iter().copied().sum::<DVec2>() / points.len() as f64;

    let mut ata = DMat3::ZERO;
    let mut atb = DVec3::ZERO;
    for p in points {
        let d = *p - origin;
        let row = DVec3::new(2.0 * d.x, 2.0 * d.y, 1.0);
        let rhs = d.length_squared();
        ata += DMat3::from_cols(row * row.x, row * row.y, row * row.z);
        atb += row * rhs;
    }

    let scale = ata.to_cols_array().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if ata.determinant().abs() <= 1e-12 * scale.powi(3) {
        return None;
    }
    let solution = ata.inverse() * atb;
    let r2 = solution.x * solution.x + solution.y * solution.y + solution.z;
    if r2 <= 0.0 || !r2.is_finite() {
        return None;
    }
    Some(Circle {
        center: origin + DVec2::new(solution.x, solution.y),
        radius: r2.sqrt(),
    })
}

/// Circle estimate from the centroid and mean distance of the points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CentroidCircle {
    /// Mean of the points.
    pub center: DVec2,
    /// Mean distance to the centre.
    pub radius: f64,
    /// Population standard deviation of those distances.
    pub radius_std: f64,
}

/// Centroid circle, `None` for an empty slice.
#[must_use]
pub fn centroid_circle(points: &[DVec2]) -> Option<CentroidCircle> {
    if points.is_empty() {
        return None;
    }
    let center = points.iter().copied().sum::<DVec2>() / points.len() as f64;
    let distances: Vec<f64> = points.iter().map(|p| p.distance(center)).collect();
    Some(CentroidCircle {
        center,
        radius: mean(&distances),
        radius_std: std_dev(&distances),
    })
}

/// Arithmetic mean, zero for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation, zero for an empty slice.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is in `0.0..=100.0`. Returns `None` for an empty slice.
#[must_use]
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// `n` evenly spaced values from `lo` to `hi` inclusive.
#[must_use]
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Equal width histogram.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    /// Number of values in each bin.
    pub counts: Vec<usize>,
    /// Bin edges, one more than `counts`.
    pub edges: Vec<f64>,
}

impl Histogram {
    /// Index of the fullest bin, the first one on ties.
    #[must_use]
    pub fn peak(&self) -> Option<usize> {
        self.counts
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (i, &c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((i, c)),
            })
            .map(|(i, _)| i)
    }
}

/// Histogram over the value range, every bin half open except the last.
///
/// A constant input spreads over `value ± 0.5`.
#[must_use]
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if values.is_empty() {
        (lo, hi) = (0.0, 1.0);
    } else if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0; bins];
    for &v in values {
        let index = (((v - lo) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    Histogram { counts, edges }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::dvec2;

    use super::*;

    fn ring(center: DVec2, radius: f64, n: usize) -> Vec<DVec2> {
        (0..n)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / n as f64;
                center + radius * dvec2(a.cos(), a.sin())
            })
            .collect()
    }

    #[test]
    fn circle_at_housing_coordinates() {
        let circle = fit_circle_2d(&ring(dvec2(147.0, 9.5), 16.0, 24)).unwrap();
        assert_relative_eq!(circle.center.x, 147.0, epsilon = 1e-9);
        assert_relative_eq!(circle.center.y, 9.5, epsilon = 1e-9);
        assert_relative_eq!(circle.radius, 16.0, epsilon = 1e-9);
    }

    #[test]
    fn collinear_points_have_no_circle() {
        let points = [0.0, 1.0, 2.0, 3.0].map(|x| dvec2(x, 2.0 * x));
        assert!(fit_circle_2d(&points).is_none());
        assert!(fit_circle_2d(&points[..2]).is_none());
    }

    #[test]
    fn centroid_circle_of_ring() {
        let c = centroid_circle(&ring(DVec2::ZERO, 5.0, 12)).unwrap();
        assert_relative_eq!(c.radius, 5.0, epsilon = 1e-9);
        assert!(c.radius_std < 1e-9);
    }

    #[test]
    fn statistics() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(mean(&values), 2.5);
        assert_relative_eq!(std_dev(&values), 1.25_f64.sqrt());
        assert_relative_eq!(percentile(&values, 90.0).unwrap(), 3.7, epsilon = 1e-12);
        assert!(percentile(&[], 50.0).is_none());
    }

    #[test]
    fn histogram_last_bin_is_closed() {
        let h = histogram(&[0.0, 0.5, 1.0, 1.0], 2);
        assert_eq!(h.counts, vec![1, 3]);
        assert_eq!(h.edges, vec![0.0, 0.5, 1.0]);
        assert_eq!(h.peak(), Some(1));
    }

    #[test]
    fn histogram_of_constant() {
        let h = histogram(&[3.0, 3.0], 4);
        assert_eq!(h.edges.first(), Some(&2.5));
        assert_eq!(h.counts.iter().sum::<usize>(), 2);
    }
}
