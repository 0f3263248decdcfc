//! Interval sampling and mapped-surface interpolation.
//!
//! Curves are sampled into parameter fractions first; four-sided surfaces
//! are then filled with a transfinite (Coons) patch between their boundary
//! node rows. Grading information lives entirely in the boundary samples,
//! so the interior follows whatever bias the curves carry.

use crate::geometry::Point;

/// Number of intervals that approximates `size`-long spans over `length`.
#[must_use]
pub fn uniform_interval_count(length: f64, size: f64) -> usize {
    ((length / size).round() as usize).max(1)
}

/// Evenly spaced parameter fractions, `intervals + 1` values covering
/// `[0, 1]`.
#[must_use]
pub fn uniform_params(intervals: usize) -> Vec<f64> {
    let n = intervals.max(1);
    (0..=n).map(|i| i as f64 / n as f64).collect()
}

/// Geometrically graded parameter fractions from a fine interval size to a
/// coarse one over a curve of the given length.
///
/// The first interval is close to `fine` and the last close to `coarse`;
/// `reversed` puts the fine end at parameter one instead of zero.
#[must_use]
pub fn bias_params(length: f64, fine: f64, coarse: f64, reversed: bool) -> Vec<f64> {
    let mean = 0.5 * (fine + coarse);
    let intervals = uniform_interval_count(length, mean);
    if intervals == 1 || (coarse - fine).abs() < f64::EPSILON * mean {
        return uniform_params(intervals);
    }
    let ratio = (coarse / fine).powf(1.0 / (intervals as f64 - 1.0));
    let mut weights = Vec::with_capacity(intervals);
    let mut weight = 1.0;
    for _ in 0..intervals {
        weights.push(weight);
        weight *= ratio;
    }
    if reversed {
        weights.reverse();
    }
    let total: f64 = weights.iter().sum();
    let mut params = Vec::with_capacity(intervals + 1);
    let mut accumulated = 0.0;
    params.push(0.0);
    for weight in &weights[..intervals - 1] {
        accumulated += weight / total;
        params.push(accumulated);
    }
    params.push(1.0);
    params
}

/// Normalized chord-length fractions along a row of points.
fn chord_params(row: &[Point]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(row.len());
    let mut accumulated = 0.0;
    distances.push(0.0);
    for pair in row.windows(2) {
        accumulated += (pair[1].to_vector() - pair[0].to_vector()).norm();
        distances.push(accumulated);
    }
    if accumulated <= f64::EPSILON {
        return uniform_params(row.len().saturating_sub(1).max(1));
    }
    distances.into_iter().map(|d| d / accumulated).collect()
}

/// Fill a four-sided patch with a Coons interpolation of its boundary rows.
///
/// `bottom` and `top` run in the same direction and share their lengths with
/// each other; `left` and `right` likewise. Corner points must coincide with
/// the row endpoints. The returned grid is indexed `[j][i]` with `j` along
/// the left/right rows, boundaries included.
///
/// # Panics
///
/// Panics when the row lengths are inconsistent; callers validate interval
/// counts before interpolating.
#[must_use]
pub fn coons_grid(
    bottom: &[Point],
    right: &[Point],
    top: &[Point],
    left: &[Point],
) -> Vec<Vec<Point>> {
    let m = bottom.len() - 1;
    let n = left.len() - 1;
    assert_eq!(top.len(), m + 1, "top and bottom rows must match");
    assert_eq!(right.len(), n + 1, "left and right rows must match");

    // Blend the opposing boundary gradings so interior spacing follows both.
    let s_bottom = chord_params(bottom);
    let s_top = chord_params(top);
    let t_left = chord_params(left);
    let t_right = chord_params(right);

    let c00 = bottom[0].to_vector();
    let c10 = bottom[m].to_vector();
    let c01 = top[0].to_vector();
    let c11 = top[m].to_vector();

    let mut grid = vec![vec![Point::new(0.0, 0.0, 0.0); m + 1]; n + 1];
    for (i, point) in bottom.iter().enumerate() {
        grid[0][i] = *point;
    }
    for (i, point) in top.iter().enumerate() {
        grid[n][i] = *point;
    }
    for (j, point) in left.iter().enumerate() {
        grid[j][0] = *point;
    }
    for (j, point) in right.iter().enumerate() {
        grid[j][m] = *point;
    }

    for j in 1..n {
        for i in 1..m {
            let t_mid = 0.5 * (t_left[j] + t_right[j]);
            let s = (1.0 - t_mid) * s_bottom[i] + t_mid * s_top[i];
            let t = (1.0 - s) * t_left[j] + s * t_right[j];
            let ruled = (1.0 - t) * bottom[i].to_vector()
                + t * top[i].to_vector()
                + (1.0 - s) * left[j].to_vector()
                + s * right[j].to_vector();
            let correction = (1.0 - s) * (1.0 - t) * c00
                + s * (1.0 - t) * c10
                + s * t * c11
                + (1.0 - s) * t * c01;
            grid[j][i] = Point::from(ruled - correction);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_counts_round_to_nearest() {
        assert_eq!(uniform_interval_count(20.0, 0.1), 200);
        assert_eq!(uniform_interval_count(2.0, 0.1), 20);
        assert_eq!(uniform_interval_count(0.2, 2.0), 1);
    }

    #[test]
    fn uniform_params_cover_unit_range() {
        let params = uniform_params(4);
        assert_eq!(params, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn bias_params_grade_from_fine_to_coarse() {
        let params = bias_params(1.0, 0.02, 0.1, false);
        assert_eq!(*params.first().expect("non-empty"), 0.0);
        assert_eq!(*params.last().expect("non-empty"), 1.0);
        let first = params[1] - params[0];
        let last = params[params.len() - 1] - params[params.len() - 2];
        assert!(first < last, "intervals must grow away from the fine end");

        let reversed = bias_params(1.0, 0.02, 0.1, true);
        let first = reversed[1] - reversed[0];
        let last = reversed[reversed.len() - 1] - reversed[reversed.len() - 2];
        assert!(first > last, "reversed grading shrinks toward the end");
    }

    #[test]
    fn bias_with_equal_sizes_is_uniform() {
        let params = bias_params(1.0, 0.1, 0.1, false);
        let expected = uniform_params(10);
        for (value, reference) in params.iter().zip(&expected) {
            assert_relative_eq!(value, reference, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn coons_grid_reproduces_a_straight_rectangle() {
        let bottom: Vec<_> = (0..=4).map(|i| point(i as f64, 0.0, 0.0)).collect();
        let top: Vec<_> = (0..=4).map(|i| point(i as f64, 2.0, 0.0)).collect();
        let left: Vec<_> = (0..=2).map(|j| point(0.0, j as f64, 0.0)).collect();
        let right: Vec<_> = (0..=2).map(|j| point(4.0, j as f64, 0.0)).collect();

        let grid = coons_grid(&bottom, &right, &top, &left);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0].len(), 5);
        assert_relative_eq!(grid[1][2].x, 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(grid[1][2].y, 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn coons_grid_follows_boundary_grading() {
        // Bottom row graded toward x = 0; the interior row must inherit it.
        let bottom = vec![
            point(0.0, 0.0, 0.0),
            point(0.1, 0.0, 0.0),
            point(0.3, 0.0, 0.0),
            point(1.0, 0.0, 0.0),
        ];
        let top = vec![
            point(0.0, 1.0, 0.0),
            point(0.1, 1.0, 0.0),
            point(0.3, 1.0, 0.0),
            point(1.0, 1.0, 0.0),
        ];
        let left = vec![point(0.0, 0.0, 0.0), point(0.0, 0.5, 0.0), point(0.0, 1.0, 0.0)];
        let right = vec![point(1.0, 0.0, 0.0), point(1.0, 0.5, 0.0), point(1.0, 1.0, 0.0)];

        let grid = coons_grid(&bottom, &right, &top, &left);
        assert_relative_eq!(grid[1][1].x, 0.1, epsilon = 1.0e-9);
        assert_relative_eq!(grid[1][2].x, 0.3, epsilon = 1.0e-9);
    }
}
