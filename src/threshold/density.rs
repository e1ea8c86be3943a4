//! Absolute cutoffs and the density-target search built on them

use crate::config::ThresholdConfig;
use crate::error::{ThresholdError, ThresholdResult};
use crate::matrix::repair::fill_diagonal;
use crate::matrix::WeightedMatrix;

/// Zero the diagonal, then every entry strictly below `cutoff` (and every NaN)
pub fn threshold_absolute(matrix: &WeightedMatrix, cutoff: f64) -> WeightedMatrix {
    fill_diagonal(matrix, 0.0).retain(|_, _, v| v >= cutoff)
}

/// Nonzero off-diagonal entries over `N * (N - 1)`.
///
/// For a symmetric matrix this is the undirected edge density.
pub fn est_density(matrix: &WeightedMatrix) -> f64 {
    let n = matrix.node_count();
    if n < 2 {
        return 0.0;
    }
    matrix.off_diagonal_nonzero() as f64 / (n * (n - 1)) as f64
}

/// Outcome of a density-target search
#[derive(Debug, Clone, PartialEq)]
pub struct DensitySearch {
    pub matrix: WeightedMatrix,

    /// Absolute cutoff applied, `None` when the input already met the target
    pub cutoff: Option<f64>,

    /// Realized density of `matrix`
    pub density: f64,

    pub iterations: usize,

    /// False when the iteration cap was hit before reaching the target
    pub converged: bool,
}

/// Raise an absolute cutoff in steps of `density_interval` until the
/// realized density no longer exceeds `target`.
///
/// The diagonal is zeroed first. Input already at or below the target is
/// returned as is. If `density_max_iters` runs out, the candidate closest to
/// the target is returned and a warning logged.
pub fn density_search(
    matrix: &WeightedMatrix,
    target: f64,
    config: &ThresholdConfig,
) -> ThresholdResult<DensitySearch> {
    if !(0.0..=1.0).contains(&target) {
        return Err(ThresholdError::InvalidParameter { name: "target density", value: target });
    }
    if !(config.density_interval > 0.0) {
        return Err(ThresholdError::InvalidParameter {
            name: "density interval",
            value: config.density_interval,
        });
    }

    let base = fill_diagonal(matrix, 0.0);
    let n = base.node_count();
    let initial = est_density(&base);
    if initial <= target {
        log::info!(
            "Density {:.6} already at or below target {}",
            initial,
            target
        );
        return Ok(DensitySearch {
            matrix: base,
            cutoff: None,
            density: initial,
            iterations: 0,
            converged: true,
        });
    }

    // Surviving entries at cutoff t are those >= t, so counting against the
    // sorted weights gives each candidate density without rebuilding it.
    let mut weights: Vec<f64> = base
        .as_array()
        .iter()
        .copied()
        .filter(|v| *v != 0.0 && !v.is_nan())
        .collect();
    weights.sort_by(f64::total_cmp);
    let possible = (n * (n - 1)) as f64;
    let density_at = |cutoff: f64| {
        let below = weights.partition_point(|&v| v < cutoff);
        (weights.len() - below) as f64 / possible
    };

    let mut work_thr = 0.0;
    let mut best: Option<(f64, f64, usize)> = None;
    for iteration in 1..=config.density_max_iters {
        work_thr += config.density_interval;
        let density = density_at(work_thr);

        if density <= target {
            log::info!(
                "Reached density {:.6} (target {}) at cutoff {:.4} after {} iterations",
                density,
                target,
                work_thr,
                iteration
            );
            return Ok(DensitySearch {
                matrix: threshold_absolute(&base, work_thr),
                cutoff: Some(work_thr),
                density,
                iterations: iteration,
                converged: true,
            });
        }

        let gap = density - target;
        if best.map_or(true, |(best_gap, _, _)| gap < best_gap) {
            best = Some((gap, work_thr, iteration));
        }
    }

    log::warn!(
        "Density search hit {} iterations without reaching target {}; using closest candidate",
        config.density_max_iters,
        target
    );

    Ok(match best {
        Some((_, cutoff, _)) => {
            let candidate = threshold_absolute(&base, cutoff);
            DensitySearch {
                density: est_density(&candidate),
                matrix: candidate,
                cutoff: Some(cutoff),
                iterations: config.density_max_iters,
                converged: false,
            }
        }
        None => DensitySearch {
            matrix: base,
            cutoff: None,
            density: initial,
            iterations: 0,
            converged: false,
        },
    })
}

/// Density-target thresholding, returning only the matrix
pub fn density_thresholding(
    matrix: &WeightedMatrix,
    target: f64,
    config: &ThresholdConfig,
) -> ThresholdResult<WeightedMatrix> {
    density_search(matrix, target, config).map(|search| search.matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 5 nodes, upper weights 0.05, 0.15, ..., 0.95 in row-major order
    fn ladder() -> WeightedMatrix {
        let mut m = WeightedMatrix::zeros(5);
        let mut k = 0;
        for i in 0..5 {
            for j in (i + 1)..5 {
                let w = 0.05 + 0.1 * k as f64;
                m.set(i, j, w);
                m.set(j, i, w);
                k += 1;
            }
        }
        m
    }

    #[test]
    fn absolute_keeps_equal_entries() {
        let m = WeightedMatrix::from_rows(&[vec![0.0, 0.5], vec![0.4, f64::NAN]]).unwrap();
        let t = threshold_absolute(&m, 0.5);
        assert_eq!(t.get(0, 1), 0.5);
        assert_eq!(t.get(1, 0), 0.0);
        assert_eq!(t.get(1, 1), 0.0);
    }

    #[test]
    fn absolute_clears_unit_diagonal() {
        let m = WeightedMatrix::from_rows(&[
            vec![1.0, 0.6, 0.2],
            vec![0.6, 1.0, 0.3],
            vec![0.2, 0.3, 1.0],
        ])
        .unwrap();
        let t = threshold_absolute(&m, 0.5);
        for i in 0..3 {
            assert_eq!(t.get(i, i), 0.0);
        }
        assert_eq!(t.get(0, 1), 0.6);
        assert_eq!(t.get(1, 0), 0.6);
        assert_eq!(crate::matrix::normalize::binarize(&t).sum(), 2.0);
    }

    #[test]
    fn density_counts_off_diagonal_only() {
        let mut m = ladder();
        assert_eq!(est_density(&m), 1.0);
        m.set(0, 0, 3.0);
        assert_eq!(est_density(&m), 1.0);
        assert_eq!(est_density(&WeightedMatrix::zeros(4)), 0.0);
        assert_eq!(est_density(&WeightedMatrix::zeros(1)), 0.0);
    }

    #[test]
    fn search_stops_at_first_density_not_above_target() {
        let config = ThresholdConfig::default();

        let low = density_search(&ladder(), 0.3, &config).unwrap();
        assert!(low.converged);
        assert_eq!(low.density, 0.3);
        assert_eq!(est_density(&low.matrix), 0.3);
        let cutoff = low.cutoff.unwrap();
        assert!(cutoff > 0.55 && cutoff <= 0.75);

        let high = density_search(&ladder(), 0.45, &config).unwrap();
        assert_eq!(est_density(&high.matrix), 0.4);
    }

    #[test]
    fn dense_enough_input_is_returned() {
        let config = ThresholdConfig::default();
        let sparse = WeightedMatrix::from_rows(&[
            vec![1.0, 0.2, 0.0],
            vec![0.2, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let search = density_search(&sparse, 0.5, &config).unwrap();
        assert_eq!(search.cutoff, None);
        assert_eq!(search.matrix.get(0, 0), 0.0);
        assert_eq!(search.matrix.get(0, 1), 0.2);
    }

    #[test]
    fn exhausted_search_returns_closest_candidate() {
        let config = ThresholdConfig {
            density_max_iters: 3,
            ..ThresholdConfig::default()
        };
        let search = density_search(&ladder(), 0.1, &config).unwrap();
        assert!(!search.converged);
        assert_eq!(search.iterations, 3);
        // 0.03 cutoff still keeps every edge
        assert_eq!(search.density, 1.0);
        assert!(search.cutoff.is_some());
    }

    #[test]
    fn rejects_bad_parameters() {
        let config = ThresholdConfig::default();
        assert!(density_thresholding(&ladder(), 1.2, &config).is_err());

        let stuck = ThresholdConfig {
            density_interval: 0.0,
            ..ThresholdConfig::default()
        };
        assert!(density_thresholding(&ladder(), 0.2, &stuck).is_err());
    }
}
