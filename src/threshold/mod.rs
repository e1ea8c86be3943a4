//! Edge selection strategies for sparsifying connectivity matrices
//!
//! Every selector takes a repaired matrix and returns a new one; the input is
//! never modified. [`select`] dispatches on a [`ThresholdSpec`].

pub mod backbone;
pub mod density;
pub mod disparity;
pub mod knn;
pub mod proportional;

pub use backbone::{local_thresholding_mst_dens, local_thresholding_mst_prop};
pub use density::{density_search, density_thresholding, est_density, threshold_absolute, DensitySearch};
pub use disparity::{disparity_filter, disparity_filter_alpha_cut};
pub use knn::knn;
pub use proportional::{local_thresholding_prop, threshold_proportional};

use crate::config::ThresholdConfig;
use crate::error::{ThresholdError, ThresholdResult};
use crate::graph::GraphBuilder;
use crate::matrix::{NodeSet, WeightedMatrix};
use serde::{Deserialize, Serialize};

/// Which edges survive, and the parameter that decides it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum ThresholdSpec {
    /// Keep the strongest `proportion` of all node pairs
    Proportional { proportion: f64 },
    /// Keep entries at or above `cutoff`
    Absolute { cutoff: f64 },
    /// Search an absolute cutoff whose density reaches `target`
    Density { target: f64 },
    /// Keep each node's `k` strongest neighbours
    Knn { k: usize },
    /// Keep edges whose disparity significance is at most `alpha`
    Disparity { alpha: f64 },
    /// Keep the strongest `proportion` of each node's own edges
    LocalProportional { proportion: f64 },
    /// Spanning-forest backbone grown to `proportion` of all node pairs
    MstProportional { proportion: f64 },
    /// Spanning-forest backbone grown to density `target`
    MstDensity { target: f64 },
}

impl ThresholdSpec {
    pub fn proportional(proportion: f64) -> ThresholdResult<Self> {
        Ok(Self::Proportional { proportion: clamp_unit("proportion", proportion)? })
    }

    pub fn absolute(cutoff: f64) -> ThresholdResult<Self> {
        if !cutoff.is_finite() {
            return Err(ThresholdError::InvalidParameter { name: "cutoff", value: cutoff });
        }
        Ok(Self::Absolute { cutoff })
    }

    pub fn density(target: f64) -> ThresholdResult<Self> {
        Ok(Self::Density { target: check_open_unit("target density", target)? })
    }

    pub fn knn(k: usize) -> ThresholdResult<Self> {
        if k == 0 {
            return Err(ThresholdError::InvalidParameter { name: "k", value: 0.0 });
        }
        Ok(Self::Knn { k })
    }

    pub fn disparity(alpha: f64) -> ThresholdResult<Self> {
        Ok(Self::Disparity { alpha: check_unit("alpha", alpha)? })
    }

    pub fn local_proportional(proportion: f64) -> ThresholdResult<Self> {
        Ok(Self::LocalProportional { proportion: clamp_unit("proportion", proportion)? })
    }

    pub fn mst_proportional(proportion: f64) -> ThresholdResult<Self> {
        Ok(Self::MstProportional { proportion: clamp_unit("proportion", proportion)? })
    }

    pub fn mst_density(target: f64) -> ThresholdResult<Self> {
        Ok(Self::MstDensity { target: check_open_unit("target density", target)? })
    }

    /// Re-check parameters of a spec built without the constructors
    pub fn validate(self) -> ThresholdResult<Self> {
        match self {
            Self::Proportional { proportion } => Self::proportional(proportion),
            Self::Absolute { cutoff } => Self::absolute(cutoff),
            Self::Density { target } => Self::density(target),
            Self::Knn { k } => Self::knn(k),
            Self::Disparity { alpha } => Self::disparity(alpha),
            Self::LocalProportional { proportion } => Self::local_proportional(proportion),
            Self::MstProportional { proportion } => Self::mst_proportional(proportion),
            Self::MstDensity { target } => Self::mst_density(target),
        }
    }

    /// Short tag used in derivative file names
    pub fn thr_type(&self) -> &'static str {
        match self {
            Self::Proportional { .. } => "prop",
            Self::Absolute { .. } => "abs",
            Self::Density { .. } => "dens",
            Self::Knn { .. } => "knn",
            Self::Disparity { .. } => "DISP_alpha",
            Self::LocalProportional { .. } => "localprop",
            Self::MstProportional { .. } => "MSTprop",
            Self::MstDensity { .. } => "MSTdens",
        }
    }
}

/// Result of running one selector
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Thresholded matrix
    pub matrix: WeightedMatrix,

    /// Effective edge threshold: the cutoff used, or the weakest retained
    /// weight when the selector is rank based. `None` when nothing survived.
    pub cutoff: Option<f64>,

    pub spec: ThresholdSpec,
}

/// Run the selector named by `spec` over `matrix`
pub fn select(
    matrix: &WeightedMatrix,
    nodes: &NodeSet,
    spec: ThresholdSpec,
    config: &ThresholdConfig,
) -> ThresholdResult<Selection> {
    let spec = spec.validate()?;
    log::debug!("Selecting edges with {:?}", spec);

    let (thresholded, cutoff) = match spec {
        ThresholdSpec::Proportional { proportion } => {
            let m = threshold_proportional(matrix, proportion);
            let cutoff = weakest_edge(&m);
            (m, cutoff)
        }
        ThresholdSpec::Absolute { cutoff } => (threshold_absolute(matrix, cutoff), Some(cutoff)),
        ThresholdSpec::Density { target } => {
            let search = density_search(matrix, target, config)?;
            let cutoff = search.cutoff.or_else(|| weakest_edge(&search.matrix));
            (search.matrix, cutoff)
        }
        ThresholdSpec::Knn { k } => {
            let graph = knn(matrix, k);
            let m = matrix.retain(|i, j, _| graph.has_edge(i, j));
            let cutoff = weakest_edge(&m);
            (m, cutoff)
        }
        ThresholdSpec::Disparity { alpha } => {
            let magnitude = GraphBuilder::from_matrix(&matrix.map(f64::abs));
            let kept = disparity_filter_alpha_cut(&magnitude, alpha)?;
            log::info!(
                "Disparity filter at alpha = {}: {} of {} edges kept",
                alpha,
                kept.edge_count(),
                magnitude.edge_count()
            );
            let m = matrix.retain(|i, j, _| kept.has_edge(i, j));
            let cutoff = weakest_edge(&m);
            (m, cutoff)
        }
        ThresholdSpec::LocalProportional { proportion } => {
            let m = local_thresholding_prop(matrix, nodes, proportion)?;
            let cutoff = weakest_edge(&m);
            (m, cutoff)
        }
        ThresholdSpec::MstProportional { proportion } => {
            let m = local_thresholding_mst_prop(matrix, proportion, config);
            let cutoff = weakest_edge(&m);
            (m, cutoff)
        }
        ThresholdSpec::MstDensity { target } => {
            let m = local_thresholding_mst_dens(matrix, target, config)?;
            let cutoff = weakest_edge(&m);
            (m, cutoff)
        }
    };

    Ok(Selection {
        matrix: thresholded,
        cutoff,
        spec,
    })
}

/// Smallest nonzero off-diagonal magnitude
pub fn weakest_edge(matrix: &WeightedMatrix) -> Option<f64> {
    matrix
        .as_array()
        .indexed_iter()
        .filter(|&((i, j), &v)| i != j && v != 0.0 && v.is_finite())
        .map(|(_, &v)| v.abs())
        .reduce(f64::min)
}

fn clamp_unit(name: &'static str, value: f64) -> ThresholdResult<f64> {
    if value.is_nan() {
        return Err(ThresholdError::InvalidParameter { name, value });
    }
    Ok(value.clamp(0.0, 1.0))
}

fn check_unit(name: &'static str, value: f64) -> ThresholdResult<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ThresholdError::InvalidParameter { name, value });
    }
    Ok(value)
}

/// Strictly between 0 and 1
fn check_open_unit(name: &'static str, value: f64) -> ThresholdResult<f64> {
    if !(value > 0.0 && value < 1.0) {
        return Err(ThresholdError::InvalidParameter { name, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> WeightedMatrix {
        // 4-cycle with one chord
        WeightedMatrix::from_rows(&[
            vec![0.0, 0.9, 0.3, 0.6],
            vec![0.9, 0.0, 0.2, 0.0],
            vec![0.3, 0.2, 0.0, 0.8],
            vec![0.6, 0.0, 0.8, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn constructors_validate() {
        assert_eq!(
            ThresholdSpec::proportional(1.7).unwrap(),
            ThresholdSpec::Proportional { proportion: 1.0 }
        );
        assert!(ThresholdSpec::proportional(f64::NAN).is_err());
        assert!(ThresholdSpec::density(1.5).is_err());
        assert!(ThresholdSpec::knn(0).is_err());
        assert!(ThresholdSpec::disparity(-0.1).is_err());
        assert!(ThresholdSpec::absolute(f64::INFINITY).is_err());
        assert!(ThresholdSpec::Density { target: -1.0 }.validate().is_err());
    }

    #[test]
    fn density_targets_exclude_endpoints() {
        for target in [0.0, 1.0, f64::NAN] {
            assert!(ThresholdSpec::density(target).is_err(), "accepted {}", target);
            assert!(ThresholdSpec::mst_density(target).is_err(), "accepted {}", target);
            assert!(ThresholdSpec::MstDensity { target }.validate().is_err());
        }
        assert_eq!(ThresholdSpec::density(0.2).unwrap(), ThresholdSpec::Density { target: 0.2 });
        assert!(ThresholdSpec::mst_density(0.999).is_ok());
        // alpha keeps its closed range
        assert!(ThresholdSpec::disparity(1.0).is_ok());
    }

    #[test]
    fn absolute_selection_drops_self_loops() {
        let config = ThresholdConfig::default();
        let mut m = ring();
        for i in 0..4 {
            m.set(i, i, 1.0);
        }
        let spec = ThresholdSpec::Absolute { cutoff: 0.5 };
        let selection = select(&m, &NodeSet::default(), spec, &config).unwrap();
        for i in 0..4 {
            assert_eq!(selection.matrix.get(i, i), 0.0);
        }
        // 0.9, 0.8, 0.6 in both triangles
        assert_eq!(selection.matrix.off_diagonal_nonzero(), 6);
        assert_eq!(selection.cutoff, Some(0.5));
    }

    #[test]
    fn every_strategy_selects_a_subset() {
        let config = ThresholdConfig::default();
        let m = ring();
        let specs = [
            ThresholdSpec::Proportional { proportion: 0.5 },
            ThresholdSpec::Absolute { cutoff: 0.5 },
            ThresholdSpec::Density { target: 0.5 },
            ThresholdSpec::Knn { k: 1 },
            ThresholdSpec::Disparity { alpha: 0.5 },
            ThresholdSpec::LocalProportional { proportion: 0.5 },
            ThresholdSpec::MstProportional { proportion: 0.5 },
            ThresholdSpec::MstDensity { target: 0.5 },
        ];

        for spec in specs {
            let selection = select(&m, &NodeSet::default(), spec, &config).unwrap();
            assert!(selection.matrix.off_diagonal_nonzero() <= m.off_diagonal_nonzero());
            for ((i, j), &v) in selection.matrix.as_array().indexed_iter() {
                assert!(v == 0.0 || v == m.get(i, j), "{:?} invented a weight", spec);
            }
        }
    }

    #[test]
    fn proportional_selection_reports_weakest_kept_edge() {
        let config = ThresholdConfig::default();
        let spec = ThresholdSpec::Proportional { proportion: 0.5 };
        let selection = select(&ring(), &NodeSet::default(), spec, &config).unwrap();
        // 6 pairs * 0.5 = 3 strongest: 0.9, 0.8, 0.6
        assert_eq!(selection.cutoff, Some(0.6));
        assert_eq!(spec.thr_type(), "prop");
    }

    #[test]
    fn empty_selection_has_no_cutoff() {
        let config = ThresholdConfig::default();
        let spec = ThresholdSpec::Proportional { proportion: 0.0 };
        let selection = select(&ring(), &NodeSet::default(), spec, &config).unwrap();
        assert!(selection.matrix.is_edge_free());
        assert_eq!(selection.cutoff, None);
    }
}
