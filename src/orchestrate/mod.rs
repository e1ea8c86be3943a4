//! Per-modality thresholding entry points
//!
//! Each run repairs and normalizes the connectivity matrix, picks a selector
//! from the request flags, assembles the graph with its overlays and
//! persists both the raw and the thresholded matrix.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cluster::metrics::{summarize, GraphSummary};
use crate::cluster::CommunityDetector;
use crate::config::{Config, ThresholdConfig};
use crate::graph::algorithms::component_count;
use crate::graph::{assemble, Overlay, ThresholdedGraph};
use crate::matrix::normalize::{binarize, normalize, standardize, thr2prob};
use crate::matrix::repair::{autofix, ensure_finite, fill_diagonal, is_symmetric, symmetrize};
use crate::matrix::{NodeSet, WeightedMatrix};
use crate::storage::naming::{est_path, raw_path};
use crate::storage::{FunctionalParams, MatrixStore, ModalityParams, RunMetadata, StructuralParams};
use crate::threshold::{select, ThresholdSpec};

/// Rescaling applied after repair and before selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    #[default]
    None,
    /// Divide by the largest magnitude
    Max,
    /// Min-max rescale into [0, 1]
    Standardize,
    /// Divide by the largest magnitude, then drop entries under `prob_epsilon`
    Probability,
}

/// One matrix to threshold, with the flags that pick the selector
#[derive(Debug, Clone)]
pub struct ThresholdRequest {
    pub conn_matrix: WeightedMatrix,

    /// Proportion or target density depending on the flags
    pub thr: f64,

    /// Treat `thr` as a target density
    pub dens_thresh: bool,

    /// Grow a spanning-forest backbone instead of ranking globally
    pub min_span_tree: bool,

    /// Keep only edges passing the disparity alpha cut
    pub disp_filt: bool,

    /// Disparity significance level; `disparity_alpha` from the config when unset
    pub alpha: Option<f64>,

    pub norm: Normalization,

    /// Binarize the final matrix
    pub binary: bool,

    pub nodes: NodeSet,
    pub meta: RunMetadata,
}

impl ThresholdRequest {
    /// Proportional request with every option off
    pub fn new(conn_matrix: WeightedMatrix, thr: f64, meta: RunMetadata) -> Self {
        Self {
            conn_matrix,
            thr,
            dens_thresh: false,
            min_span_tree: false,
            disp_filt: false,
            alpha: None,
            norm: Normalization::None,
            binary: false,
            nodes: NodeSet::default(),
            meta,
        }
    }

    /// Selector named by the flags. The spanning-tree flag wins over the
    /// disparity flag, which wins over the density flag.
    pub fn threshold_spec(&self, config: &ThresholdConfig) -> Result<ThresholdSpec> {
        let spec = match (self.min_span_tree, self.disp_filt, self.dens_thresh) {
            (true, _, true) => ThresholdSpec::mst_density(self.thr)?,
            (true, _, false) => ThresholdSpec::mst_proportional(self.thr)?,
            (false, true, _) => ThresholdSpec::disparity(self.alpha.unwrap_or(config.disparity_alpha))?,
            (false, false, true) => ThresholdSpec::density(self.thr)?,
            (false, false, false) => ThresholdSpec::proportional(self.thr)?,
        };
        Ok(spec)
    }
}

/// Where persisted matrices go and how communities are found
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub store: &'a dyn MatrixStore,
    pub detector: &'a dyn CommunityDetector,
}

/// Everything a thresholding run produces
#[derive(Debug, Clone)]
pub struct ThresholdOutcome {
    pub conn_matrix_thr: WeightedMatrix,

    /// Cutoff used, or the weakest retained weight for rank-based selectors.
    /// 0 when no edge survived.
    pub edge_threshold: f64,

    pub est_path: PathBuf,
    pub raw_path: PathBuf,
    pub thr_type: &'static str,
    pub thr: f64,

    /// Realized density of the final matrix
    pub density: f64,

    pub graph: ThresholdedGraph,
    pub summary: GraphSummary,
    pub meta: RunMetadata,
    pub modality: ModalityParams,
}

/// Serializable record of a run, written beside the thresholded matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub est_path: PathBuf,
    pub raw_path: PathBuf,
    pub thr_type: String,
    pub thr: f64,
    pub edge_threshold: f64,
    pub density: f64,
    pub spanning_edges_added: usize,
    pub community_status: String,
    pub summary: GraphSummary,
    pub meta: RunMetadata,
    pub modality: ModalityParams,
}

impl ThresholdOutcome {
    pub fn record(&self) -> RunRecord {
        let community_status = match &self.graph.communities {
            Overlay::Present(c) => format!("{} communities", c.community_count()),
            Overlay::NotRequested => "not requested".to_string(),
            Overlay::Failed(reason) => format!("failed: {}", reason),
        };
        RunRecord {
            est_path: self.est_path.clone(),
            raw_path: self.raw_path.clone(),
            thr_type: self.thr_type.to_string(),
            thr: self.thr,
            edge_threshold: self.edge_threshold,
            density: self.density,
            spanning_edges_added: self.graph.spanning_edges_added,
            community_status,
            summary: self.summary.clone(),
            meta: self.meta.clone(),
            modality: self.modality.clone(),
        }
    }

    /// Path of the JSON run record
    pub fn record_path(&self) -> PathBuf {
        self.est_path.with_extension("json")
    }
}

/// Threshold a functional connectivity matrix
pub fn thresh_func(
    request: ThresholdRequest,
    params: FunctionalParams,
    config: &Config,
    collaborators: Collaborators<'_>,
) -> Result<ThresholdOutcome> {
    run(request, ModalityParams::Functional(params), config, collaborators)
}

/// Threshold a structural (tractography) connectivity matrix
pub fn thresh_diff(
    request: ThresholdRequest,
    params: StructuralParams,
    config: &Config,
    collaborators: Collaborators<'_>,
) -> Result<ThresholdOutcome> {
    run(request, ModalityParams::Structural(params), config, collaborators)
}

fn run(
    request: ThresholdRequest,
    modality: ModalityParams,
    config: &Config,
    collaborators: Collaborators<'_>,
) -> Result<ThresholdOutcome> {
    let n = request.conn_matrix.node_count();
    request.nodes.validate(n)?;
    let spec = request.threshold_spec(&config.threshold)?;

    log::info!(
        "Thresholding {} {} matrix for {} ({} nodes) with {}={}",
        modality.tag(),
        request.meta.conn_model,
        request.meta.id,
        n,
        spec.thr_type(),
        request.thr
    );

    let prepared = prepare(&request.conn_matrix, request.norm, &config.threshold)?;
    if prepared.is_edge_free() {
        log::warn!("{}: connectivity matrix has no nonzero edges", request.meta.id);
    }

    let raw = raw_path(&request.meta, &modality);
    collaborators.store.save(&prepared, &raw)?;

    let selection = select(&prepared, &request.nodes, spec, &config.threshold)?;
    let (source, selected) = if request.binary {
        (binarize(&prepared), binarize(&selection.matrix))
    } else {
        (prepared, selection.matrix)
    };

    let graph = assemble(&source, &selected, &request.nodes, &config.assembly, collaborators.detector)?;
    let components = component_count(&graph.graph);
    if graph.graph.edge_count() > 0 && components > 1 {
        log::warn!(
            "{}: thresholded graph is fragmented into {} components",
            request.meta.id,
            components
        );
    }

    let est = est_path(&request.meta, &modality, spec.thr_type(), request.thr);
    collaborators.store.save(&graph.matrix, &est)?;
    log::info!("Saved thresholded matrix to {} (density {:.4})", est.display(), graph.density);

    let summary = summarize(&graph.graph, graph.communities.as_option());

    Ok(ThresholdOutcome {
        conn_matrix_thr: graph.matrix.clone(),
        edge_threshold: selection.cutoff.unwrap_or(0.0),
        est_path: est,
        raw_path: raw,
        thr_type: spec.thr_type(),
        thr: request.thr,
        density: graph.density,
        graph,
        summary,
        meta: request.meta,
        modality,
    })
}

/// Repair, symmetrize, zero the diagonal and rescale
fn prepare(matrix: &WeightedMatrix, norm: Normalization, config: &ThresholdConfig) -> Result<WeightedMatrix> {
    let mut clean = fill_diagonal(&autofix(matrix), 0.0);
    if !is_symmetric(&clean) {
        log::warn!("Connectivity matrix is not symmetric; averaging with its transpose");
        clean = symmetrize(&clean);
    }
    let prepared = match norm {
        Normalization::None => clean,
        Normalization::Max => normalize(&clean),
        Normalization::Standardize => fill_diagonal(&standardize(&clean), 0.0),
        Normalization::Probability => thr2prob(&normalize(&clean), config.prob_epsilon),
    };
    ensure_finite(&prepared)?;
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::detection::ConnectedComponents;
    use crate::storage::{MemoryStore, NodeType};
    use crate::threshold::est_density;

    fn meta() -> RunMetadata {
        RunMetadata {
            id: "997".to_string(),
            conn_model: "corr".to_string(),
            network: None,
            roi: None,
            node_type: NodeType::Parcellation,
            atlas: Some("whole_brain_cluster_labels_PCA200".to_string()),
            uatlas: None,
            dir_path: PathBuf::from("/tmp/997"),
        }
    }

    fn func_params() -> FunctionalParams {
        FunctionalParams {
            smooth: 0.0,
            hpass: None,
            c_boot: 0,
        }
    }

    fn graded(n: usize) -> WeightedMatrix {
        let mut m = WeightedMatrix::zeros(n);
        for i in 0..n {
            m.set(i, i, f64::NAN);
            for j in (i + 1)..n {
                let w = ((i * 7 + j * 13) % 23) as f64 / 23.0 + 0.01;
                m.set(i, j, w);
                m.set(j, i, w);
            }
        }
        m
    }

    fn collaborators(store: &MemoryStore) -> Collaborators<'_> {
        Collaborators {
            store,
            detector: &ConnectedComponents,
        }
    }

    #[test]
    fn flags_pick_the_selector() {
        let config = ThresholdConfig::default();
        let mut req = ThresholdRequest::new(graded(4), 0.3, meta());
        assert_eq!(req.threshold_spec(&config).unwrap().thr_type(), "prop");
        req.dens_thresh = true;
        assert_eq!(req.threshold_spec(&config).unwrap().thr_type(), "dens");
        req.disp_filt = true;
        assert_eq!(req.threshold_spec(&config).unwrap().thr_type(), "DISP_alpha");
        req.min_span_tree = true;
        assert_eq!(req.threshold_spec(&config).unwrap().thr_type(), "MSTdens");
        req.dens_thresh = false;
        assert_eq!(req.threshold_spec(&config).unwrap().thr_type(), "MSTprop");

        req.thr = 1.5;
        req.min_span_tree = false;
        req.dens_thresh = true;
        req.disp_filt = false;
        assert!(req.threshold_spec(&config).is_err());
    }

    #[test]
    fn disparity_alpha_falls_back_to_config() {
        let mut req = ThresholdRequest::new(graded(4), 0.3, meta());
        req.disp_filt = true;
        let config = ThresholdConfig::default();
        assert_eq!(
            req.threshold_spec(&config).unwrap(),
            ThresholdSpec::Disparity { alpha: 0.4 }
        );

        let strict = ThresholdConfig {
            disparity_alpha: 0.05,
            ..ThresholdConfig::default()
        };
        assert_eq!(
            req.threshold_spec(&strict).unwrap(),
            ThresholdSpec::Disparity { alpha: 0.05 }
        );

        req.alpha = Some(0.2);
        assert_eq!(
            req.threshold_spec(&strict).unwrap(),
            ThresholdSpec::Disparity { alpha: 0.2 }
        );

        let broken = ThresholdConfig {
            disparity_alpha: 1.5,
            ..ThresholdConfig::default()
        };
        req.alpha = None;
        assert!(req.threshold_spec(&broken).is_err());
    }

    #[test]
    fn disparity_run_uses_configured_alpha() {
        // hub 0 holds one dominant spoke, node 4 only touches the hub
        let m = WeightedMatrix::from_rows(&[
            vec![0.0, 10.0, 1.0, 1.0, 1.0],
            vec![10.0, 0.0, 1.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0, 1.0, 0.0],
            vec![1.0, 1.0, 1.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0, 0.0],
        ])
        .unwrap();
        let run_with = |alpha: f64| {
            let store = MemoryStore::new();
            let mut request = ThresholdRequest::new(m.clone(), 1.0, meta());
            request.disp_filt = true;
            let mut config = Config::default();
            config.threshold.disparity_alpha = alpha;
            thresh_func(request, func_params(), &config, collaborators(&store)).unwrap()
        };

        let loose = run_with(1.0);
        let strict = run_with(0.0);
        assert_eq!(loose.thr_type, "DISP_alpha");
        assert_eq!(loose.graph.graph.edge_count(), 7);
        assert!(strict.graph.graph.edge_count() < loose.graph.graph.edge_count());
        // degree-1 endpoint keeps its edge at any alpha
        assert_eq!(strict.conn_matrix_thr.get(0, 4), 1.0);
    }

    #[test]
    fn probability_norm_drops_noise_floor() {
        let m = WeightedMatrix::from_rows(&[
            vec![0.0, 1.0, 0.004, 0.5],
            vec![1.0, 0.0, 0.02, 0.0005],
            vec![0.004, 0.02, 0.0, 0.3],
            vec![0.5, 0.0005, 0.3, 0.0],
        ])
        .unwrap();
        let raw_with = |epsilon: f64| {
            let store = MemoryStore::new();
            let mut request = ThresholdRequest::new(m.clone(), 1.0, meta());
            request.norm = Normalization::Probability;
            let mut config = Config::default();
            config.threshold.prob_epsilon = epsilon;
            thresh_func(request, func_params(), &config, collaborators(&store)).unwrap();
            store.saved().unwrap()[0].1.clone()
        };

        let default = raw_with(1e-3);
        assert_eq!(default.get(1, 3), 0.0);
        assert_eq!(default.get(0, 2), 0.004);
        assert!(default.as_array().iter().all(|&v| v == 0.0 || v >= 1e-3));

        let coarse = raw_with(0.01);
        assert_eq!(coarse.get(0, 2), 0.0);
        assert_eq!(coarse.get(1, 2), 0.02);
        assert_eq!(coarse.off_diagonal_nonzero(), default.off_diagonal_nonzero() - 2);
    }

    #[test]
    fn functional_run_persists_raw_and_thresholded() {
        let store = MemoryStore::new();
        let request = ThresholdRequest::new(graded(10), 0.2, meta());
        let outcome = thresh_func(request, func_params(), &Config::default(), collaborators(&store)).unwrap();

        let saved = store.saved().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].0, outcome.raw_path);
        assert_eq!(saved[1].0, outcome.est_path);
        assert!(saved[0].1.as_array().iter().all(|v| v.is_finite()));

        // 45 pairs * 0.2 = 9 edges
        assert_eq!(outcome.graph.graph.edge_count(), 9);
        assert_eq!(outcome.density, est_density(&outcome.conn_matrix_thr));
        assert_eq!(outcome.thr_type, "prop");
        assert!(outcome.edge_threshold > 0.0);
        assert!(outcome.est_path.to_string_lossy().contains("_thrtype-prop_"));
        assert!(outcome.record_path().to_string_lossy().ends_with("thr-0.2.json"));
    }

    #[test]
    fn structural_density_run_binarized() {
        let store = MemoryStore::new();
        let mut request = ThresholdRequest::new(graded(12), 0.2, meta());
        request.dens_thresh = true;
        request.binary = true;
        request.norm = Normalization::Standardize;
        let params = StructuralParams {
            target_samples: 1000,
            track_type: "local".to_string(),
            directget: "det".to_string(),
            min_length: 10,
        };

        let outcome = thresh_diff(request, params, &Config::default(), collaborators(&store)).unwrap();
        assert!(outcome.density <= 0.2 + 1e-12);
        assert!(outcome
            .conn_matrix_thr
            .as_array()
            .iter()
            .all(|&v| v == 0.0 || v == 1.0));
        assert!(outcome.est_path.to_string_lossy().contains("modality-dwi"));
        assert_eq!(outcome.record().thr_type, "dens");
    }

    #[test]
    fn all_zero_input_is_not_an_error() {
        let store = MemoryStore::new();
        let request = ThresholdRequest::new(WeightedMatrix::zeros(5), 0.5, meta());
        let outcome = thresh_func(request, func_params(), &Config::default(), collaborators(&store)).unwrap();
        assert_eq!(outcome.density, 0.0);
        assert_eq!(outcome.graph.graph.edge_count(), 0);
        assert_eq!(outcome.graph.graph.node_count(), 5);
        assert_eq!(outcome.edge_threshold, 0.0);
        assert_eq!(outcome.record().edge_threshold, 0.0);
    }

    #[test]
    fn zero_proportion_reports_zero_threshold() {
        let store = MemoryStore::new();
        let request = ThresholdRequest::new(graded(6), 0.0, meta());
        let outcome = thresh_func(request, func_params(), &Config::default(), collaborators(&store)).unwrap();
        assert_eq!(outcome.graph.graph.edge_count(), 0);
        assert_eq!(outcome.edge_threshold, 0.0);
        assert_eq!(store.saved().unwrap().len(), 2);
    }

    #[test]
    fn asymmetric_input_is_symmetrized() {
        let store = MemoryStore::new();
        let m = WeightedMatrix::from_rows(&[
            vec![0.0, 0.8, 0.0],
            vec![0.4, 0.0, 0.2],
            vec![0.0, 0.2, 0.0],
        ])
        .unwrap();
        let request = ThresholdRequest::new(m, 1.0, meta());
        let outcome = thresh_func(request, func_params(), &Config::default(), collaborators(&store)).unwrap();
        let raw = &store.saved().unwrap()[0].1;
        assert!((raw.get(0, 1) - 0.6).abs() < 1e-12);
        assert_eq!(raw.get(0, 1), raw.get(1, 0));
        assert_eq!(outcome.graph.graph.edge_count(), 2);
    }

    #[test]
    fn label_mismatch_is_rejected() {
        let store = MemoryStore::new();
        let mut request = ThresholdRequest::new(graded(4), 0.5, meta());
        request.nodes = NodeSet::labelled(vec!["a".into(), "b".into()]);
        assert!(thresh_func(request, func_params(), &Config::default(), collaborators(&store)).is_err());
        assert!(store.saved().unwrap().is_empty());
    }

    #[test]
    fn spanning_tree_run_stays_connected() {
        let store = MemoryStore::new();
        let mut request = ThresholdRequest::new(graded(8), 0.1, meta());
        request.min_span_tree = true;
        let outcome = thresh_func(request, func_params(), &Config::default(), collaborators(&store)).unwrap();
        assert_eq!(outcome.thr_type, "MSTprop");
        assert_eq!(outcome.summary.component_count, 1);
        assert_eq!(outcome.graph.communities.as_option().map(|c| c.community_count()), Some(1));
    }
}
