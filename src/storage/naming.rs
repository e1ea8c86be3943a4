//! Derivative file naming for thresholded connectomes

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How nodes were defined
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeType {
    /// Coordinate-centred spheres of the given radius in mm
    Spheres(u32),
    /// Parcels of an atlas
    Parcellation,
}

/// Subject and model metadata carried through thresholding untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Subject identifier
    pub id: String,

    /// Connectivity estimator (corr, cov, sps, partcorr, ...)
    pub conn_model: String,

    /// Resting-state network restricting the nodes, if any
    pub network: Option<String>,

    /// Region-of-interest mask used to restrict nodes, if any
    pub roi: Option<PathBuf>,

    pub node_type: NodeType,

    /// Atlas name
    pub atlas: Option<String>,

    /// User-supplied atlas file
    pub uatlas: Option<PathBuf>,

    /// Subject derivative directory
    pub dir_path: PathBuf,
}

/// Functional-modality naming parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalParams {
    /// Smoothing kernel FWHM in mm (0 = none)
    pub smooth: f64,

    /// High-pass cutoff in Hz
    pub hpass: Option<f64>,

    /// Bootstrap iterations (0 = none)
    pub c_boot: u32,
}

/// Structural-modality naming parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralParams {
    /// Streamline samples requested from tractography
    pub target_samples: u64,

    /// Tracking algorithm (local, particle)
    pub track_type: String,

    /// Direction getter (det, clos, boot, prob)
    pub directget: String,

    /// Minimum fibre length in mm
    pub min_length: u32,
}

/// Modality-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModalityParams {
    Functional(FunctionalParams),
    Structural(StructuralParams),
}

impl ModalityParams {
    pub fn tag(&self) -> &'static str {
        match self {
            ModalityParams::Functional(_) => "func",
            ModalityParams::Structural(_) => "dwi",
        }
    }

    /// Modality tags that sit between the node type and the threshold
    fn suffix(&self) -> String {
        let mut out = String::new();
        match self {
            ModalityParams::Functional(p) => {
                if p.c_boot > 0 {
                    out.push_str(&format!("boot-{}iter_", p.c_boot));
                }
                if p.smooth > 0.0 {
                    out.push_str(&format!("smooth-{}fwhm_", p.smooth));
                }
                if let Some(hpass) = p.hpass {
                    out.push_str(&format!("hpass-{}Hz_", hpass));
                }
            }
            ModalityParams::Structural(p) => {
                if p.target_samples > 0 {
                    out.push_str(&format!("samples-{}streams_", p.target_samples));
                }
                out.push_str(&format!("tt-{}_dg-{}_ml-{}_", p.track_type, p.directget, p.min_length));
            }
        }
        out
    }
}

/// Directory holding graph derivatives of one subject
pub fn graphs_dir(meta: &RunMetadata) -> PathBuf {
    meta.dir_path.join("graphs")
}

/// Path of the thresholded matrix
pub fn est_path(meta: &RunMetadata, modality: &ModalityParams, thr_type: &str, thr: f64) -> PathBuf {
    let name = format!(
        "{}est-{}_thrtype-{}_{}{}thr-{}.npy",
        prefix(meta, modality),
        meta.conn_model,
        thr_type,
        node_type_tag(meta.node_type),
        modality.suffix(),
        thr
    );
    graphs_dir(meta).join(name)
}

/// Path of the repaired, unthresholded matrix
pub fn raw_path(meta: &RunMetadata, modality: &ModalityParams) -> PathBuf {
    let name = format!(
        "{}est-{}_{}{}raw.npy",
        prefix(meta, modality),
        meta.conn_model,
        node_type_tag(meta.node_type),
        modality.suffix()
    );
    graphs_dir(meta).join(name)
}

fn prefix(meta: &RunMetadata, modality: &ModalityParams) -> String {
    let mut out = format!("{}_modality-{}_", meta.id, modality.tag());
    if let Some(network) = &meta.network {
        out.push_str(&format!("rsn-{}_", network));
    }
    if let Some(roi) = meta.roi.as_deref().and_then(roi_stem) {
        out.push_str(&format!("roi-{}_", roi));
    }
    out
}

fn node_type_tag(node_type: NodeType) -> String {
    match node_type {
        NodeType::Spheres(mm) => format!("nodetype-spheres-{}mm_", mm),
        NodeType::Parcellation => "nodetype-parc_".to_string(),
    }
}

/// File name up to the first dot, so `mask.nii.gz` gives `mask`
fn roi_stem(roi: &Path) -> Option<String> {
    let name = roi.file_name()?.to_str()?;
    name.split('.').next().map(str::to_string)
}
