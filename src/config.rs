//! Configuration management for connectome thresholding

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Top-level configuration, passed explicitly to every entry point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Selector constants
    pub threshold: ThresholdConfig,

    /// Graph assembly overlays
    pub assembly: AssemblyConfig,

    /// Plotting collaborator settings
    pub plot: PlotConfig,
}

/// Numeric constants used by the threshold selectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Entries below this value are dropped by `thr2prob`
    pub prob_epsilon: f64,

    /// Step by which the density search raises its absolute cutoff
    pub density_interval: f64,

    /// Upper bound on density search iterations
    pub density_max_iters: usize,

    /// Default significance level for the disparity alpha cut
    pub disparity_alpha: f64,

    /// Number of stalled growth rounds tolerated by the MST backbone
    pub backbone_fail_tol: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            prob_epsilon: 1e-3,
            density_interval: 0.01,
            density_max_iters: 10_000,
            disparity_alpha: 0.4,
            backbone_fail_tol: 100,
        }
    }
}

/// Which overlays the graph assembler computes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Force-include maximum spanning forest edges of the source matrix
    pub mst_overlay: bool,

    /// Attach disparity significance values to the assembled graph
    pub disparity_overlay: bool,

    /// Run the community detector over the assembled graph
    pub detect_communities: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            mst_overlay: false,
            disparity_overlay: false,
            detect_communities: true,
        }
    }
}

/// Settings handed to the plotting collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Write plot inputs next to the thresholded matrix
    pub enabled: bool,

    /// Colour scheme name for functional adjacency plots
    pub functional_color_theme: String,

    /// Colour scheme name for structural adjacency plots
    pub structural_color_theme: String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            functional_color_theme: "Blues".to_string(),
            structural_color_theme: "Reds".to_string(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading configuration from {}", path.display());

        let reader = BufReader::new(File::open(path)?);
        let config = serde_json::from_reader(reader)?;

        Ok(config)
    }
}
