use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use connectome_thresh::cluster::detection::ConnectedComponents;
use connectome_thresh::config::Config;
use connectome_thresh::matrix::NodeSet;
use connectome_thresh::orchestrate::{
    thresh_diff, thresh_func, Collaborators, Normalization, ThresholdOutcome, ThresholdRequest,
};
use connectome_thresh::storage::{
    load_labels, load_matrix, save_json, FunctionalParams, NodeType, NpyStore, RunMetadata, StructuralParams,
};
use connectome_thresh::viz;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Modality {
    Func,
    Dwi,
}

#[derive(Parser, Debug)]
#[clap(
    name = "connectome-thresh",
    about = "Threshold weighted brain connectivity matrices into analysable graphs"
)]
struct Cli {
    /// Connectivity matrices (.npy, or whitespace/comma-delimited text)
    #[clap(required = true)]
    inputs: Vec<PathBuf>,

    /// Connectivity modality
    #[clap(long, value_enum, default_value = "func")]
    modality: Modality,

    /// Proportion or target density, depending on the mode flags
    #[clap(long, default_value = "1.0")]
    thr: f64,

    /// Treat --thr as a target density
    #[clap(long)]
    dens_thresh: bool,

    /// Grow a maximum spanning forest backbone
    #[clap(long)]
    min_span_tree: bool,

    /// Keep only edges that pass the disparity filter
    #[clap(long)]
    disp_filt: bool,

    /// Disparity filter significance level (config `disparity_alpha` when omitted)
    #[clap(long)]
    alpha: Option<f64>,

    /// Rescaling applied before thresholding
    #[clap(long, value_enum, default_value = "none")]
    norm: Normalization,

    /// Binarize the thresholded matrix
    #[clap(long)]
    binary: bool,

    /// Subject identifier (defaults to each input's file stem)
    #[clap(long)]
    id: Option<String>,

    /// Connectivity estimator that produced the matrices
    #[clap(long, default_value = "corr")]
    conn_model: String,

    /// Resting-state network the nodes belong to
    #[clap(long)]
    network: Option<String>,

    /// Region-of-interest mask the nodes were restricted to
    #[clap(long)]
    roi: Option<PathBuf>,

    /// Sphere radius in mm when nodes are coordinate spheres (parcels otherwise)
    #[clap(long)]
    node_size: Option<u32>,

    /// Atlas name
    #[clap(long)]
    atlas: Option<String>,

    /// Node labels, one per line
    #[clap(long)]
    labels: Option<PathBuf>,

    /// Smoothing FWHM in mm (func)
    #[clap(long, default_value = "0")]
    smooth: f64,

    /// High-pass cutoff in Hz (func)
    #[clap(long)]
    hpass: Option<f64>,

    /// Bootstrap iterations (func)
    #[clap(long, default_value = "0")]
    c_boot: u32,

    /// Streamline samples (dwi)
    #[clap(long, default_value = "0")]
    target_samples: u64,

    /// Tracking algorithm (dwi)
    #[clap(long, default_value = "local")]
    track_type: String,

    /// Direction getter (dwi)
    #[clap(long, default_value = "det")]
    directget: String,

    /// Minimum fibre length in mm (dwi)
    #[clap(long, default_value = "0")]
    min_length: u32,

    /// Output directory for derivatives
    #[clap(long, default_value = "connectome_results")]
    output_dir: PathBuf,

    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Skip plot input export
    #[clap(long)]
    skip_viz: bool,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    let labels = args.labels.as_ref().map(load_labels).transpose()?;

    log::info!("Thresholding {} matrices into {}", args.inputs.len(), args.output_dir.display());

    // Threshold every input in parallel
    let results: Vec<(PathBuf, Result<ThresholdOutcome>)> = args
        .inputs
        .par_iter()
        .map(|input| (input.clone(), process(input, &args, &config, labels.as_ref())))
        .collect();

    // Report results
    let mut failures = 0;
    for (input, result) in &results {
        match result {
            Ok(outcome) => log::info!(
                "{}: {} edges, density {:.4} -> {}",
                input.display(),
                outcome.summary.edge_count,
                outcome.density,
                outcome.est_path.display()
            ),
            Err(e) => {
                failures += 1;
                log::error!("{}: {:#}", input.display(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} inputs failed", failures, results.len());
    }

    log::info!("Thresholding complete. Results saved to {}", args.output_dir.display());

    Ok(())
}

fn process(input: &Path, args: &Cli, config: &Config, labels: Option<&Vec<String>>) -> Result<ThresholdOutcome> {
    let conn_matrix = load_matrix(input)?;

    let id = match &args.id {
        Some(id) if args.inputs.len() == 1 => id.clone(),
        Some(id) => format!("{}_{}", id, file_stem(input)),
        None => file_stem(input),
    };

    let meta = RunMetadata {
        dir_path: args.output_dir.join(&id),
        id,
        conn_model: args.conn_model.clone(),
        network: args.network.clone(),
        roi: args.roi.clone(),
        node_type: args.node_size.map_or(NodeType::Parcellation, NodeType::Spheres),
        atlas: args.atlas.clone(),
        uatlas: None,
    };

    let mut request = ThresholdRequest::new(conn_matrix, args.thr, meta);
    request.dens_thresh = args.dens_thresh;
    request.min_span_tree = args.min_span_tree;
    request.disp_filt = args.disp_filt;
    request.alpha = args.alpha;
    request.norm = args.norm;
    request.binary = args.binary;
    request.nodes = NodeSet::new(labels.cloned(), None);

    let collaborators = Collaborators {
        store: &NpyStore,
        detector: &ConnectedComponents,
    };

    let (outcome, color_theme) = match args.modality {
        Modality::Func => {
            let params = FunctionalParams {
                smooth: args.smooth,
                hpass: args.hpass,
                c_boot: args.c_boot,
            };
            let outcome = thresh_func(request, params, config, collaborators)?;
            (outcome, &config.plot.functional_color_theme)
        }
        Modality::Dwi => {
            let params = StructuralParams {
                target_samples: args.target_samples,
                track_type: args.track_type.clone(),
                directget: args.directget.clone(),
                min_length: args.min_length,
            };
            let outcome = thresh_diff(request, params, config, collaborators)?;
            (outcome, &config.plot.structural_color_theme)
        }
    };

    save_json(&outcome.record(), outcome.record_path())
        .with_context(|| format!("Failed to save run record for {}", input.display()))?;

    if config.plot.enabled && !args.skip_viz {
        viz::generate_visualizations(&outcome.graph, &outcome.est_path.with_extension(""), color_theme)?;
    }

    Ok(outcome)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sub".to_string())
}
