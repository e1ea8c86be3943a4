//! Plot input export
//!
//! Rendering happens elsewhere; this module writes what a renderer needs:
//! the thresholded graph as GraphML, the plot matrix as CSV, and a JSON
//! sidecar naming the colour theme and community blocks.

use anyhow::Result;
use itertools::Itertools;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::graph::{ConnectomeGraph, ThresholdedGraph};
use crate::matrix::normalize::{binarize, standardize};
use crate::matrix::WeightedMatrix;
use crate::storage::save_json;

/// Files written for one thresholded graph
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArtifacts {
    pub graphml: PathBuf,
    pub matrix_csv: PathBuf,
    pub sidecar: PathBuf,
}

#[derive(Debug, Serialize)]
struct PlotSidecar<'a> {
    color_theme: &'a str,
    node_order: Vec<usize>,
    labels: Vec<String>,
    /// `(start, size)` of each community along `node_order`
    blocks: Vec<(usize, usize)>,
    community_status: &'static str,
}

/// Write plot inputs next to `stem` (the thresholded matrix path without
/// its extension).
pub fn generate_visualizations(thresholded: &ThresholdedGraph, stem: &Path, color_theme: &str) -> Result<PlotArtifacts> {
    if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let graphml = with_suffix(stem, "_adj_mat.graphml");
    write_graphml(&thresholded.graph, &graphml)?;

    let n = thresholded.matrix.node_count();
    let (order, blocks, community_status) = match thresholded.communities.as_option() {
        Some(communities) if communities.node_count() == n => {
            (communities.ordering(), communities.blocks(), "present")
        }
        _ => {
            log::warn!("No community partition for {}; plotting in node order", stem.display());
            ((0..n).collect(), Vec::new(), "absent")
        }
    };

    let plot_matrix = plot_matrix(&thresholded.matrix);
    let labels: Vec<String> = order.iter().map(|&i| node_label(&thresholded.graph, i)).collect();

    let matrix_csv = with_suffix(stem, "_adj_mat_comm.csv");
    write_matrix_csv(&plot_matrix, &order, &labels, &matrix_csv)?;

    let sidecar = with_suffix(stem, "_adj_mat_comm.json");
    save_json(
        &PlotSidecar {
            color_theme,
            node_order: order,
            labels,
            blocks,
            community_status,
        },
        &sidecar,
    )?;

    log::info!("Plot inputs written to {}", graphml.display());

    Ok(PlotArtifacts {
        graphml,
        matrix_csv,
        sidecar,
    })
}

/// Min-max rescaled weights masked to the retained edges
pub fn plot_matrix(matrix: &WeightedMatrix) -> WeightedMatrix {
    let scaled = standardize(matrix);
    let mask = binarize(matrix);
    let mut out = WeightedMatrix::zeros(matrix.node_count());
    for ((i, j), &m) in mask.as_array().indexed_iter() {
        out.set(i, j, scaled.get(i, j) * m);
    }
    out
}

fn node_label(graph: &ConnectomeGraph, node: usize) -> String {
    graph.node(node).label.clone().unwrap_or_else(|| node.to_string())
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    stem.with_file_name(name)
}

fn write_graphml(graph: &ConnectomeGraph, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(file, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    writeln!(file, "  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>")?;
    writeln!(file, "  <key id=\"coord\" for=\"node\" attr.name=\"coord\" attr.type=\"string\"/>")?;
    writeln!(file, "  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"double\"/>")?;
    writeln!(file, "  <key id=\"alpha\" for=\"edge\" attr.name=\"alpha\" attr.type=\"double\"/>")?;
    writeln!(file, "  <graph id=\"G\" edgedefault=\"undirected\">")?;

    for i in 0..graph.node_count() {
        let attr = graph.node(i);
        writeln!(file, "    <node id=\"n{}\">", i)?;
        if let Some(label) = &attr.label {
            writeln!(file, "      <data key=\"label\">{}</data>", escape_xml(label))?;
        }
        if let Some(coord) = attr.coord {
            writeln!(file, "      <data key=\"coord\">{}</data>", coord.iter().join(" "))?;
        }
        writeln!(file, "    </node>")?;
    }

    for (edge_id, (u, v, attr)) in graph.edges().enumerate() {
        writeln!(file, "    <edge id=\"e{}\" source=\"n{}\" target=\"n{}\">", edge_id, u, v)?;
        writeln!(file, "      <data key=\"weight\">{}</data>", attr.weight)?;
        if let Some(alpha) = attr.alpha {
            writeln!(file, "      <data key=\"alpha\">{}</data>", alpha)?;
        }
        writeln!(file, "    </edge>")?;
    }

    writeln!(file, "  </graph>")?;
    writeln!(file, "</graphml>")?;
    file.flush()?;

    Ok(())
}

fn write_matrix_csv(matrix: &WeightedMatrix, order: &[usize], labels: &[String], path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, ",{}", labels.iter().map(|l| csv_field(l)).join(","))?;
    for (&i, label) in order.iter().zip(labels) {
        writeln!(
            file,
            "{},{}",
            csv_field(label),
            order.iter().map(|&j| matrix.get(i, j)).join(",")
        )?;
    }
    file.flush()?;

    Ok(())
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
