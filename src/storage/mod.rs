//! Persistence of matrices, labels and run summaries

pub mod naming;

pub use naming::{est_path, raw_path, FunctionalParams, ModalityParams, NodeType, RunMetadata, StructuralParams};

use anyhow::{bail, Context, Result};
use crate::matrix::WeightedMatrix;
use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};
use serde::Serialize;
use serde_json::to_string_pretty;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Destination for thresholded and raw matrices
pub trait MatrixStore: Send + Sync {
    fn save(&self, matrix: &WeightedMatrix, path: &Path) -> Result<()>;
}

/// Writes `.npy` files, creating parent directories as needed
#[derive(Debug, Default, Clone, Copy)]
pub struct NpyStore;

impl MatrixStore for NpyStore {
    fn save(&self, matrix: &WeightedMatrix, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        write_npy(path, matrix.as_array())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!("Saved {}x{} matrix to {}", matrix.node_count(), matrix.node_count(), path.display());
        Ok(())
    }
}

/// Keeps saved matrices in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<(std::path::PathBuf, WeightedMatrix)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything saved so far, in order
    pub fn saved(&self) -> Result<Vec<(std::path::PathBuf, WeightedMatrix)>> {
        let saved = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("Matrix store lock poisoned"))?;
        Ok(saved.clone())
    }
}

impl MatrixStore for MemoryStore {
    fn save(&self, matrix: &WeightedMatrix, path: &Path) -> Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("Matrix store lock poisoned"))?;
        saved.push((path.to_path_buf(), matrix.clone()));
        Ok(())
    }
}

/// Load a square matrix from `.npy`, or from delimited text otherwise
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<WeightedMatrix> {
    let path = path.as_ref();
    let is_npy = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("npy"));

    let matrix = if is_npy {
        let data: Array2<f64> =
            read_npy(path).with_context(|| format!("Failed to read {}", path.display()))?;
        WeightedMatrix::new(data)?
    } else {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        parse_text_matrix(&text).with_context(|| format!("Malformed matrix in {}", path.display()))?
    };

    log::info!("Loaded {} node matrix from {}", matrix.node_count(), path.display());
    Ok(matrix)
}

/// Parse rows of whitespace- or comma-separated numbers.
///
/// Blank lines and lines starting with `#` are skipped. `nan` and `inf`
/// spellings are accepted and left for repair.
pub fn parse_text_matrix(text: &str) -> Result<WeightedMatrix> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .map(|field| {
                field
                    .parse::<f64>()
                    .with_context(|| format!("line {}: bad value {:?}", lineno + 1, field))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    if rows.is_empty() {
        bail!("no rows");
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != rows[0].len()) {
        bail!("row {} has {} values, expected {}", bad + 1, rows[bad].len(), rows[0].len());
    }

    Ok(WeightedMatrix::from_rows(&rows)?)
}

/// Node labels, one per non-empty line
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read labels from {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Write `value` as pretty JSON
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(value)?.as_bytes())?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}
