//! Feature loading and padding
//!
//! Feature arrays are 2-D `.npy` files (rows = frames, columns = channels).
//! A bucket is materialized by loading every referenced array and
//! right-padding them with zeros into one `(batch, time, channels)` tensor.

use ndarray::{s, Array1, Array2, Array3};
use ndarray_npy::{read_npy, ReadNpyError};
use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};

/// Reads feature arrays relative to a root directory
#[derive(Debug, Clone)]
pub struct FeatureStore {
    root: PathBuf,
}

impl FeatureStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a relative feature path
    pub fn resolve(&self, rel_path: &str) -> PathBuf {
        self.root.join(rel_path)
    }

    /// Load one `(time, channels)` array
    pub fn load(&self, rel_path: &str) -> Result<Array2<f32>> {
        read_features(&self.resolve(rel_path))
    }

    /// Load every array of a bucket, in bucket order
    pub fn load_all<S: AsRef<str>>(&self, rel_paths: &[S]) -> Result<Vec<Array2<f32>>> {
        rel_paths.iter().map(|p| self.load(p.as_ref())).collect()
    }

    /// Load a 1-D integer label array
    pub fn load_labels(&self, rel_path: &str) -> Result<Vec<i64>> {
        read_labels(&self.resolve(rel_path))
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(BenchError::FeatureNotFound {
            path: path.to_path_buf(),
        })
    }
}

fn read_failed(path: &Path, err: ReadNpyError) -> BenchError {
    BenchError::ReadFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Read a 2-D feature array, converting `f64` files to `f32`
pub fn read_features(path: &Path) -> Result<Array2<f32>> {
    ensure_exists(path)?;
    match read_npy::<_, Array2<f32>>(path) {
        Ok(array) => Ok(array),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let wide: Array2<f64> = read_npy(path).map_err(|e| read_failed(path, e))?;
            Ok(wide.mapv(|v| v as f32))
        }
        Err(e) => Err(read_failed(path, e)),
    }
}

/// Read a 1-D label array stored as `i64`, `i32` or `f32`
pub fn read_labels(path: &Path) -> Result<Vec<i64>> {
    ensure_exists(path)?;
    match read_npy::<_, Array1<i64>>(path) {
        Ok(array) => return Ok(array.to_vec()),
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        Err(e) => return Err(read_failed(path, e)),
    }
    match read_npy::<_, Array1<i32>>(path) {
        Ok(array) => return Ok(array.iter().map(|&v| v as i64).collect()),
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        Err(e) => return Err(read_failed(path, e)),
    }
    let array: Array1<f32> = read_npy(path).map_err(|e| read_failed(path, e))?;
    Ok(array.iter().map(|&v| v as i64).collect())
}

/// Right-pad `(time, channels)` arrays with zeros into `(batch, max_time, channels)`
///
/// Original content is never truncated; an empty input gives a `(0, 0, 0)` tensor.
pub fn pad_features(seqs: &[Array2<f32>]) -> Result<Array3<f32>> {
    let Some(first) = seqs.first() else {
        return Ok(Array3::zeros((0, 0, 0)));
    };

    let channels = first.ncols();
    if let Some(bad) = seqs.iter().find(|s| s.ncols() != channels) {
        return Err(BenchError::InvalidInput {
            reason: format!(
                "feature dimension mismatch in bucket: {} vs {}",
                channels,
                bad.ncols()
            ),
        });
    }

    let max_len = seqs.iter().map(|s| s.nrows()).max().unwrap_or(0);
    let mut padded = Array3::<f32>::zeros((seqs.len(), max_len, channels));
    for (i, seq) in seqs.iter().enumerate() {
        padded.slice_mut(s![i, ..seq.nrows(), ..]).assign(seq);
    }
    Ok(padded)
}

/// Right-pad integer sequences with zeros into `(batch, max_len)`
pub fn pad_labels(seqs: &[Vec<i64>]) -> Array2<i64> {
    let max_len = seqs.iter().map(Vec::len).max().unwrap_or(0);
    let mut padded = Array2::<i64>::zeros((seqs.len(), max_len));
    for (i, seq) in seqs.iter().enumerate() {
        for (j, &v) in seq.iter().enumerate() {
            padded[[i, j]] = v;
        }
    }
    padded
}
