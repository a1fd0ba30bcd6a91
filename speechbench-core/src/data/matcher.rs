//! Feature/label sequence-length matching
//!
//! Features and frame labels are produced independently, so their time
//! dimensions can differ by a few frames. The label length is authoritative:
//! longer features are truncated, shorter ones repeat their final frame.

use ndarray::{s, Array2, ArrayView2};

use crate::error::{BenchError, Result};

/// Align `features` (`(time, channels)`) to exactly `label_len` frames
pub fn match_length(features: ArrayView2<'_, f32>, label_len: usize) -> Result<Array2<f32>> {
    let input_len = features.nrows();
    if input_len == 0 || label_len == 0 {
        return Err(BenchError::InvalidInput {
            reason: format!(
                "cannot match sequence lengths (input_len={}, label_len={})",
                input_len, label_len
            ),
        });
    }

    if input_len >= label_len {
        return Ok(features.slice(s![..label_len, ..]).to_owned());
    }

    let mut matched = Array2::<f32>::zeros((label_len, features.ncols()));
    matched.slice_mut(s![..input_len, ..]).assign(&features);
    let last = features.row(input_len - 1);
    for mut row in matched.slice_mut(s![input_len.., ..]).rows_mut() {
        row.assign(&last);
    }
    Ok(matched)
}
