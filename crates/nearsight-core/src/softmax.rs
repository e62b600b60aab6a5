//! Score-to-probability conversion
//!
//! Inner products of high-dimensional embeddings can be large enough that a
//! naive `exp(s)` overflows `f32`. Subtracting the maximum score first keeps
//! every exponent at or below zero; the result is mathematically identical.

use crate::error::{IndexError, Result};

/// Stable softmax: `exp(s_i - max) / Σ exp(s_j - max)`.
///
/// The output has the same length as `scores`, sums to 1, and is unchanged by
/// adding a constant to every score.
///
/// Non-finite scores take their limits: NaN entries get probability 0, and if
/// any score is `+inf` the mass is split evenly over the `+inf` entries. Only
/// when no entry is comparable (all `-inf` or NaN) is the result uniform.
pub fn softmax(scores: &[f32]) -> Result<Vec<f32>> {
    if scores.is_empty() {
        return Err(IndexError::EmptyInput);
    }

    // f32::max ignores NaN operands
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if max == f32::INFINITY {
        let top = scores.iter().filter(|&&s| s == f32::INFINITY).count();
        let share = 1.0 / top as f32;
        return Ok(scores
            .iter()
            .map(|&s| if s == f32::INFINITY { share } else { 0.0 })
            .collect());
    }
    if max == f32::NEG_INFINITY {
        return Ok(vec![1.0 / scores.len() as f32; scores.len()]);
    }

    let exps: Vec<f32> = scores
        .iter()
        .map(|&s| if s.is_nan() { 0.0 } else { (s - max).exp() })
        .collect();
    // The max entry contributes exp(0) = 1, so the sum is at least 1
    let sum: f32 = exps.iter().sum();

    Ok(exps.into_iter().map(|e| e / sum).collect())
}

/// Softmax over `scores / temperature`.
///
/// Temperatures below 1 sharpen the distribution toward the best hit, above 1
/// flatten it. `temperature == 1.0` is exactly [`softmax`].
pub fn softmax_with_temperature(scores: &[f32], temperature: f32) -> Result<Vec<f32>> {
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(IndexError::InvalidTemperature(temperature));
    }
    if temperature == 1.0 {
        return softmax(scores);
    }

    let scaled: Vec<f32> = scores.iter().map(|&s| s / temperature).collect();
    softmax(&scaled)
}
