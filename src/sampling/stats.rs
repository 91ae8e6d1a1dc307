//! Time-series statistics for FCIQMC traces.

use serde::{Deserialize, Serialize};

use crate::error::FciqmcError;

/// Mean, sample deviation and blocking error of one observable.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub mean: f64,
    /// Bessel-corrected standard deviation of the samples
    pub std_dev: f64,
    /// Standard error of the mean, corrected for autocorrelation
    pub error: f64,
}

impl Estimate {
    pub fn from_samples(samples: &[f64]) -> Self {
        let tau = autocorrelation_time(samples);
        Self {
            mean: mean(samples),
            std_dev: sample_std_dev(samples),
            error: blocking_error(samples, tau),
        }
    }
}

/// Statistics of a trace after the equilibration cut.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub shift: Estimate,
    pub energy: Estimate,
    pub population: Estimate,
    /// Number of samples kept after the cut
    pub samples: usize,
}

pub fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Standard deviation with `n - 1` in the denominator.
pub fn sample_std_dev(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(samples);
    let var = samples.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Integrated autocorrelation time, summed until the first negative
/// autocorrelation coefficient.
pub fn autocorrelation_time(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 1.0;
    }
    let m = mean(samples);
    let var = samples.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / n as f64;
    if var == 0.0 {
        return 1.0;
    }

    let mut autocorr = 1.0;
    for t in 1..n / 2 {
        let auto_t: f64 = samples[..n - t]
            .iter()
            .zip(samples[t..].iter())
            .map(|(&x, &y)| (x - m) * (y - m))
            .sum::<f64>()
            / ((n - t) as f64 * var);

        if auto_t < 0.0 {
            break;
        }
        autocorr += 2.0 * auto_t;
    }
    autocorr
}

/// Standard error of the mean from blocks of `2 τ` samples.
///
/// Returns 0 when fewer than two blocks fit.
pub fn blocking_error(samples: &[f64], autocorrelation_time: f64) -> f64 {
    let block_size = ((2.0 * autocorrelation_time).ceil() as usize).max(1);
    let n_blocks = samples.len() / block_size;
    if n_blocks < 2 {
        return 0.0;
    }

    let block_means: Vec<f64> = samples
        .chunks_exact(block_size)
        .map(|block| block.iter().sum::<f64>() / block_size as f64)
        .collect();

    let m = mean(&block_means);
    let variance = block_means.iter().map(|&x| (x - m).powi(2)).sum::<f64>()
        / (n_blocks - 1) as f64;

    (variance / n_blocks as f64).sqrt()
}

/// Index of the first sample kept after discarding the fraction `pos`.
pub(crate) fn equilibration_cut(len: usize, pos: f64) -> Result<usize, FciqmcError> {
    if !(pos > 0.0 && pos < 1.0) {
        return Err(FciqmcError::InvalidFraction(pos));
    }
    let start = (pos * len as f64) as usize;
    let kept = len - start.min(len);
    if kept < 2 {
        return Err(FciqmcError::InsufficientSamples(kept));
    }
    Ok(start)
}
