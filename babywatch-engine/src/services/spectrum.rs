//! Welch power spectrum estimate
//!
//! Periodic Hann window, 50% segment overlap, per-segment mean removal and
//! one-sided power-spectrum scaling (segment power normalized by the squared
//! window sum, non-DC/non-Nyquist bins doubled, averaged across segments).

use std::f32::consts::PI;
use std::sync::Arc;

use ndarray::{s, Array1, ArrayView1};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Largest segment length used for the estimate
pub const MAX_SEGMENT_LEN: usize = 1024;

/// One-sided power spectrum
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub frequencies: Array1<f32>,
    pub power: Array1<f32>,
}

impl Spectrum {
    pub fn total(&self) -> f32 {
        self.power.sum()
    }

    /// Power of the bins inside `[low_hz, high_hz]`
    pub fn band_power(&self, low_hz: f32, high_hz: f32) -> f32 {
        self.frequencies
            .iter()
            .zip(self.power.iter())
            .filter(|(f, _)| **f >= low_hz && **f <= high_hz)
            .map(|(_, p)| *p)
            .sum()
    }
}

/// Welch estimator planned for a fixed segment length
pub struct WelchEstimator {
    segment_len: usize,
    window: Array1<f32>,
    scale: f32,
    fft: Arc<dyn Fft<f32>>,
}

impl WelchEstimator {
    /// Plan an estimator for signals of `signal_len` samples
    pub fn new(signal_len: usize) -> Self {
        let segment_len = signal_len.clamp(1, MAX_SEGMENT_LEN);
        let window = hann_periodic(segment_len);
        let window_sum = window.sum();
        let scale = if window_sum > 0.0 {
            1.0 / (window_sum * window_sum)
        } else {
            0.0
        };
        let fft = FftPlanner::<f32>::new().plan_fft_forward(segment_len);

        Self {
            segment_len,
            window,
            scale,
            fft,
        }
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Estimate the power spectrum of `signal` sampled at `sample_rate` Hz
    pub fn estimate(&self, signal: &[f32], sample_rate: u32) -> Spectrum {
        let n = self.segment_len;
        let bins = n / 2 + 1;
        let frequencies =
            Array1::from_iter((0..bins).map(|k| k as f32 * sample_rate as f32 / n as f32));

        let step = n - n / 2;
        let signal = ArrayView1::from(signal);
        let segments = if signal.len() >= n {
            (signal.len() - n) / step + 1
        } else {
            0
        };

        let mut power = Array1::<f32>::zeros(bins);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];

        for index in 0..segments {
            let start = index * step;
            let segment = signal.slice(s![start..start + n]);
            let mean = segment.mean().unwrap_or(0.0);

            for ((slot, &x), &w) in buffer.iter_mut().zip(segment.iter()).zip(self.window.iter()) {
                *slot = Complex::new((x - mean) * w, 0.0);
            }
            self.fft.process(&mut buffer);

            for (k, value) in buffer.iter().take(bins).enumerate() {
                power[k] += value.norm_sqr() * self.scale;
            }
        }

        if segments > 0 {
            power /= segments as f32;
        }

        // fold negative frequencies into the one-sided estimate
        let last = if n % 2 == 0 { bins - 1 } else { bins };
        if last > 1 {
            power.slice_mut(s![1..last]).mapv_inplace(|p| p * 2.0);
        }

        Spectrum { frequencies, power }
    }
}

fn hann_periodic(len: usize) -> Array1<f32> {
    Array1::from_iter((0..len).map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / len as f32).cos()))
}
