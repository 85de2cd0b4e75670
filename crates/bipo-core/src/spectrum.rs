use crate::domain::{BipoError, BipoResult, Range};
use serde::Serialize;

/// Equal-width histogram of visible energy with Poisson bin errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySpectrum {
    pub range: Range,
    pub counts: Vec<u64>,
    pub underflow: u64,
    pub overflow: u64,
}

impl EnergySpectrum {
    /// Bins are half-open `[lo, hi)` except the last, which also takes `max`.
    pub fn fill(values: impl IntoIterator<Item = f64>, bins: usize, range: Range) -> BipoResult<Self> {
        range.validate("spectrum")?;
        if bins == 0 || range.width() <= 0.0 || !range.width().is_finite() {
            return Err(BipoError::input_validation(
                "INPUT.INVALID_RANGE",
                format!(
                    "spectrum needs at least one bin over a non-empty range, got {} bins over {}",
                    bins, range
                ),
            ));
        }

        let mut spectrum = Self {
            range,
            counts: vec![0; bins],
            underflow: 0,
            overflow: 0,
        };
        let width = range.width() / bins as f64;
        for value in values {
            if value.is_nan() {
                continue;
            }
            if value < range.min {
                spectrum.underflow += 1;
            } else if value > range.max {
                spectrum.overflow += 1;
            } else {
                let bin = (((value - range.min) / width) as usize).min(bins - 1);
                spectrum.counts[bin] += 1;
            }
        }
        Ok(spectrum)
    }

    pub fn bin_width(&self) -> f64 {
        self.range.width() / self.counts.len() as f64
    }

    pub fn centers(&self) -> Vec<f64> {
        let width = self.bin_width();
        (0..self.counts.len())
            .map(|bin| self.range.min + (bin as f64 + 0.5) * width)
            .collect()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.counts.iter().map(|&count| (count as f64).sqrt()).collect()
    }

    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `center<TAB>count<TAB>error` per bin.
    pub fn to_tsv(&self) -> String {
        let mut rendered = String::from("center\tcount\terror\n");
        for ((center, count), error) in self
            .centers()
            .into_iter()
            .zip(&self.counts)
            .zip(self.errors())
        {
            rendered.push_str(&format!("{:.6}\t{}\t{:.6}\n", center, count, error));
        }
        rendered
    }
}
