//! Single-bin DFT block analyser.
//!
//! Stateless: given a block of `2^k` real samples and a bin index, returns a
//! [`Db`] magnitude proportional to `3*log2(power)` at that bin. The
//! waterfall calls this once per configured sub-channel per completed block.

use crate::complex::Complex12;
use crate::db::{db_from_integer, Db};

/// Phase table resolution, in bits (matches [`crate::tone`]'s 4096-entry
/// table).
const TONE_TABLE_BITS: u32 = 12;

/// Analyses one block against one bin, returning a dB magnitude.
///
/// `block.len()` must be `1 << k`; this is a hot-path contract enforced with
/// a debug assertion rather than a recoverable error.
pub fn analyse_bin(block: &[i16], k: u32, bin: i32) -> Db {
    debug_assert_eq!(block.len(), 1usize << k, "block size must be 2^k");

    let mut acc = Complex12::zero();
    for (i, &sample) in block.iter().enumerate() {
        let angle = ((1i64 << TONE_TABLE_BITS) as i32 * bin * i as i32) >> k;
        acc.mac(sample as i64, angle);
    }

    // The squared table scale (2 * 12 bits) is removed by `>> 24`; the
    // `>> 2k` normalises to power per sample.
    let shift = 2 * k as u32 + 24;
    let power = (acc.magnitude_sq() >> shift).clamp(0, u64::MAX as i128) as u64;
    db_from_integer(power)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth_tone(k: u32, bin: i32, amplitude: f64, phase: f64) -> Vec<i16> {
        let n = 1usize << k;
        (0..n)
            .map(|i| {
                let theta = 2.0 * std::f64::consts::PI * bin as f64 * i as f64 / n as f64;
                (amplitude * (theta + phase).cos()).round() as i16
            })
            .collect()
    }

    #[test]
    fn silence_is_zero_db() {
        let block = vec![0i16; 1 << 8];
        assert_eq!(analyse_bin(&block, 8, 3), 0);
    }

    #[test]
    fn tone_at_target_bin_dominates_other_bins() {
        let k = 8;
        let block = synth_tone(k, 5, 8000.0, 0.0);
        let hit = analyse_bin(&block, k, 5);
        let miss = analyse_bin(&block, k, 11);
        assert!(hit > miss, "hit={hit} miss={miss}");
    }

    #[test]
    fn phase_invariance_within_one_db_unit() {
        let k = 10;
        let bin = 12;
        let base = analyse_bin(&synth_tone(k, bin, 6000.0, 0.0), k, bin);
        for phase_steps in 1..8 {
            let phase = phase_steps as f64 * std::f64::consts::PI / 4.0;
            let shifted = analyse_bin(&synth_tone(k, bin, 6000.0, phase), k, bin);
            let diff = (shifted as i16 - base as i16).abs();
            assert!(diff <= 1, "phase={phase} base={base} shifted={shifted}");
        }
    }
}
