//! Fist estimation: the sender's characteristic timing, inferred from
//! observed mark/space run-lengths.

use crate::symbol::SymbolEntry;
use serde::{Deserialize, Serialize};

/// Reference word used to define words-per-minute: "PARIS " takes 50
/// dit-times.
pub const PARIS_DITS: u32 = 50;

const HISTOGRAM_BINS: usize = 4096;

/// The sender's timing: four durations in blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fist {
    pub dit: u32,
    pub dah: u32,
    pub tid: u32,
    pub letter: u32,
}

impl Fist {
    /// Whether all four timings have been estimated.
    pub fn is_estimated(&self) -> bool {
        self.dit != 0 && self.dah != 0 && self.tid != 0 && self.letter != 0
    }

    /// Builds a fist from a samples-per-minute rate, a words-per-minute
    /// target, and a (possibly slower) Farnsworth spacing rate.
    pub fn from_wpm(samples_per_minute: u32, wpm: u32, farnsworth_wpm: u32) -> Self {
        if wpm == 0 || farnsworth_wpm == 0 {
            return Fist::default();
        }
        Fist {
            dit: samples_per_minute / (wpm * PARIS_DITS),
            dah: (3 * samples_per_minute) / (wpm * PARIS_DITS),
            tid: samples_per_minute / (wpm * PARIS_DITS),
            letter: (3 * samples_per_minute) / (farnsworth_wpm * PARIS_DITS),
        }
    }

    /// Recovers an approximate words-per-minute from this fist.
    pub fn wpm(&self, samples_per_minute: u32) -> u32 {
        if !self.is_estimated() {
            return 0;
        }
        let paris_blocks =
            self.dit * 10 + self.dah * 4 + self.tid * (9 + 1) + self.letter * (4 + 2);
        if paris_blocks == 0 {
            return 0;
        }
        samples_per_minute / paris_blocks
    }

    /// Estimates timing from an observed symbol run by building two
    /// histograms (marks, then spaces) around their means.
    ///
    /// Marks below the mean vote for `dit`, marks above vote for `dah`
    /// (ties favour the larger duration). Spaces are histogrammed only
    /// below `dit + dah` (larger spaces are word gaps and would bias the
    /// mean); `tid`/`letter` follow the same below/above-mean split.
    ///
    /// The final `tid`/`letter` are then overridden: `tid = dit`,
    /// `letter = ceil(5*dit/2)`. Human operators routinely under-space, and
    /// mark-derived spacing decodes more of them in practice.
    pub fn estimate(run: &[SymbolEntry]) -> Self {
        let mut fist = Fist::default();

        let mut mark_hist = [0u32; HISTOGRAM_BINS];
        let mut mark_total: u64 = 0;
        let mut mark_count: u64 = 0;
        for entry in run.iter().take_while(|e| e.age != 0) {
            if entry.mark != 0 {
                let m = entry.mark as usize;
                if m < HISTOGRAM_BINS {
                    mark_hist[m] += 1;
                }
                mark_total += entry.mark as u64;
                mark_count += 1;
            }
        }

        if mark_count > 0 {
            let mean = ((mark_total + mark_count / 2) / mark_count) as usize;
            for i in (1..HISTOGRAM_BINS).rev() {
                if i <= mean && mark_hist[i] >= mark_hist[fist.dit as usize] {
                    fist.dit = i as u32;
                } else if i > mean && mark_hist[i] >= mark_hist[fist.dah as usize] {
                    fist.dah = i as u32;
                }
            }
        }

        if fist.dit == 0 {
            if fist.dah > 1 {
                fist.dit = (fist.dah + 2) / 3;
            } else {
                fist.dah = 0;
            }
        } else if fist.dah == 0 || fist.dah < fist.dit * 3 {
            fist.dah = fist.dit * 3;
        }

        if fist.dit == 0 || fist.dah == 0 {
            return fist;
        }

        let mut space_hist = [0u32; HISTOGRAM_BINS];
        let mut space_total: u64 = 0;
        let mut space_count: u64 = 0;
        let word_gap = fist.dit + fist.dah;
        for entry in run.iter().take_while(|e| e.age != 0) {
            if entry.space != 0 && entry.space < word_gap {
                let s = entry.space as usize;
                if s < HISTOGRAM_BINS {
                    space_hist[s] += 1;
                }
                space_total += entry.space as u64;
                space_count += 1;
            }
        }

        if space_count > 0 {
            let mean = ((space_total + space_count / 2) / space_count) as usize;
            for i in (1..HISTOGRAM_BINS).rev() {
                if i < mean && space_hist[i] > space_hist[fist.tid as usize] {
                    fist.tid = i as u32;
                } else if i >= mean && space_hist[i] >= space_hist[fist.letter as usize] {
                    fist.letter = i as u32;
                }
            }
        }

        if fist.tid == 0 {
            fist.tid = fist.dit;
        }
        if fist.letter < fist.tid * 3 {
            fist.letter = fist.tid * 3;
        }

        // Overwrite space-derived timing with mark-derived timing: this
        // decodes more real operators, who routinely under-space.
        fist.tid = fist.dit;
        fist.letter = (fist.tid * 5 + 1) / 2;

        fist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mark: u32, space: u32) -> SymbolEntry {
        SymbolEntry {
            mark,
            space,
            age: mark + space,
            ..Default::default()
        }
    }

    #[test]
    fn estimate_from_clean_run_matches_fist_within_one_block() {
        // 3 blocks/dit, paris-shaped run: dit=3, dah=9, tid=3, letter=9.
        let run = [
            entry(3, 3),
            entry(9, 3),
            entry(3, 3),
            entry(9, 9),
            entry(3, 3),
            entry(9, 3),
            entry(3, 9),
        ];
        let fist = Fist::estimate(&run);
        assert!((fist.dit as i64 - 3).abs() <= 1);
        assert_eq!(fist.dah, 3 * fist.dit);
        assert_eq!(fist.letter, 3 * fist.dit);
        assert_eq!(fist.tid, fist.dit);
    }

    #[test]
    fn empty_run_yields_default_fist() {
        let fist = Fist::estimate(&[]);
        assert_eq!(fist, Fist::default());
    }

    #[test]
    fn wpm_round_trips_through_from_wpm() {
        let samples_per_minute = (60 * 8000) / 128;
        let fist = Fist::from_wpm(samples_per_minute, 20, 20);
        let wpm = fist.wpm(samples_per_minute);
        assert!((wpm as i32 - 20).abs() <= 2, "wpm={wpm}");
    }
}
