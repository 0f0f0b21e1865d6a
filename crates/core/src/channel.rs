//! A single sub-channel: one fixed frequency bin tracked across time, with
//! its own colour history, fist estimate, decoded symbol run, and text
//! buffer.

use std::collections::VecDeque;

use crate::db::{Db, DbInteger};
use crate::fist::Fist;
use crate::symbol::{self, SymbolEntry};

/// Width of the short FIR window averaging raw analyser output into the
/// colour ring (the teacher's C left this behind an `#if 0`; the spec calls
/// for it unconditionally — see `DESIGN.md`).
const FILTER_WINDOW: usize = 4;
const FILTER_COEFFICIENT: u32 = 20;

/// An update below this many on/off transitions is too short to trust: the
/// fist gets zeroed and the matcher is given one more pass over history
/// alone before the decoded text is allowed to change.
const ONOFF_RETRY_THRESHOLD: usize = 3;

/// One tracked frequency bin's full state.
pub struct SubChannel {
    /// Read-side colour ring shown to the UI and fed to the decoder; synced
    /// from `pending` at the start of `sync`.
    colours: Vec<Db>,
    /// Write-side ring, updated every completed analyser block.
    pending: Vec<Db>,
    /// Short FIR window over raw analyser output, length `FILTER_WINDOW`.
    filter: VecDeque<Db>,
    decodes: Vec<SymbolEntry>,
    /// Fixed-capacity `rows*cols` text buffer; `[0, text_end)` is
    /// permanently committed, `[text_end, text_len)` is a live preview that
    /// gets fully overwritten every `sync`.
    text: Vec<u8>,
    text_len: usize,
    text_end: usize,
    fist: Fist,
    updates: u8,
    threshold: Db,
    /// Real blocks contributed so far, saturating at `colours.len()`; backs
    /// [`SubChannel::start`].
    filled: usize,
}

impl SubChannel {
    pub fn new(samples: usize, rows: usize, cols: usize) -> Self {
        SubChannel {
            colours: vec![0; samples],
            pending: vec![0; samples],
            filter: VecDeque::from(vec![0; FILTER_WINDOW]),
            decodes: vec![SymbolEntry::default(); samples],
            text: vec![0; rows * cols],
            text_len: 0,
            text_end: 0,
            fist: Fist::default(),
            updates: 0,
            threshold: 0,
            filled: 0,
        }
    }

    /// §4.3 steps 1-4: slides the FIR window over this block's analyser
    /// output, shifts the write-side ring, and returns the integer power
    /// this block contributes toward the waterfall's running noise-floor
    /// average.
    pub fn update(&mut self, analyser_out: Db) -> DbInteger {
        self.filter.pop_front();
        self.filter.push_back(analyser_out);

        let mut acc: u32 = 0;
        for &w in self.filter.iter() {
            acc = (acc + (FILTER_COEFFICIENT - 1) * w as u32) / FILTER_COEFFICIENT;
        }
        let new_colour = acc as Db;

        self.pending.rotate_left(1);
        if let Some(last) = self.pending.last_mut() {
            *last = new_colour;
        }

        self.updates = self.updates.saturating_add(1);
        self.filled = (self.filled + 1).min(self.colours.len());

        crate::db::db_to_integer(new_colour)
    }

    fn text_lines(&self, rows_cols_width: usize) -> usize {
        let text = &self.text[..self.text_len];
        if text.is_empty() {
            return 0;
        }
        let mut lines = 1usize;
        let mut col = 0usize;
        for &b in text {
            if b == b'\n' || col >= rows_cols_width {
                lines += 1;
                col = 0;
            } else if b >= b' ' {
                col += 1;
            }
        }
        lines
    }

    /// §4.8: flushes pending colours into the live colour ring, decodes the
    /// freshly updated tail, projects newly decoded text, and trims both the
    /// text buffer and the symbol run.
    pub fn sync(&mut self, rows: usize, cols: usize, threshold: Db) {
        if self.updates == 0 {
            return;
        }

        let updates = self.updates as usize;
        self.colours.copy_from_slice(&self.pending);

        while rows > 0 && self.text_lines(cols) >= rows {
            let mut i = 0usize;
            while i < self.text_len && i < cols && self.text[i] >= b' ' {
                i += 1;
            }
            let drop = (i + 1).min(self.text_len);
            self.text.copy_within(drop..self.text_len, 0);
            self.text_len -= drop;
            self.text_end = self.text_end.saturating_sub(drop);
            if drop == 0 {
                break;
            }
        }

        self.threshold = threshold;
        self.updates = 0;

        let samples = self.colours.len();
        let tail_start = samples.saturating_sub(updates.min(samples));
        let tail = self.colours[tail_start..].to_vec();
        let mut onoff_count = symbol::decode(&mut self.decodes, &tail, self.threshold, &mut self.fist);

        if onoff_count < ONOFF_RETRY_THRESHOLD {
            self.fist = Fist::default();
            onoff_count = symbol::decode(&mut self.decodes, &[], self.threshold, &mut self.fist);
        }

        if onoff_count < ONOFF_RETRY_THRESHOLD {
            for entry in self.decodes.iter_mut().take_while(|e| e.age != 0) {
                entry.text = 0;
                entry.whitespace = 0;
            }
            self.text_len = self.text_end;
        } else {
            let projected = symbol::project_text(&self.decodes);
            let capacity = self.text.len().saturating_sub(self.text_end);
            let take = projected.len().min(capacity);
            self.text[self.text_end..self.text_end + take].copy_from_slice(&projected[..take]);
            self.text_len = self.text_end + take;

            let trimmed = symbol::trim_age(&mut self.decodes, samples as u32);
            self.text_end = (self.text_end + trimmed).min(self.text_len);
        }
    }

    pub fn clear(&mut self) {
        self.text.iter_mut().for_each(|b| *b = 0);
        self.text_len = 0;
        self.text_end = 0;
    }

    pub fn colours(&self) -> &[Db] {
        &self.colours
    }

    pub fn symbols(&self) -> &[SymbolEntry] {
        &self.decodes
    }

    pub fn fist(&self) -> &Fist {
        &self.fist
    }

    pub fn text(&self) -> &[u8] {
        &self.text[..self.text_len]
    }

    /// Ring slots still empty (constructor-initialised, never analysed):
    /// `0` once the ring has filled once over. Supplements the teacher's
    /// `start` field, which is set once at construction and never updated
    /// again — see `DESIGN.md`.
    pub fn start(&self) -> usize {
        self.colours.len() - self.filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_counts_down_as_blocks_arrive() {
        let mut c = SubChannel::new(8, 10, 10);
        assert_eq!(c.start(), 8);
        for _ in 0..3 {
            c.update(50);
        }
        assert_eq!(c.start(), 5);
        for _ in 0..10 {
            c.update(50);
        }
        assert_eq!(c.start(), 0);
    }

    #[test]
    fn update_increments_counter_and_saturates() {
        let mut c = SubChannel::new(4, 10, 10);
        c.update(10);
        assert_eq!(c.updates, 1);
        for _ in 0..300 {
            c.update(10);
        }
        assert_eq!(c.updates, 255);
    }

    #[test]
    fn sync_with_no_updates_is_a_no_op() {
        let mut c = SubChannel::new(16, 4, 20);
        c.sync(4, 20, 30);
        assert!(c.text().is_empty());
    }

    #[test]
    fn clear_empties_text_buffer() {
        let mut c = SubChannel::new(16, 4, 20);
        c.text[0] = b'X';
        c.text_len = 1;
        c.text_end = 1;
        c.clear();
        assert!(c.text().is_empty());
    }
}
