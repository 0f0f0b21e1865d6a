//! The top-level receiver: a bank of sub-channels sharing one audio-ingress
//! block buffer and one noise-floor running average.

use std::sync::{Arc, Mutex};

use crate::analyser::analyse_bin;
use crate::channel::SubChannel;
use crate::db::{db_from_integer, Db, DbInteger};
use crate::fist::Fist;
use crate::symbol::SymbolEntry;

/// +8 dB units above the running noise floor (~+5 dB real SNR); see §4.4.
const THRESHOLD_DB_OFFSET: Db = 8;
/// Running-average smoothing coefficient; see §4.3 step 5.
const THRESHOLD_COEFFICIENT: DbInteger = 9;

/// Construction parameters for a [`Waterfall`].
#[derive(Debug, Clone, Copy)]
pub struct WaterfallConfig {
    /// `log2` of the analyser block size.
    pub k: u32,
    /// Length of each sub-channel's colour ring and symbol run.
    pub samples: usize,
    /// First tracked bin index.
    pub first: i32,
    /// Last tracked bin index.
    pub last: i32,
    pub rows: usize,
    pub cols: usize,
}

pub struct Waterfall {
    config: WaterfallConfig,
    first_subchannel: i32,
    channels: Vec<SubChannel>,
    block: Vec<i16>,
    block_len: usize,
    average: DbInteger,
}

impl Waterfall {
    /// Builds a new waterfall, rejecting malformed parameters outright
    /// (§7: no partial state on failure).
    pub fn new(config: WaterfallConfig) -> Option<Self> {
        if config.k <= 2 || config.samples == 0 {
            return None;
        }

        let max_bin = 1i32 << (config.k - 1);
        if config.first < 0
            || config.first >= max_bin
            || config.last < 0
            || config.last >= max_bin
        {
            return None;
        }

        // `waterfall()`'s swap-if-reversed: the order of first/last is
        // normalised rather than treated as an error.
        let (first_subchannel, last_subchannel) = if config.first > config.last {
            (config.last, config.first)
        } else {
            (config.first, config.last)
        };
        let subchannel_count = (1 + last_subchannel - first_subchannel) as usize;

        let channels = (0..subchannel_count)
            .map(|_| SubChannel::new(config.samples, config.rows, config.cols))
            .collect();

        Some(Waterfall {
            config,
            first_subchannel,
            channels,
            block: vec![0; 1usize << config.k],
            block_len: 0,
            average: 0,
        })
    }

    fn subchannel_index(&self, subchannel: i32) -> Option<usize> {
        let offset = subchannel - self.first_subchannel;
        if offset < 0 || offset as usize >= self.channels.len() {
            return None;
        }
        Some(offset as usize)
    }

    /// §6 audio ingress: accumulates `samples` into the internal block
    /// buffer, analysing and shifting every completed block into every
    /// sub-channel as it fills.
    pub fn update(&mut self, samples: &[i16]) {
        let block_size = 1usize << self.config.k;
        let mut input = samples;

        if self.block_len > 0 {
            let need = block_size - self.block_len;
            let take = need.min(input.len());
            self.block[self.block_len..self.block_len + take].copy_from_slice(&input[..take]);
            self.block_len += take;
            input = &input[take..];

            if self.block_len == block_size {
                self.update_block();
                self.block_len = 0;
            }
        }

        while input.len() >= block_size {
            self.block[..block_size].copy_from_slice(&input[..block_size]);
            self.update_block();
            input = &input[block_size..];
        }

        if !input.is_empty() {
            self.block[..input.len()].copy_from_slice(input);
            self.block_len = input.len();
        }
    }

    fn update_block(&mut self) {
        let block_size = 1usize << self.config.k;
        let block = &self.block[..block_size];

        let mut total: DbInteger = 0;
        for (i, channel) in self.channels.iter_mut().enumerate() {
            let bin = self.first_subchannel + i as i32;
            let analyser_out = analyse_bin(block, self.config.k, bin);
            total += channel.update(analyser_out);
        }

        if !self.channels.is_empty() {
            let mean = total / self.channels.len() as DbInteger;
            self.average = (THRESHOLD_COEFFICIENT * self.average + mean) / (THRESHOLD_COEFFICIENT + 1);
        }
    }

    /// §4.4 band-derived adaptive threshold.
    pub fn threshold(&self) -> Db {
        db_from_integer(self.average).saturating_add(THRESHOLD_DB_OFFSET)
    }

    pub fn sync(&mut self, subchannel: i32) {
        let threshold = self.threshold();
        let (rows, cols) = (self.config.rows, self.config.cols);
        if let Some(i) = self.subchannel_index(subchannel) {
            self.channels[i].sync(rows, cols, threshold);
        }
    }

    pub fn clear(&mut self, subchannel: i32) {
        if let Some(i) = self.subchannel_index(subchannel) {
            self.channels[i].clear();
        }
    }

    pub fn colours(&self, subchannel: i32) -> &[Db] {
        self.subchannel_index(subchannel)
            .map(|i| self.channels[i].colours())
            .unwrap_or(&[])
    }

    pub fn symbols(&self, subchannel: i32) -> &[SymbolEntry] {
        self.subchannel_index(subchannel)
            .map(|i| self.channels[i].symbols())
            .unwrap_or(&[])
    }

    pub fn fist(&self, subchannel: i32) -> Option<&Fist> {
        self.subchannel_index(subchannel).map(|i| self.channels[i].fist())
    }

    pub fn text(&self, subchannel: i32) -> &[u8] {
        self.subchannel_index(subchannel)
            .map(|i| self.channels[i].text())
            .unwrap_or(&[])
    }

    pub fn text_lines(&self, subchannel: i32) -> usize {
        let text = self.text(subchannel);
        if text.is_empty() {
            return 0;
        }
        let mut lines = 1usize;
        let mut col = 0usize;
        for &b in text {
            if b == b'\n' || col >= self.config.cols {
                lines += 1;
                col = 0;
            } else if b >= b' ' {
                col += 1;
            }
        }
        lines
    }

    pub fn start(&self, subchannel: i32) -> usize {
        self.subchannel_index(subchannel)
            .map(|i| self.channels[i].start())
            .unwrap_or(0)
    }

    pub fn first_subchannel(&self) -> i32 {
        self.first_subchannel
    }

    pub fn last_subchannel(&self) -> i32 {
        self.first_subchannel + self.channels.len() as i32 - 1
    }

    pub fn config(&self) -> &WaterfallConfig {
        &self.config
    }
}

/// The concurrency discipline of §5 made explicit: one mutex guards the
/// whole waterfall for the duration of `update`/`sync`. The capture
/// callback must only ever call `update` and must not block on I/O while
/// holding the lock.
#[derive(Clone)]
pub struct SharedWaterfall(Arc<Mutex<Waterfall>>);

impl SharedWaterfall {
    pub fn new(waterfall: Waterfall) -> Self {
        SharedWaterfall(Arc::new(Mutex::new(waterfall)))
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, Waterfall> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
