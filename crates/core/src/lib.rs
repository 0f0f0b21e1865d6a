//! # morse-core
//!
//! Real-time multi-channel Morse-code receiver core.
//!
//! Pipeline: a fixed-point single-bin block analyser ([`analyser`]) turns
//! raw 16-bit PCM into a per-sub-channel dB magnitude; [`channel`] tracks
//! each sub-channel's colour history and filters it into a waterfall
//! display; [`symbol`] extracts on/off mark/space runs from that history
//! and matches them against the Morse code table ([`codebook`]) using a
//! per-sender timing estimate ([`fist`]). [`waterfall`] ties the whole bank
//! of sub-channels together behind one audio-ingress entry point.
//!
//! Everything on the audio-producer path is integer-only; the sole uses of
//! floating point are the one-time cosine table construction in [`tone`]
//! and outside callers synthesising test signals.
//!
//! ## Architecture
//!
//! - [`waterfall::Waterfall`] — top-level receiver: a bank of sub-channels
//!   sharing one audio block buffer and one noise-floor average
//! - [`waterfall::SharedWaterfall`] — the mutex-guarded handle shared
//!   between an audio-producer context and a UI-consumer context
//! - [`channel::SubChannel`] — one tracked frequency bin's colour ring,
//!   fist, symbol run, and text buffer
//! - [`analyser`] — stateless single-bin DFT block analyser
//! - [`complex`], [`tone`] — fixed-point complex accumulator and cosine
//!   tables backing the analyser
//! - [`db`] — fixed-point log-power unit shared across the core
//! - [`fist`] — per-sender timing estimator (dit/dah/tid/letter)
//! - [`symbol`] — on/off extraction, the least-squares matcher, the
//!   inverse encoder, and text projection/trim operations
//! - [`codebook`] — the Morse code table and ASCII mapping

pub mod analyser;
pub mod channel;
pub mod codebook;
pub mod complex;
pub mod db;
pub mod fist;
pub mod symbol;
pub mod tone;
pub mod waterfall;

pub use channel::SubChannel;
pub use db::{Db, DbInteger};
pub use fist::Fist;
pub use symbol::SymbolEntry;
pub use waterfall::{SharedWaterfall, Waterfall, WaterfallConfig};
