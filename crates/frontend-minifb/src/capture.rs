//! Audio-producer boundary: turns a live `cpal` input stream or an offline
//! `.wav` file into the raw 16-bit PCM samples that feed
//! [`morse_core::SharedWaterfall::lock`]`().update(..)`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::{bounded, Receiver, Sender};

/// Fixed internal sample rate the waterfall's tone tables are built around.
/// The source material's capture code had a second branch pinned to a
/// `41200` rate alongside the usual `44100`; that looks like a typo for
/// `44100` rather than a real distinct rate, so only `44100` is exposed
/// here.
pub const SAMPLE_RATE_HZ: u32 = 44_100;

/// A source of mono 16-bit PCM samples.
pub trait SampleSource {
    /// Fills as much of `buf` as is currently available and returns the
    /// number of samples written. A short read (including zero) does not
    /// mean the source is exhausted, except for [`WavFileSource`], where a
    /// zero read means end of file.
    fn read(&mut self, buf: &mut [i16]) -> usize;
}

/// Live microphone capture via `cpal`, decoupled from the audio callback by
/// a bounded channel: the callback is the audio-producer context of the
/// concurrency model, the consumer reading from `receiver` in [`read`] is
/// the UI-consumer context.
pub struct CpalSource {
    receiver: Receiver<i16>,
    _stream: cpal::Stream,
}

impl CpalSource {
    /// Opens the host's default input device and starts streaming.
    /// Returns `Err` with an operator-facing message on any device or
    /// stream-config failure; there is no partial `CpalSource` on failure.
    pub fn default_input() -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| "no input device available".to_string())?;
        let config = device
            .default_input_config()
            .map_err(|e| format!("no usable input config: {e}"))?;

        let (sender, receiver) = bounded(SAMPLE_RATE_HZ as usize);
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();
        let stream_config = config.into();

        let stream = match sample_format {
            cpal::SampleFormat::I16 => {
                build_input_stream::<i16>(&device, &stream_config, channels, sender)
            }
            cpal::SampleFormat::U16 => {
                build_input_stream::<u16>(&device, &stream_config, channels, sender)
            }
            cpal::SampleFormat::F32 => {
                build_input_stream::<f32>(&device, &stream_config, channels, sender)
            }
            format => return Err(format!("unsupported input sample format: {format}")),
        }
        .map_err(|e| format!("failed to build input stream: {e}"))?;

        stream
            .play()
            .map_err(|e| format!("failed to start input stream: {e}"))?;

        Ok(CpalSource { receiver, _stream: stream })
    }
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    sender: Sender<i16>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let err_fn = |err| eprintln!("audio input stream error: {err}");
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for frame in data.chunks(channels.max(1)) {
                if let Some(first) = frame.first() {
                    // Mono-down: only the first channel of each frame feeds
                    // the waterfall, matching the single analysed PCM
                    // stream the core expects.
                    let _ = sender.try_send(first.to_sample::<i16>());
                }
            }
        },
        err_fn,
        None,
    )
}

impl SampleSource for CpalSource {
    fn read(&mut self, buf: &mut [i16]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.receiver.try_recv() {
                Ok(sample) => {
                    buf[n] = sample;
                    n += 1;
                }
                Err(_) => break,
            }
        }
        n
    }
}

/// Reads a little-endian 16-bit PCM `.wav` file for offline playback and
/// test fixtures. Only the minimal RIFF/WAVE/fmt/data chunk walk needed to
/// locate the sample data is implemented; no compressed formats, no
/// chunk other than `fmt ` and `data` are interpreted.
pub struct WavFileSource {
    file: File,
    channels: u16,
    bytes_remaining: u32,
}

impl WavFileSource {
    pub fn open(path: &Path) -> Result<Self, String> {
        let mut file = File::open(path).map_err(|e| e.to_string())?;

        let mut riff_header = [0u8; 12];
        file.read_exact(&mut riff_header).map_err(|e| e.to_string())?;
        if &riff_header[0..4] != b"RIFF" || &riff_header[8..12] != b"WAVE" {
            return Err("not a RIFF/WAVE file".to_string());
        }

        let mut channels = 1u16;
        let mut bits_per_sample = 16u16;
        let mut data_len = 0u32;
        let mut found_data = false;

        loop {
            let mut chunk_header = [0u8; 8];
            if file.read_exact(&mut chunk_header).is_err() {
                break;
            }
            let chunk_id = &chunk_header[0..4];
            let chunk_len = u32::from_le_bytes(chunk_header[4..8].try_into().unwrap());

            if chunk_id == b"fmt " {
                let mut fmt = vec![0u8; chunk_len as usize];
                file.read_exact(&mut fmt).map_err(|e| e.to_string())?;
                if fmt.len() >= 16 {
                    channels = u16::from_le_bytes([fmt[2], fmt[3]]);
                    bits_per_sample = u16::from_le_bytes([fmt[14], fmt[15]]);
                }
            } else if chunk_id == b"data" {
                data_len = chunk_len;
                found_data = true;
                break;
            } else {
                file.seek(SeekFrom::Current(chunk_len as i64)).map_err(|e| e.to_string())?;
            }
        }

        if !found_data {
            return Err("no data chunk found".to_string());
        }
        if bits_per_sample != 16 {
            return Err(format!("unsupported bits per sample: {bits_per_sample}"));
        }

        Ok(WavFileSource { file, channels: channels.max(1), bytes_remaining: data_len })
    }
}

impl SampleSource for WavFileSource {
    fn read(&mut self, buf: &mut [i16]) -> usize {
        let channels = self.channels as usize;
        let mut n = 0;
        let mut frame = vec![0u8; 2 * channels];

        while n < buf.len() && self.bytes_remaining as usize >= frame.len() {
            if self.file.read_exact(&mut frame).is_err() {
                break;
            }
            self.bytes_remaining -= frame.len() as u32;
            let sample = i16::from_le_bytes([frame[0], frame[1]]);
            buf[n] = sample;
            n += 1;
        }
        n
    }
}
