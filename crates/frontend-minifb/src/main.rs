//! Morse receiver frontend.
//!
//! Provides two execution modes:
//!
//! - **GUI mode** (default): live waterfall window, mouse sub-channel
//!   selection, decoded text overlay.
//! - **Headless mode** (`--headless`): runs a `.wav` fixture through the
//!   waterfall and prints the decoded text of a chosen sub-channel to
//!   stdout, no window.

mod capture;
mod render;

use std::env;
use std::path::Path;
use std::time::Duration;

use minifb::{Window, WindowOptions};
use morse_config::{Config, Key as ConfigKey};
use morse_core::{SharedWaterfall, Waterfall, WaterfallConfig};

use capture::{CpalSource, SampleSource, WavFileSource};
use render::WaterfallView;

/// `log2` of the analyser block size: 1024-sample blocks at 44100 Hz.
const BLOCK_K: u32 = 10;
/// Length of each sub-channel's colour/symbol history.
const HISTORY_SAMPLES: usize = 512;
const FIRST_BIN: i32 = 20;
const LAST_BIN: i32 = 60;
const TEXT_ROWS: usize = 8;
const TEXT_COLS: usize = 64;

fn default_config() -> WaterfallConfig {
    WaterfallConfig {
        k: BLOCK_K,
        samples: HISTORY_SAMPLES,
        first: FIRST_BIN,
        last: LAST_BIN,
        rows: TEXT_ROWS,
        cols: TEXT_COLS,
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help") {
        eprintln!("Morse receiver");
        eprintln!("Usage: {} [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --headless           Run without a window, decode a .wav and exit");
        eprintln!("  --wav <file>         Read PCM from a .wav file instead of the microphone");
        eprintln!("  --channel N          Sub-channel to print in headless mode (default first)");
        eprintln!("  --config <file>      Configuration file (default morserator.conf)");
        std::process::exit(0);
    }

    let headless = args.iter().any(|a| a == "--headless");
    let wav_path: Option<&String> = args.iter().position(|a| a == "--wav").and_then(|i| args.get(i + 1));
    let channel_arg: Option<i32> = args
        .iter()
        .position(|a| a == "--channel")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok());
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("morserator.conf");

    let config = match Config::load(Path::new(config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("no usable config at {config_path} ({e}), using defaults");
            Config::new()
        }
    };
    if let Some(device) = config.get(ConfigKey::AudioIn) {
        eprintln!("configured audio input: {device}");
    }

    let waterfall = Waterfall::new(default_config()).expect("waterfall config is well-formed");
    let shared = SharedWaterfall::new(waterfall);

    let source: Box<dyn SampleSource> = match wav_path {
        Some(path) => Box::new(WavFileSource::open(Path::new(path)).expect("failed to open wav file")),
        None => Box::new(CpalSource::default_input().expect("failed to open audio input")),
    };

    if headless {
        run_headless(shared, source, channel_arg.unwrap_or(FIRST_BIN));
    } else {
        run_gui(shared, source);
    }
}

/// Decodes straight through to stdout and exits; used for `.wav` fixture
/// playback and CI smoke tests.
fn run_headless(shared: SharedWaterfall, mut source: Box<dyn SampleSource>, subchannel: i32) {
    let mut buf = [0i16; 4096];
    loop {
        let n = source.read(&mut buf);
        if n == 0 {
            break;
        }
        shared.lock().update(&buf[..n]);
    }
    shared.lock().sync(subchannel);
    let text = shared.lock().text(subchannel).to_vec();
    print!("{}", String::from_utf8_lossy(&text));
}

/// Live waterfall window: the audio-producer side (the `SampleSource`) is
/// drained into the shared waterfall every frame, and the UI-consumer side
/// (`sync`/`colours`/`text`) only ever runs here, matching the concurrency
/// split described for the core's lock.
fn run_gui(shared: SharedWaterfall, mut source: Box<dyn SampleSource>) {
    let rows = shared.lock().last_subchannel() - shared.lock().first_subchannel() + 1;
    let window = Window::new(
        "Morse receiver",
        640,
        rows as usize * 8,
        WindowOptions::default(),
    )
    .expect("failed to create window");

    let mut view = WaterfallView::new(window, rows as usize);
    let mut buf = [0i16; 4096];

    while view.window.is_open() {
        let n = source.read(&mut buf);
        if n > 0 {
            shared.lock().update(&buf[..n]);
        }

        view.handle_mouse();

        {
            let mut waterfall = shared.lock();
            let first = waterfall.first_subchannel();
            let last = waterfall.last_subchannel();
            for subchannel in first..=last {
                waterfall.sync(subchannel);
            }
        }

        view.redraw(&shared.lock());

        if n == 0 {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}
