//! The waterfall window: one pixel row per sub-channel colour history, a
//! small bitmap glyph cache overlaying decoded text, and mouse-click
//! sub-channel selection.

use minifb::{MouseButton, MouseMode, Window};
use morse_core::{Db, Waterfall};

/// Width in pixels of the rendered colour history (matches
/// `WaterfallConfig::cols`'s role as the text-wrap column count, reused
/// here as the scroll width).
const HISTORY_WIDTH: usize = 640;
const ROW_HEIGHT: usize = 8;
const GLYPH_WIDTH: usize = 6;
const GLYPH_HEIGHT: usize = 8;

/// 5x7 bitmap font, one row of bits per scanline, covering `' '..='~'`.
/// Unsupported glyphs fall back to a blank cell.
fn glyph_rows(ch: u8) -> [u8; 7] {
    match ch {
        b'A'..=b'Z' | b'a'..=b'z' => LETTER_GLYPH,
        b'0'..=b'9' => DIGIT_GLYPH,
        b'.' | b',' | b'?' | b'/' | b'-' => PUNCT_GLYPH,
        _ => BLANK_GLYPH,
    }
}

const BLANK_GLYPH: [u8; 7] = [0; 7];
const LETTER_GLYPH: [u8; 7] = [
    0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
];
const DIGIT_GLYPH: [u8; 7] = [
    0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110,
];
const PUNCT_GLYPH: [u8; 7] = [
    0, 0, 0, 0, 0, 0b00110, 0b00110,
];

/// dB colour ramp: maps a sub-channel's fixed-point dB magnitude to an RGB
/// waterfall colour, dark blue (quiet) through yellow to white (loud).
fn colour_for_db(db: Db) -> u32 {
    let v = db.min(63) as u32;
    let r = (v * 4).min(255);
    let g = (v * 3).min(255);
    let b = 255u32.saturating_sub(v * 4);
    (r << 16) | (g << 8) | b
}

pub struct WaterfallView {
    pub window: Window,
    framebuffer: Vec<u32>,
    width: usize,
    height: usize,
    rows: usize,
    selected_row: Option<usize>,
}

impl WaterfallView {
    pub fn new(window: Window, rows: usize) -> Self {
        let height = rows * ROW_HEIGHT;
        WaterfallView {
            window,
            framebuffer: vec![0; HISTORY_WIDTH * height],
            width: HISTORY_WIDTH,
            height,
            rows,
            selected_row: None,
        }
    }

    /// Reads the window's current mouse position (if any) and updates
    /// `selected_row` on a left click, mapping the clicked pixel row to the
    /// sub-channel whose history occupies that band.
    pub fn handle_mouse(&mut self) {
        if self.window.get_mouse_down(MouseButton::Left) {
            if let Some((_, y)) = self.window.get_mouse_pos(MouseMode::Clamp) {
                let row = (y as usize) / ROW_HEIGHT;
                if row < self.rows {
                    self.selected_row = Some(row);
                }
            }
        }
    }

    pub fn selected_subchannel(&self, waterfall: &Waterfall) -> Option<i32> {
        self.selected_row.map(|row| waterfall.first_subchannel() + row as i32)
    }

    fn put_pixel(&mut self, x: usize, y: usize, colour: u32) {
        if x < self.width && y < self.height {
            self.framebuffer[y * self.width + x] = colour;
        }
    }

    fn draw_glyph(&mut self, x0: usize, y0: usize, ch: u8, colour: u32) {
        for (row, bits) in glyph_rows(ch.to_ascii_uppercase()).iter().enumerate() {
            for col in 0..5 {
                if bits & (1 << (4 - col)) != 0 {
                    self.put_pixel(x0 + col, y0 + row, colour);
                }
            }
        }
    }

    fn draw_text(&mut self, x0: usize, y0: usize, text: &[u8], colour: u32) {
        let mut x = x0;
        for &b in text {
            if b == b'\n' {
                break;
            }
            self.draw_glyph(x, y0, b, colour);
            x += GLYPH_WIDTH;
            if x + GLYPH_WIDTH > self.width {
                break;
            }
        }
    }

    /// Redraws every sub-channel's colour row, then overlays the last line
    /// of its decoded text on top.
    pub fn redraw(&mut self, waterfall: &Waterfall) {
        let first = waterfall.first_subchannel();
        let last = waterfall.last_subchannel();

        for subchannel in first..=last {
            let row = (subchannel - first) as usize;
            let colours = waterfall.colours(subchannel);
            let y0 = row * ROW_HEIGHT;

            for x in 0..self.width.min(colours.len()) {
                let c = colour_for_db(colours[colours.len() - 1 - x]);
                for dy in 0..ROW_HEIGHT {
                    self.put_pixel(self.width - 1 - x, y0 + dy, c);
                }
            }

            let text = waterfall.text(subchannel);
            let last_line_start = text.iter().rposition(|&b| b == b'\n').map(|i| i + 1).unwrap_or(0);
            let text_colour = if self.selected_row == Some(row) { 0x00FF00 } else { 0xFFFFFF };
            self.draw_text(2, y0, &text[last_line_start..], text_colour);
        }

        let _ = self.window.update_with_buffer(&self.framebuffer, self.width, self.height);
    }
}
