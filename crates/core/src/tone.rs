//! Process-wide fixed-point cosine table.
//!
//! 4096 signed samples at 12-bit phase resolution, scale `0x0FFF`. Built once
//! and shared for the process lifetime (replaces the original's file-scope
//! buffer populated lazily on first call with a one-shot-initialised
//! singleton).

use std::sync::OnceLock;

const TABLE_BITS: u32 = 12;
const TABLE_SIZE: usize = 1 << TABLE_BITS;
const TABLE_MASK: i32 = (TABLE_SIZE - 1) as i32;
const TABLE_SCALE: i32 = 0x0FFF;

fn table() -> &'static [i16; TABLE_SIZE] {
    static TABLE: OnceLock<[i16; TABLE_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [0i16; TABLE_SIZE];
        for (i, slot) in t.iter_mut().enumerate() {
            let angle = (2.0 * std::f64::consts::PI * i as f64) / TABLE_SIZE as f64;
            *slot = (TABLE_SCALE as f64 * angle.cos()).round() as i16;
        }
        t
    })
}

/// Cosine at 12-bit phase `angle`, scaled by `0x0FFF`.
#[inline]
pub fn cos12(angle: i32) -> i32 {
    table()[(angle & TABLE_MASK) as usize] as i32
}

/// Sine at 12-bit phase `angle` (cosine shifted by a quarter turn).
#[inline]
pub fn sin12(angle: i32) -> i32 {
    cos12(angle - (TABLE_SIZE as i32 / 4))
}

// ─── 8-bit / 10-bit-phase companion table ───────────────────────────────────
//
// Used to synthesise calibration tones (unit-amplitude carriers at a chosen
// phase) rather than for the block analyser's DFT, which runs entirely off
// the 12-bit table above. Phase wraps every 1024 units; quarter turn is 256.

const UNIT_BITS: u32 = 10;
const UNIT_SIZE: usize = 1 << UNIT_BITS;
const UNIT_MASK: i32 = (UNIT_SIZE - 1) as i32;
const UNIT_SCALE: i32 = 127;

fn unit_table() -> &'static [i8; UNIT_SIZE] {
    static TABLE: OnceLock<[i8; UNIT_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [0i8; UNIT_SIZE];
        for (i, slot) in t.iter_mut().enumerate() {
            let angle = (std::f64::consts::PI * i as f64) / UNIT_SIZE as f64;
            *slot = (UNIT_SCALE as f64 * angle.cos()).round() as i8;
        }
        t
    })
}

/// Cosine at 10-bit phase `angle`, scaled by 127. Quarter turn is 256 units.
#[inline]
pub fn cos8(angle: i32) -> i32 {
    let angle = angle & UNIT_MASK;
    let table = unit_table();
    if angle < 0x100 {
        table[angle as usize] as i32
    } else if angle < 0x200 {
        -(table[(0x1FF - angle) as usize] as i32)
    } else if angle < 0x300 {
        -(table[(angle - 0x200) as usize] as i32)
    } else {
        table[(0x3FF - angle) as usize] as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_circle_within_tolerance() {
        for angle in 0..1024 {
            let c = cos8(angle + 0x300);
            let s = cos8(angle);
            let mag_sq = c * c + s * s;
            assert!(
                (15800..=16384).contains(&mag_sq),
                "angle={angle} cos={c} sin={s} mag_sq={mag_sq}"
            );
        }
    }

    #[test]
    fn cos12_is_periodic() {
        assert_eq!(cos12(0), cos12(TABLE_SIZE as i32));
        assert_eq!(cos12(5), cos12(5 + TABLE_SIZE as i32));
    }

    #[test]
    fn cos8_is_periodic() {
        assert_eq!(cos8(0), cos8(UNIT_SIZE as i32));
        assert_eq!(cos8(17), cos8(17 + UNIT_SIZE as i32));
    }
}
